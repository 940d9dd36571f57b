use crate::SnapshotId;
use alloy_primitives::{Address, B256, U256};

/// Error returned by a [`crate::StateBackend`] implementation.
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("snapshot {0} was never issued or has already been reverted")]
    UnknownSnapshot(SnapshotId),

    #[error("state root {0} is not known to the backend")]
    UnknownRoot(B256),

    #[error("insufficient balance for {address}: have {balance}, need {amount}")]
    InsufficientBalance {
        address: Address,
        balance: U256,
        amount: U256,
    },

    #[error("balance overflow for {address}")]
    BalanceOverflow { address: Address },

    #[error("state backend failure: {0}")]
    Backend(#[source] BackendError),
}
