use crate::executor::MissingBlockHash;
use crate::GasPoolError;
use alloy_primitives::B256;
use stf_reward::RewardError;
use stf_state::StateError;

/// Fatal conditions of a batch. None of them come with a partial result.
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("tracer provisioning failed for transaction {index} ({tx_hash})")]
    TracerProvision {
        index: u64,
        tx_hash: B256,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("missing block hash: {0}")]
    MissingBlockHash(#[source] MissingBlockHash),

    #[error("could not commit state")]
    Commit(#[source] StateError),

    #[error("DAO hard fork state patch failed")]
    Dao(#[source] StateError),

    #[error(transparent)]
    GasPool(#[from] GasPoolError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Reward(#[from] RewardError),
}
