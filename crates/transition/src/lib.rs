//! Deterministic state transition over a batch of transactions.
//!
//! [`StateTransition::apply`] runs every transaction of a batch through a
//! [`Signer`] and an [`Executor`] against a [`stf_state::StateDb`], keeping or
//! reverting each one, and derives the post-state root, transaction root,
//! receipt root, log digest and bloom of the batch.
pub mod dao;
pub mod engine;
pub mod error;
pub mod executor;
pub mod gas_pool;
pub mod receipts;
pub mod root;
pub mod signer;
pub mod tracer;

pub use dao::apply_dao_hard_fork;
pub use engine::{ExecutionResult, Prestate, StateTransition, PENDING_BLOCK_HASH};
pub use error::TransitionError;
pub use executor::{
    BlockHashOracle, ExecutionContext, ExecutionError, ExecutionOutcome, Executor,
    MissingBlockHash, TransferExecutor,
};
pub use gas_pool::{GasPool, GasPoolError};
pub use receipts::ReceiptAccumulator;
pub use root::{RootHasher, TrieRootHasher};
pub use signer::{ChainSigner, Signer, SignerError};
pub use tracer::{no_tracer, Tracer, TracerProvider};
