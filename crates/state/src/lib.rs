//! Account state store for the transition engine.
//!
//! [`StateDb`] keeps every account in memory, journals each mutation for
//! snapshot/revert, and commits finalised account sets to a [`StateBackend`]
//! keyed by their Merkle-Patricia state root.
pub mod account;
pub mod backend;
pub mod error;
mod journal;
pub mod state_db;

pub use account::StateAccount;
pub use backend::{Accounts, MemoryBackend, StateBackend};
pub use error::{BackendError, StateError};
pub use state_db::{state_root, SnapshotId, StateDb, StateLog};
