//! Contract execution for the transition engine, backed by `revm`.
//!
//! [`RevmExecutor`] implements the engine's [`Executor`](stf_transition::Executor)
//! seam: each message runs in a fresh EVM over a read-only view of the
//! [`StateDb`](stf_state::StateDb), and the resulting account diff is written
//! back through the store's journaled setters so snapshots keep working.
pub mod adapter;
pub mod executor;
pub mod spec;

pub use adapter::StateDbAdapter;
pub use executor::RevmExecutor;
pub use spec::spec_id;
