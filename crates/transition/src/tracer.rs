use crate::executor::{ExecutionError, ExecutionOutcome};
use alloy_primitives::B256;
use stf_types::Message;

/// Hooks invoked around every message the engine hands to the executor.
pub trait Tracer {
    fn on_tx_start(&mut self, tx_hash: B256, msg: &Message);

    /// Called with the executor's verdict before the engine acts on it.
    fn on_tx_end(&mut self, tx_hash: B256, result: Result<&ExecutionOutcome, &ExecutionError>);
}

/// Provides an optional tracer per transaction from its included index and hash.
/// A failure aborts the whole batch.
pub type TracerProvider<'a> =
    dyn FnMut(u64, B256) -> eyre::Result<Option<Box<dyn Tracer>>> + 'a;

/// Provider that never traces.
pub fn no_tracer(_index: u64, _tx_hash: B256) -> eyre::Result<Option<Box<dyn Tracer>>> {
    Ok(None)
}
