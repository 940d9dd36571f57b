use crate::executor::ExecutionOutcome;
use alloy_primitives::{keccak256, Address, Bloom, Bytes, Log, B256};
use stf_types::{Receipt, TxStatus};

/// Builds receipts for the included transactions of a batch.
#[derive(Debug, Default)]
pub struct ReceiptAccumulator {
    receipts: Vec<Receipt>,
    cumulative_gas_used: u64,
}

impl ReceiptAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the receipt of the next included transaction. Its index is the
    /// number of receipts recorded before it.
    pub fn record(
        &mut self,
        tx_hash: B256,
        outcome: &ExecutionOutcome,
        post_state: Bytes,
        logs: Vec<Log>,
        contract_address: Option<Address>,
    ) -> &Receipt {
        self.cumulative_gas_used = self.cumulative_gas_used.saturating_add(outcome.gas_used);
        let receipt = Receipt {
            post_state,
            status: TxStatus::from_failed(outcome.failed),
            cumulative_gas_used: self.cumulative_gas_used,
            logs_bloom: Receipt::bloom_of(&logs),
            logs,
            tx_hash,
            contract_address,
            gas_used: outcome.gas_used,
            block_hash: B256::ZERO,
            transaction_index: self.receipts.len() as u64,
        };
        self.receipts.push(receipt);
        &self.receipts[self.receipts.len() - 1]
    }

    /// Number of receipts so far, which is also the index of the next one.
    pub fn len(&self) -> usize {
        self.receipts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receipts.is_empty()
    }

    pub const fn cumulative_gas_used(&self) -> u64 {
        self.cumulative_gas_used
    }

    pub fn receipts(&self) -> &[Receipt] {
        &self.receipts
    }

    /// Union of every receipt bloom.
    pub fn bloom(&self) -> Bloom {
        let mut bloom = Bloom::ZERO;
        for receipt in &self.receipts {
            bloom.accrue_bloom(&receipt.logs_bloom);
        }
        bloom
    }

    /// `keccak256(rlp(logs))` over every log of every receipt, in inclusion order.
    pub fn logs_hash(&self) -> B256 {
        let logs: Vec<&Log> = self
            .receipts
            .iter()
            .flat_map(|receipt| receipt.logs.iter())
            .collect();
        keccak256(alloy_rlp::encode(&logs))
    }

    pub fn into_receipts(self) -> Vec<Receipt> {
        self.receipts
    }
}
