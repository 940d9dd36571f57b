//! Per-transaction outcome records.

use crate::serde_utils::hex_or_decimal_u64;
use alloy_primitives::{Address, Bloom, Bytes, Log, B256};
use alloy_rlp::{BufMut, Encodable, Header};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Outcome of an included transaction. Rejected transactions never get a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxStatus {
    Failed,
    Success,
}

impl TxStatus {
    pub const fn from_failed(failed: bool) -> Self {
        if failed {
            Self::Failed
        } else {
            Self::Success
        }
    }

    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl Serialize for TxStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(match self {
            Self::Failed => "0x0",
            Self::Success => "0x1",
        })
    }
}

impl<'de> Deserialize<'de> for TxStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.as_str() {
            "0x0" | "0x00" => Ok(Self::Failed),
            "0x1" | "0x01" => Ok(Self::Success),
            other => Err(serde::de::Error::custom(format!(
                "unknown receipt status {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Intermediate state root after this transaction; empty once Byzantium is active
    #[serde(rename = "root")]
    pub post_state: Bytes,

    pub status: TxStatus,

    /// Gas used by this and every earlier included transaction
    #[serde(with = "hex_or_decimal_u64")]
    pub cumulative_gas_used: u64,

    /// Bloom over this receipt's own logs
    pub logs_bloom: Bloom,

    pub logs: Vec<Log>,

    #[serde(rename = "transactionHash")]
    pub tx_hash: B256,

    /// Set only for contract creation transactions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<Address>,

    #[serde(with = "hex_or_decimal_u64")]
    pub gas_used: u64,

    /// Zero-hash placeholder while the containing block is still being built
    pub block_hash: B256,

    /// Position among the included transactions of the block
    #[serde(with = "hex_or_decimal_u64")]
    pub transaction_index: u64,
}

impl Receipt {
    /// Bloom filter over the logs' addresses and topics.
    pub fn bloom_of(logs: &[Log]) -> Bloom {
        let mut bloom = Bloom::ZERO;
        for log in logs {
            bloom.accrue_log(log);
        }
        bloom
    }

    /// First consensus field: the intermediate root when one was recorded, the
    /// status byte otherwise.
    fn post_state_or_status(&self) -> &[u8] {
        if !self.post_state.is_empty() {
            return &self.post_state;
        }
        match self.status {
            TxStatus::Success => &[0x01_u8][..],
            TxStatus::Failed => &[][..],
        }
    }

    fn rlp_payload_length(&self) -> usize {
        self.post_state_or_status().length()
            + self.cumulative_gas_used.length()
            + self.logs_bloom.length()
            + self.logs.length()
    }
}

/// Consensus encoding `[post_state_or_status, cumulative_gas_used, bloom, logs]`.
impl Encodable for Receipt {
    fn encode(&self, out: &mut dyn BufMut) {
        Header {
            list: true,
            payload_length: self.rlp_payload_length(),
        }
        .encode(out);
        self.post_state_or_status().encode(out);
        self.cumulative_gas_used.encode(out);
        self.logs_bloom.encode(out);
        self.logs.encode(out);
    }

    fn length(&self) -> usize {
        let payload_length = self.rlp_payload_length();
        payload_length + alloy_rlp::length_of_length(payload_length)
    }
}
