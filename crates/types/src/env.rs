//! Block environment a transition is evaluated in.

use crate::serde_utils::{block_hashes, hex_or_decimal_u256, hex_or_decimal_u64};
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Header-level inputs of the block being built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Env {
    #[serde(rename = "currentCoinbase")]
    pub coinbase: Address,

    #[serde(rename = "currentDifficulty", with = "hex_or_decimal_u256")]
    pub difficulty: U256,

    #[serde(rename = "currentGasLimit", with = "hex_or_decimal_u64")]
    pub gas_limit: u64,

    #[serde(rename = "currentNumber", with = "hex_or_decimal_u64")]
    pub number: u64,

    #[serde(rename = "currentTimestamp", with = "hex_or_decimal_u64")]
    pub timestamp: u64,

    /// Ancestor hashes available to the `BLOCKHASH` lookup, keyed by block number.
    #[serde(
        rename = "blockHashes",
        default,
        with = "block_hashes",
        skip_serializing_if = "Option::is_none"
    )]
    pub block_hashes: Option<BTreeMap<u64, B256>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ommers: Vec<Ommer>,
}

/// An uncle included by the block, identified by its miner and its depth below the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ommer {
    /// Inclusion depth, `number - uncle.number`
    #[serde(with = "hex_or_decimal_u64")]
    pub delta: u64,
    pub address: Address,
}

impl Env {
    /// Hash of block `number`, if the environment carries one.
    pub fn block_hash(&self, number: u64) -> Option<B256> {
        self.block_hashes.as_ref()?.get(&number).copied()
    }
}
