//! Contains the common set of types used across all of the `stf` crates.
//!
//! Primitive values (addresses, hashes, integers, blooms, logs) are the
//! `alloy-primitives` types and are re-exported from here so downstream crates
//! agree on a single definition.
pub mod chain_config;
pub mod env;
pub mod message;
pub mod receipt;
pub mod serde_utils;
pub mod transaction;

pub use chain_config::*;
pub use env::*;
pub use message::*;
pub use receipt::*;
pub use transaction::*;

pub use alloy_genesis::GenesisAccount;
pub use alloy_primitives::{keccak256, Address, Bloom, Bytes, Log, LogData, B256, U256};

/// Address-keyed allocation of accounts, used both for prestates and post-state dumps.
pub type GenesisAlloc = std::collections::BTreeMap<Address, GenesisAccount>;
