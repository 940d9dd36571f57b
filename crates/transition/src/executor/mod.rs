//! The message execution capability consumed by the transition engine.

mod transfer;

pub use transfer::TransferExecutor;

use crate::{GasPool, GasPoolError};
use alloy_primitives::{Address, Bytes, B256, U256};
use std::cell::Cell;
use std::collections::BTreeMap;
use stf_state::{StateDb, StateError};
use stf_types::{ChainConfig, Env, Message};
use tracing::warn;

/// Why a `BLOCKHASH` lookup could not be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MissingBlockHash {
    #[error("getHash({number}) invoked, no blockhashes provided")]
    NoTable { number: u64 },

    #[error("getHash({number}) invoked, blockhash for that block not provided")]
    NotProvided { number: u64 },
}

/// Block hash lookup that answers misses with the zero hash and remembers them.
///
/// The recorded fault is sticky for the whole batch: the engine checks it after
/// every successfully executed transaction.
#[derive(Debug)]
pub struct BlockHashOracle<'a> {
    table: Option<&'a BTreeMap<u64, B256>>,
    fault: Cell<Option<MissingBlockHash>>,
}

impl<'a> BlockHashOracle<'a> {
    pub const fn new(table: Option<&'a BTreeMap<u64, B256>>) -> Self {
        Self {
            table,
            fault: Cell::new(None),
        }
    }

    pub fn lookup(&self, number: u64) -> B256 {
        let Some(table) = self.table else {
            self.record(MissingBlockHash::NoTable { number });
            return B256::ZERO;
        };
        match table.get(&number) {
            Some(hash) => *hash,
            None => {
                self.record(MissingBlockHash::NotProvided { number });
                B256::ZERO
            }
        }
    }

    fn record(&self, fault: MissingBlockHash) {
        warn!(%fault, "Block hash lookup missed");
        self.fault.set(Some(fault));
    }

    /// Most recent lookup miss, if any.
    pub fn fault(&self) -> Option<MissingBlockHash> {
        self.fault.get()
    }
}

/// Block-level inputs shared by every message of the batch, plus the
/// per-transaction gas price and origin.
#[derive(Debug)]
pub struct ExecutionContext<'a> {
    pub coinbase: Address,
    pub number: u64,
    pub timestamp: u64,
    pub difficulty: U256,
    pub gas_limit: u64,
    pub chain: &'a ChainConfig,
    pub block_hashes: BlockHashOracle<'a>,
    pub gas_price: u128,
    pub origin: Address,
}

impl<'a> ExecutionContext<'a> {
    /// Context for the block described by `env`. Gas price and origin start zeroed.
    pub fn new(env: &'a Env, chain: &'a ChainConfig) -> Self {
        Self {
            coinbase: env.coinbase,
            number: env.number,
            timestamp: env.timestamp,
            difficulty: env.difficulty,
            gas_limit: env.gas_limit,
            chain,
            block_hashes: BlockHashOracle::new(env.block_hashes.as_ref()),
            gas_price: 0,
            origin: Address::ZERO,
        }
    }

    /// Empty accounts are deleted from this block on.
    pub const fn delete_empty(&self) -> bool {
        self.chain.is_eip158(self.number)
    }
}

/// Result of a message that was applied, whether or not its execution reverted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionOutcome {
    pub gas_used: u64,
    /// Execution reverted or ran out of gas, the transaction is still included
    pub failed: bool,
    pub return_data: Bytes,
}

/// The message could not be applied at all. The transaction is rejected.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("nonce too high: address {address}, tx: {tx} state: {state}")]
    NonceTooHigh { address: Address, tx: u64, state: u64 },

    #[error("nonce too low: address {address}, tx: {tx} state: {state}")]
    NonceTooLow { address: Address, tx: u64, state: u64 },

    #[error("nonce has max value: address {address}")]
    NonceMax { address: Address },

    #[error("insufficient funds for gas * price + value: address {address} have {have} want {want}")]
    InsufficientFunds {
        address: Address,
        have: U256,
        want: U256,
    },

    #[error("insufficient funds for transfer: address {address}")]
    InsufficientFundsForTransfer { address: Address },

    #[error(transparent)]
    GasLimitReached(#[from] GasPoolError),

    #[error("intrinsic gas too low: have {have}, want {want}")]
    IntrinsicGas { have: u64, want: u64 },

    #[error("gas uint64 overflow")]
    GasUintOverflow,

    #[error("message requires code execution, not supported by this executor")]
    CodeExecutionUnsupported,

    #[error("virtual machine error: {0}")]
    Vm(String),

    #[error(transparent)]
    State(#[from] StateError),
}

/// Executes one normalised message against the store and the block gas pool.
///
/// An `Err` means nothing of the message should be kept, the caller reverts the
/// store. An `Ok` outcome, failed or not, has already charged its gas.
pub trait Executor {
    fn apply_message(
        &mut self,
        ctx: &ExecutionContext<'_>,
        msg: &Message,
        state: &mut StateDb,
        gas_pool: &mut GasPool,
    ) -> Result<ExecutionOutcome, ExecutionError>;
}

impl<E: Executor + ?Sized> Executor for &mut E {
    fn apply_message(
        &mut self,
        ctx: &ExecutionContext<'_>,
        msg: &Message,
        state: &mut StateDb,
        gas_pool: &mut GasPool,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        (**self).apply_message(ctx, msg, state, gas_pool)
    }
}

/// Validate the sender nonce against the store.
pub fn check_nonce(msg: &Message, state: &StateDb) -> Result<(), ExecutionError> {
    let current = state.get_nonce(&msg.from);
    if current < msg.nonce {
        return Err(ExecutionError::NonceTooHigh {
            address: msg.from,
            tx: msg.nonce,
            state: current,
        });
    }
    if current > msg.nonce {
        return Err(ExecutionError::NonceTooLow {
            address: msg.from,
            tx: msg.nonce,
            state: current,
        });
    }
    if current == u64::MAX {
        return Err(ExecutionError::NonceMax { address: msg.from });
    }
    Ok(())
}

/// Gas charged before any execution: the base cost plus the calldata cost.
pub fn intrinsic_gas(msg: &Message, chain: &ChainConfig, number: u64) -> Result<u64, ExecutionError> {
    let base: u64 = if msg.is_create() && chain.is_homestead(number) {
        53_000
    } else {
        21_000
    };
    if msg.input.is_empty() {
        return Ok(base);
    }
    let non_zero = msg.input.iter().filter(|byte| **byte != 0).count() as u64;
    let zero = msg.input.len() as u64 - non_zero;
    let non_zero_cost: u64 = if chain.is_istanbul(number) { 16 } else { 68 };

    non_zero
        .checked_mul(non_zero_cost)
        .and_then(|gas| gas.checked_add(base))
        .and_then(|gas| zero.checked_mul(4).and_then(|z| gas.checked_add(z)))
        .ok_or(ExecutionError::GasUintOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_oracle_records_misses() {
        let mut table = BTreeMap::new();
        table.insert(1, B256::with_last_byte(1));
        let oracle = BlockHashOracle::new(Some(&table));

        assert_eq!(oracle.lookup(1), B256::with_last_byte(1));
        assert_eq!(oracle.fault(), None);
        assert_eq!(oracle.lookup(0), B256::ZERO);
        assert_eq!(oracle.fault(), Some(MissingBlockHash::NotProvided { number: 0 }));
        // a later hit does not clear the fault
        oracle.lookup(1);
        assert!(oracle.fault().is_some());

        let without_table = BlockHashOracle::new(None);
        assert_eq!(without_table.lookup(7), B256::ZERO);
        assert_eq!(
            without_table.fault(),
            Some(MissingBlockHash::NoTable { number: 7 })
        );
    }

    fn message(to: Option<Address>, input: &[u8]) -> Message {
        Message {
            from: Address::ZERO,
            to,
            nonce: 0,
            value: U256::ZERO,
            gas_limit: 100_000,
            gas_price: 1,
            input: Bytes::copy_from_slice(input),
        }
    }

    #[rstest]
    #[case(Some(Address::ZERO), &[], 0, 21_000)]
    #[case(None, &[], 0, 21_000)]
    #[case(None, &[], 1_150_000, 53_000)]
    #[case(Some(Address::ZERO), &[0, 1], 0, 21_000 + 4 + 68)]
    #[case(Some(Address::ZERO), &[0, 1], 9_069_000, 21_000 + 4 + 16)]
    fn test_intrinsic_gas(
        #[case] to: Option<Address>,
        #[case] input: &[u8],
        #[case] number: u64,
        #[case] expected: u64,
    ) {
        let gas = intrinsic_gas(&message(to, input), &ChainConfig::mainnet(), number).unwrap();
        assert_eq!(gas, expected);
    }
}
