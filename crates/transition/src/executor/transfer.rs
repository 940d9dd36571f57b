use super::{check_nonce, intrinsic_gas, ExecutionContext, ExecutionError, ExecutionOutcome, Executor};
use crate::GasPool;
use alloy_primitives::{Address, Bytes, U256};
use stf_state::StateDb;
use stf_types::Message;
use tracing::trace;

/// Executor for messages that never run code: value transfers between
/// accounts without code and creations with empty init code.
///
/// Follows the message pre-checks and gas accounting of a full virtual machine.
/// A message that would need code to run is refused before any gas is bought.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransferExecutor;

impl TransferExecutor {
    pub const fn new() -> Self {
        Self
    }

    fn needs_code(ctx: &ExecutionContext<'_>, msg: &Message, state: &StateDb) -> bool {
        match msg.to {
            None => !msg.input.is_empty(),
            Some(to) => !state.get_code(&to).is_empty() || is_precompile(ctx, to),
        }
    }
}

/// Addresses of the precompiled contracts active at the context's block.
fn is_precompile(ctx: &ExecutionContext<'_>, address: Address) -> bool {
    let last = if ctx.chain.is_istanbul(ctx.number) {
        9
    } else if ctx.chain.is_byzantium(ctx.number) {
        8
    } else {
        4
    };
    let bytes = address.as_slice();
    bytes[..19].iter().all(|byte| *byte == 0) && (1..=last).contains(&bytes[19])
}

impl Executor for TransferExecutor {
    fn apply_message(
        &mut self,
        ctx: &ExecutionContext<'_>,
        msg: &Message,
        state: &mut StateDb,
        gas_pool: &mut GasPool,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        if Self::needs_code(ctx, msg, state) {
            return Err(ExecutionError::CodeExecutionUnsupported);
        }
        check_nonce(msg, state)?;

        // buy gas
        let gas_cost = msg.gas_cost();
        let balance = state.get_balance(&msg.from);
        if balance < gas_cost {
            return Err(ExecutionError::InsufficientFunds {
                address: msg.from,
                have: balance,
                want: gas_cost,
            });
        }
        gas_pool.sub_gas(msg.gas_limit)?;
        state.sub_balance(msg.from, gas_cost)?;

        // from here on the pool stays charged even if the message is refused
        let intrinsic = intrinsic_gas(msg, ctx.chain, ctx.number)?;
        if msg.gas_limit < intrinsic {
            return Err(ExecutionError::IntrinsicGas {
                have: msg.gas_limit,
                want: intrinsic,
            });
        }
        if !msg.value.is_zero() && state.get_balance(&msg.from) < msg.value {
            return Err(ExecutionError::InsufficientFundsForTransfer { address: msg.from });
        }

        let nonce = state.get_nonce(&msg.from);
        state.set_nonce(msg.from, nonce + 1);
        match msg.to {
            None => {
                let address = msg.from.create(msg.nonce);
                if state.get_nonce(&address) != 0 || !state.get_code(&address).is_empty() {
                    // address collision consumes the whole allowance
                    trace!(%address, "Contract address collision");
                    return settle(ctx, msg, state, gas_pool, msg.gas_limit, true);
                }
                state.create_account(address);
                if ctx.delete_empty() {
                    state.set_nonce(address, 1);
                }
                state.sub_balance(msg.from, msg.value)?;
                state.add_balance(address, msg.value)?;
                state.set_code(address, Bytes::new());
                trace!(%address, "Created account without code");
            }
            Some(to) => {
                let skip = !state.exist(&to) && ctx.delete_empty() && msg.value.is_zero();
                if !skip {
                    if !state.exist(&to) {
                        state.create_account(to);
                    }
                    state.sub_balance(msg.from, msg.value)?;
                    state.add_balance(to, msg.value)?;
                }
            }
        }

        // no code ran, so nothing beyond the intrinsic cost is consumed
        settle(ctx, msg, state, gas_pool, intrinsic, false)
    }
}

/// Return unused gas to the sender and the pool, pay the coinbase for the rest.
fn settle(
    ctx: &ExecutionContext<'_>,
    msg: &Message,
    state: &mut StateDb,
    gas_pool: &mut GasPool,
    gas_used: u64,
    failed: bool,
) -> Result<ExecutionOutcome, ExecutionError> {
    let price = U256::from(msg.gas_price);
    let remaining = msg.gas_limit - gas_used;
    state.add_balance(msg.from, U256::from(remaining) * price)?;
    gas_pool.add_gas(remaining)?;
    state.add_balance(ctx.coinbase, U256::from(gas_used) * price)?;

    Ok(ExecutionOutcome {
        gas_used,
        failed,
        return_data: Bytes::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GasPoolError;
    use alloy_primitives::address;
    use assert_matches::assert_matches;
    use rstest::{fixture, rstest};
    use stf_state::MemoryBackend;
    use stf_types::{ChainConfig, Env};

    const SENDER: Address = address!("00000000000000000000000000000000000a11ce");
    const RECEIVER: Address = address!("0000000000000000000000000000000000000b0b");
    const COINBASE: Address = address!("00000000000000000000000000000000000000cb");

    fn env(gas_limit: u64) -> Env {
        Env {
            coinbase: COINBASE,
            difficulty: U256::from(0x20000_u64),
            gas_limit,
            number: 1,
            timestamp: 1_000,
            block_hashes: None,
            ommers: Vec::new(),
        }
    }

    #[fixture]
    fn state() -> StateDb {
        let mut state = StateDb::new(MemoryBackend::shared());
        state.set_balance(SENDER, U256::from(100_000_u64));
        state
    }

    fn transfer(to: Option<Address>, value: u64, gas_limit: u64) -> Message {
        Message {
            from: SENDER,
            to,
            nonce: 0,
            value: U256::from(value),
            gas_limit,
            gas_price: 1,
            input: Bytes::new(),
        }
    }

    fn pool(gas: u64) -> GasPool {
        let mut pool = GasPool::new();
        pool.add_gas(gas).unwrap();
        pool
    }

    #[rstest]
    fn test_value_transfer(mut state: StateDb) {
        let (env, chain) = (env(1_000_000), ChainConfig::all_forks(1));
        let ctx = ExecutionContext::new(&env, &chain);
        let mut gas_pool = pool(1_000_000);

        let outcome = TransferExecutor
            .apply_message(&ctx, &transfer(Some(RECEIVER), 10, 30_000), &mut state, &mut gas_pool)
            .unwrap();

        assert_eq!(outcome.gas_used, 21_000);
        assert!(!outcome.failed);
        assert_eq!(gas_pool.gas(), 1_000_000 - 21_000);
        assert_eq!(state.get_balance(&SENDER), U256::from(100_000 - 21_000 - 10_u64));
        assert_eq!(state.get_balance(&RECEIVER), U256::from(10_u64));
        assert_eq!(state.get_balance(&COINBASE), U256::from(21_000_u64));
        assert_eq!(state.get_nonce(&SENDER), 1);
    }

    #[rstest]
    #[case(0, 1)]
    #[case(2, 1)]
    fn test_nonce_mismatch(mut state: StateDb, #[case] state_nonce: u64, #[case] tx_nonce: u64) {
        let (env, chain) = (env(1_000_000), ChainConfig::all_forks(1));
        let ctx = ExecutionContext::new(&env, &chain);
        let mut gas_pool = pool(1_000_000);
        state.set_nonce(SENDER, state_nonce);
        let msg = Message {
            nonce: tx_nonce,
            ..transfer(Some(RECEIVER), 1, 21_000)
        };

        let err = TransferExecutor
            .apply_message(&ctx, &msg, &mut state, &mut gas_pool)
            .unwrap_err();
        if tx_nonce > state_nonce {
            assert_matches!(err, ExecutionError::NonceTooHigh { .. });
        } else {
            assert_matches!(err, ExecutionError::NonceTooLow { .. });
        }
        assert_eq!(gas_pool.gas(), 1_000_000);
        assert_eq!(state.get_balance(&SENDER), U256::from(100_000_u64));
    }

    #[rstest]
    fn test_insufficient_funds_for_value_keeps_pool_charged(mut state: StateDb) {
        let (env, chain) = (env(1_000_000), ChainConfig::all_forks(1));
        let ctx = ExecutionContext::new(&env, &chain);
        let mut gas_pool = pool(1_000_000);

        assert_matches!(
            TransferExecutor.apply_message(
                &ctx,
                &transfer(Some(RECEIVER), 90_000, 21_000),
                &mut state,
                &mut gas_pool
            ),
            Err(ExecutionError::InsufficientFundsForTransfer { address }) if address == SENDER
        );
        assert_eq!(gas_pool.gas(), 1_000_000 - 21_000);
    }

    #[rstest]
    fn test_gas_pool_exhausted(mut state: StateDb) {
        let (env, chain) = (env(20_000), ChainConfig::all_forks(1));
        let ctx = ExecutionContext::new(&env, &chain);
        let mut gas_pool = pool(20_000);

        assert_matches!(
            TransferExecutor.apply_message(
                &ctx,
                &transfer(Some(RECEIVER), 1, 21_000),
                &mut state,
                &mut gas_pool
            ),
            Err(ExecutionError::GasLimitReached(GasPoolError::LimitReached { .. }))
        );
        assert_eq!(gas_pool.gas(), 20_000);
    }

    #[rstest]
    fn test_insufficient_funds_for_gas(mut state: StateDb) {
        let (env, chain) = (env(1_000_000), ChainConfig::all_forks(1));
        let ctx = ExecutionContext::new(&env, &chain);
        let mut gas_pool = pool(1_000_000);

        assert_matches!(
            TransferExecutor.apply_message(
                &ctx,
                &transfer(Some(RECEIVER), 0, 100_001),
                &mut state,
                &mut gas_pool
            ),
            Err(ExecutionError::InsufficientFunds { .. })
        );
    }

    #[rstest]
    fn test_intrinsic_gas_too_low(mut state: StateDb) {
        let (env, chain) = (env(1_000_000), ChainConfig::all_forks(1));
        let ctx = ExecutionContext::new(&env, &chain);
        let mut gas_pool = pool(1_000_000);

        assert_matches!(
            TransferExecutor.apply_message(
                &ctx,
                &transfer(Some(RECEIVER), 0, 20_999),
                &mut state,
                &mut gas_pool
            ),
            Err(ExecutionError::IntrinsicGas { have: 20_999, want: 21_000 })
        );
    }

    #[rstest]
    #[case(ChainConfig::all_forks(1), false)]
    #[case(ChainConfig::frontier(1), true)]
    fn test_zero_value_call_to_missing_account(
        mut state: StateDb,
        #[case] chain: ChainConfig,
        #[case] created: bool,
    ) {
        let env = env(1_000_000);
        let ctx = ExecutionContext::new(&env, &chain);
        let mut gas_pool = pool(1_000_000);

        TransferExecutor
            .apply_message(&ctx, &transfer(Some(RECEIVER), 0, 21_000), &mut state, &mut gas_pool)
            .unwrap();
        assert_eq!(state.exist(&RECEIVER), created);
        assert_eq!(state.get_nonce(&SENDER), 1);
    }

    #[rstest]
    fn test_plain_creation(mut state: StateDb) {
        let (env, chain) = (env(1_000_000), ChainConfig::all_forks(1));
        let ctx = ExecutionContext::new(&env, &chain);
        let mut gas_pool = pool(1_000_000);
        let msg = transfer(None, 5, 60_000);

        let outcome = TransferExecutor
            .apply_message(&ctx, &msg, &mut state, &mut gas_pool)
            .unwrap();
        assert_eq!(outcome.gas_used, 53_000);

        let created = SENDER.create(0);
        assert_eq!(msg.created_address(), Some(created));
        assert_eq!(state.get_balance(&created), U256::from(5_u64));
        assert_eq!(state.get_nonce(&created), 1);
        assert!(state.get_code(&created).is_empty());
    }

    #[rstest]
    fn test_creation_collision_fails_and_burns_gas(mut state: StateDb) {
        let (env, chain) = (env(1_000_000), ChainConfig::all_forks(1));
        let ctx = ExecutionContext::new(&env, &chain);
        let mut gas_pool = pool(1_000_000);
        state.set_nonce(SENDER.create(0), 1);

        let outcome = TransferExecutor
            .apply_message(&ctx, &transfer(None, 5, 60_000), &mut state, &mut gas_pool)
            .unwrap();
        assert!(outcome.failed);
        assert_eq!(outcome.gas_used, 60_000);
        assert_eq!(gas_pool.gas(), 1_000_000 - 60_000);
        assert_eq!(state.get_balance(&SENDER), U256::from(40_000_u64));
        assert_eq!(state.get_balance(&COINBASE), U256::from(60_000_u64));
        assert_eq!(state.get_nonce(&SENDER), 1);
    }

    #[rstest]
    fn test_code_execution_refused(mut state: StateDb) {
        let (env, chain) = (env(1_000_000), ChainConfig::all_forks(1));
        let ctx = ExecutionContext::new(&env, &chain);
        let mut gas_pool = pool(1_000_000);
        state.set_code(RECEIVER, Bytes::from_static(&[0x00]));

        assert_matches!(
            TransferExecutor.apply_message(
                &ctx,
                &transfer(Some(RECEIVER), 0, 21_000),
                &mut state,
                &mut gas_pool
            ),
            Err(ExecutionError::CodeExecutionUnsupported)
        );
        assert_matches!(
            TransferExecutor.apply_message(
                &ctx,
                &transfer(Some(Address::with_last_byte(9)), 0, 21_000),
                &mut state,
                &mut gas_pool
            ),
            Err(ExecutionError::CodeExecutionUnsupported)
        );
        assert_eq!(gas_pool.gas(), 1_000_000);
    }
}
