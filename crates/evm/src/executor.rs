use crate::adapter::StateDbAdapter;
use crate::spec::spec_id;
use alloy_primitives::{Address, TxKind};
use core::convert::Infallible;
use revm::context::result::{EVMError, InvalidTransaction};
use revm::context::{BlockEnv, CfgEnv, TxEnv};
use revm::context_interface::result::ResultAndState;
use revm::state::{Account, EvmState};
use revm::{Context, ExecuteEvm as _, MainBuilder as _, MainContext as _};
use stf_state::StateDb;
use stf_transition::executor::{check_nonce, intrinsic_gas};
use stf_transition::{ExecutionContext, ExecutionError, ExecutionOutcome, Executor, GasPool};
use stf_types::Message;
use tracing::{debug, trace};

/// Runs messages through a mainnet `revm` instance configured for the block's fork.
///
/// The pre-checks and block gas pool accounting match [`TransferExecutor`]: nonce
/// and gas purchase are checked before the pool is charged, intrinsic gas and the
/// value transfer after. Once charged the pool stays charged when the message is
/// refused. The remaining validation is revm's own.
///
/// [`TransferExecutor`]: stf_transition::TransferExecutor
#[derive(Debug, Default, Clone, Copy)]
pub struct RevmExecutor;

impl RevmExecutor {
    pub const fn new() -> Self {
        Self
    }
}

impl Executor for RevmExecutor {
    fn apply_message(
        &mut self,
        ctx: &ExecutionContext<'_>,
        msg: &Message,
        state: &mut StateDb,
        gas_pool: &mut GasPool,
    ) -> Result<ExecutionOutcome, ExecutionError> {
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

        let want = intrinsic_gas(msg, ctx.chain, ctx.number)?;
        if msg.gas_limit < want {
            return Err(ExecutionError::IntrinsicGas {
                have: msg.gas_limit,
                want,
            });
        }
        if !msg.value.is_zero() && balance - gas_cost < msg.value {
            return Err(ExecutionError::InsufficientFundsForTransfer { address: msg.from });
        }

        let executed = {
            let db = StateDbAdapter::new(state, &ctx.block_hashes);
            let mut evm = Context::mainnet()
                .with_block(block_env(ctx))
                .with_cfg(cfg_env(ctx))
                .with_db(db)
                .build_mainnet();
            evm.transact(tx_env(msg))
        };
        let ResultAndState { result, state: changes } =
            executed.map_err(|error| map_evm_error(msg.from, error))?;

        let gas_used = result.gas_used();
        gas_pool.add_gas(msg.gas_limit.saturating_sub(gas_used))?;
        commit_changes(state, changes);
        for log in result.logs() {
            state.add_log(log.clone());
        }

        let failed = !result.is_success();
        debug!(from = %msg.from, gas_used, failed, "Executed message");
        Ok(ExecutionOutcome {
            gas_used,
            failed,
            return_data: result.output().cloned().unwrap_or_default(),
        })
    }
}

fn block_env(ctx: &ExecutionContext<'_>) -> BlockEnv {
    BlockEnv {
        number: ctx.number.into(),
        beneficiary: ctx.coinbase,
        timestamp: ctx.timestamp.into(),
        gas_limit: ctx.gas_limit,
        basefee: 0,
        difficulty: ctx.difficulty,
        prevrandao: None,
        ..Default::default()
    }
}

fn cfg_env(ctx: &ExecutionContext<'_>) -> CfgEnv {
    let mut cfg = CfgEnv::default();
    cfg.chain_id = ctx.chain.chain_id;
    cfg.spec = spec_id(ctx.chain, ctx.number);
    cfg
}

/// The signer has already checked the chain id, revm is not asked to again.
fn tx_env(msg: &Message) -> TxEnv {
    TxEnv {
        tx_type: 0,
        caller: msg.from,
        kind: msg.to.map_or(TxKind::Create, TxKind::Call),
        nonce: msg.nonce,
        gas_limit: msg.gas_limit,
        gas_price: msg.gas_price,
        value: msg.value,
        data: msg.input.clone(),
        chain_id: None,
        ..TxEnv::default()
    }
}

fn map_evm_error(from: Address, error: EVMError<Infallible>) -> ExecutionError {
    match error {
        EVMError::Transaction(InvalidTransaction::NonceTooHigh { tx, state }) => {
            ExecutionError::NonceTooHigh {
                address: from,
                tx,
                state,
            }
        }
        EVMError::Transaction(InvalidTransaction::NonceTooLow { tx, state }) => {
            ExecutionError::NonceTooLow {
                address: from,
                tx,
                state,
            }
        }
        EVMError::Transaction(InvalidTransaction::NonceOverflowInTransaction) => {
            ExecutionError::NonceMax { address: from }
        }
        EVMError::Transaction(InvalidTransaction::LackOfFundForMaxFee { fee, balance }) => {
            ExecutionError::InsufficientFunds {
                address: from,
                have: *balance,
                want: *fee,
            }
        }
        other => ExecutionError::Vm(other.to_string()),
    }
}

/// Write the accounts revm touched back into the store, in address order.
fn commit_changes(state: &mut StateDb, changes: EvmState) {
    let mut changes: Vec<(Address, Account)> = changes.into_iter().collect();
    changes.sort_unstable_by_key(|(address, _)| *address);

    for (address, account) in changes {
        if !account.is_touched() {
            continue;
        }
        if account.is_selfdestructed() {
            trace!(%address, "Self-destructed account");
            state.self_destruct(address);
            continue;
        }
        if account.is_created() {
            state.create_account(address);
            let code = account
                .info
                .code
                .as_ref()
                .map(|code| code.original_bytes())
                .unwrap_or_default();
            if !code.is_empty() {
                state.set_code(address, code);
            }
        }
        if state.get_balance(&address) != account.info.balance {
            state.set_balance(address, account.info.balance);
        }
        if state.get_nonce(&address) != account.info.nonce {
            state.set_nonce(address, account.info.nonce);
        }
        for (slot, value) in account.changed_storage_slots() {
            state.set_state(address, (*slot).into(), value.present_value);
        }
        state.touch(address);
    }
}
