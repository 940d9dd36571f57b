//! Applies an ordered batch of transactions to a prestate.

use crate::dao::apply_dao_hard_fork;
use crate::executor::{ExecutionContext, Executor};
use crate::receipts::ReceiptAccumulator;
use crate::root::{encode_all, RootHasher, TrieRootHasher};
use crate::signer::{ChainSigner, Signer};
use crate::tracer::TracerProvider;
use crate::{GasPool, TransitionError};
use alloy_primitives::{b256, Bloom, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use stf_reward::BlockReward;
use stf_state::{MemoryBackend, StateBackend, StateDb};
use stf_types::{ChainConfig, Env, GenesisAlloc, Receipt, Transaction};
use tracing::{debug, info};

/// Stand-in hash of the block under construction, used to tag logs.
pub const PENDING_BLOCK_HASH: B256 =
    b256!("1337000000000000000000000000000000000000000000000000000000000000");

/// Everything a batch produced. `rejected` holds original batch indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub state_root: B256,
    pub tx_root: B256,
    pub receipt_root: B256,
    pub logs_hash: B256,
    pub logs_bloom: Bloom,
    pub receipts: Vec<Receipt>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<usize>,
}

/// The block environment plus the account allocation the batch starts from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prestate {
    pub env: Env,
    pub pre: GenesisAlloc,
}

impl Prestate {
    /// Materialise the allocation in a fresh in-memory store and apply `txs` on top.
    ///
    /// Returns the post-state store alongside the result so callers can dump it.
    pub fn apply(
        &self,
        chain: &ChainConfig,
        executor: &mut dyn Executor,
        txs: &[Transaction],
        reward: U256,
        get_tracer: &mut TracerProvider<'_>,
    ) -> Result<(StateDb, ExecutionResult), TransitionError> {
        let backend: Arc<dyn StateBackend> = Arc::new(MemoryBackend::new());
        let mut state = StateDb::from_alloc(&self.pre, backend)?;
        let reward = BlockReward::from_env(reward, &self.env);
        let result = StateTransition::new(chain, &self.env).apply(
            &mut state,
            executor,
            txs,
            &reward,
            get_tracer,
        )?;
        Ok((state, result))
    }
}

/// Orchestrates one batch: signer, executor, receipts, rewards and roots.
#[derive(Debug)]
pub struct StateTransition<'a, S = ChainSigner, H = TrieRootHasher> {
    chain: &'a ChainConfig,
    env: &'a Env,
    signer: S,
    root_hasher: H,
}

impl<'a> StateTransition<'a> {
    /// Transition for the block in `env`, with the signer its number calls for.
    pub const fn new(chain: &'a ChainConfig, env: &'a Env) -> Self {
        Self {
            chain,
            env,
            signer: ChainSigner::for_block(chain, env.number),
            root_hasher: TrieRootHasher,
        }
    }
}

impl<'a, S: Signer, H: RootHasher> StateTransition<'a, S, H> {
    pub fn with_signer<T: Signer>(self, signer: T) -> StateTransition<'a, T, H> {
        StateTransition {
            chain: self.chain,
            env: self.env,
            signer,
            root_hasher: self.root_hasher,
        }
    }

    pub fn with_root_hasher<T: RootHasher>(self, root_hasher: T) -> StateTransition<'a, S, T> {
        StateTransition {
            chain: self.chain,
            env: self.env,
            signer: self.signer,
            root_hasher,
        }
    }

    /// Apply `txs` in order to `state`.
    ///
    /// Transactions that fail signature checks or that the executor refuses are
    /// rejected by index and leave no trace in the store. Everything else is
    /// included with a receipt, successful or not. A missed block hash lookup
    /// fails the batch after the transaction that caused it has been included.
    pub fn apply(
        &self,
        state: &mut StateDb,
        executor: &mut dyn Executor,
        txs: &[Transaction],
        reward: &BlockReward,
        get_tracer: &mut TracerProvider<'_>,
    ) -> Result<ExecutionResult, TransitionError> {
        let number = self.env.number;
        let delete_empty = self.chain.is_eip158(number);
        let byzantium = self.chain.is_byzantium(number);

        if self.chain.is_dao_fork_block(number) {
            info!(number, "Applying DAO hard fork state patch");
            apply_dao_hard_fork(state, &self.chain.dao).map_err(TransitionError::Dao)?;
        }

        let mut gas_pool = GasPool::new();
        gas_pool.add_gas(self.env.gas_limit)?;
        let mut ctx = ExecutionContext::new(self.env, self.chain);
        let mut receipts = ReceiptAccumulator::new();
        let mut included: Vec<&Transaction> = Vec::with_capacity(txs.len());
        let mut rejected = Vec::new();

        for (index, tx) in txs.iter().enumerate() {
            let tx_hash = tx.hash();
            let msg = match self.signer.to_message(tx) {
                Ok(msg) => msg,
                Err(error) => {
                    info!(index, hash = %tx_hash, %error, "Rejected transaction");
                    rejected.push(index);
                    continue;
                }
            };

            let tx_index = receipts.len() as u64;
            let mut tracer = get_tracer(tx_index, tx_hash).map_err(|report| {
                TransitionError::TracerProvision {
                    index: tx_index,
                    tx_hash,
                    source: report.into(),
                }
            })?;
            state.prepare(tx_hash, PENDING_BLOCK_HASH, tx_index);
            ctx.gas_price = msg.gas_price;
            ctx.origin = msg.from;

            if let Some(tracer) = tracer.as_mut() {
                tracer.on_tx_start(tx_hash, &msg);
            }
            let snapshot = state.snapshot();
            let result = executor.apply_message(&ctx, &msg, state, &mut gas_pool);
            if let Some(tracer) = tracer.as_mut() {
                tracer.on_tx_end(tx_hash, result.as_ref());
            }
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(error) => {
                    state.revert_to_snapshot(snapshot)?;
                    info!(index, hash = %tx_hash, from = %msg.from, %error, "Rejected transaction");
                    rejected.push(index);
                    continue;
                }
            };

            included.push(tx);
            if let Some(fault) = ctx.block_hashes.fault() {
                return Err(TransitionError::MissingBlockHash(fault));
            }

            let post_state = if byzantium {
                state.finalise(true);
                Bytes::new()
            } else {
                Bytes::copy_from_slice(state.intermediate_root(delete_empty).as_slice())
            };
            let receipt = receipts.record(
                tx_hash,
                &outcome,
                post_state,
                state.logs_of(&tx_hash),
                msg.created_address(),
            );
            debug!(
                index,
                hash = %tx_hash,
                tx_index,
                gas_used = outcome.gas_used,
                cumulative_gas_used = receipt.cumulative_gas_used,
                failed = outcome.failed,
                "Included transaction"
            );
        }

        state.intermediate_root(delete_empty);
        if reward.is_enabled() {
            reward.distribute(state)?;
        }
        let state_root = state.commit(delete_empty).map_err(TransitionError::Commit)?;

        let tx_root = self.root_hasher.ordered_root(&encode_all(included.iter().copied()));
        let receipt_root = self
            .root_hasher
            .ordered_root(&encode_all(receipts.receipts()));
        let logs_hash = receipts.logs_hash();
        let logs_bloom = receipts.bloom();
        info!(
            %state_root,
            included = included.len(),
            rejected = rejected.len(),
            gas_used = receipts.cumulative_gas_used(),
            "Applied transaction batch"
        );

        Ok(ExecutionResult {
            state_root,
            tx_root,
            receipt_root,
            logs_hash,
            logs_bloom,
            receipts: receipts.into_receipts(),
            rejected,
        })
    }
}
