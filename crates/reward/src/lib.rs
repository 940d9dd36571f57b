use alloy_primitives::{Address, U256};
use stf_state::{StateDb, StateError};
use stf_types::{Env, Ommer};
use tracing::{debug, warn};

/// Deepest uncle inclusion that still earns a reward.
pub const MAX_UNCLE_DEPTH: u64 = 8;

#[derive(Debug, thiserror::Error)]
pub enum RewardError {
    #[error("reward computation overflowed for {address}")]
    Overflow { address: Address },

    #[error(transparent)]
    State(#[from] StateError),
}

/// A single balance credit produced by the reward schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credit {
    pub address: Address,
    pub amount: U256,
}

/// End-of-block mining reward:
///
/// * every uncle at depth `d` earns `((8 - d) * R) / 8`
/// * the miner earns `R` plus `R / 32` per included uncle
///
/// All divisions truncate. A zero base reward disables the schedule entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockReward {
    pub base: U256,
    pub coinbase: Address,
    pub ommers: Vec<Ommer>,
}

impl BlockReward {
    pub const fn new(base: U256, coinbase: Address, ommers: Vec<Ommer>) -> Self {
        Self {
            base,
            coinbase,
            ommers,
        }
    }

    /// Reward for the block described by `env`.
    pub fn from_env(base: U256, env: &Env) -> Self {
        Self::new(base, env.coinbase, env.ommers.clone())
    }

    pub fn is_enabled(&self) -> bool {
        !self.base.is_zero()
    }

    /// Credits in the order they are applied: uncles as encountered, the miner last.
    pub fn credits(&self) -> Result<Vec<Credit>, RewardError> {
        let mut credits = Vec::with_capacity(self.ommers.len() + 1);
        let per_uncle_bonus = self.base / U256::from(32_u64);
        let mut miner = self.base;

        for ommer in &self.ommers {
            miner = miner
                .checked_add(per_uncle_bonus)
                .ok_or(RewardError::Overflow {
                    address: self.coinbase,
                })?;
            credits.push(Credit {
                address: ommer.address,
                amount: self.uncle_reward(ommer)?,
            });
        }

        credits.push(Credit {
            address: self.coinbase,
            amount: miner,
        });
        Ok(credits)
    }

    fn uncle_reward(&self, ommer: &Ommer) -> Result<U256, RewardError> {
        if ommer.delta == 0 || ommer.delta > MAX_UNCLE_DEPTH {
            warn!(
                uncle = %ommer.address,
                delta = ommer.delta,
                "Uncle inclusion depth outside 1..=8"
            );
        }
        // depth 0 pays the full base reward, depths past 8 clamp to nothing
        let factor = MAX_UNCLE_DEPTH.saturating_sub(ommer.delta);
        let scaled = U256::from(factor)
            .checked_mul(self.base)
            .ok_or(RewardError::Overflow {
                address: ommer.address,
            })?;
        Ok(scaled / U256::from(MAX_UNCLE_DEPTH))
    }

    /// Apply every credit to `state`. Does nothing when the base reward is zero.
    pub fn distribute(&self, state: &mut StateDb) -> Result<(), RewardError> {
        if !self.is_enabled() {
            return Ok(());
        }
        for credit in self.credits()? {
            debug!(address = %credit.address, amount = %credit.amount, "Crediting block reward");
            state.add_balance(credit.address, credit.amount)?;
        }
        Ok(())
    }
}
