use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GasPoolError {
    #[error("gas limit reached: {available} available, {requested} requested")]
    LimitReached { available: u64, requested: u64 },

    #[error("gas pool overflow: {available} available, adding {amount}")]
    Overflow { available: u64, amount: u64 },
}

/// Gas still available to the transactions of the block.
///
/// Filled once with the block gas limit, then drawn down and partially refunded
/// by each executed message. Only one message uses the pool at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GasPool(u64);

impl GasPool {
    pub const fn new() -> Self {
        Self(0)
    }

    pub fn add_gas(&mut self, amount: u64) -> Result<(), GasPoolError> {
        self.0 = self.0.checked_add(amount).ok_or(GasPoolError::Overflow {
            available: self.0,
            amount,
        })?;
        Ok(())
    }

    /// Take `amount` out of the pool. On failure the pool is left untouched.
    pub fn sub_gas(&mut self, amount: u64) -> Result<(), GasPoolError> {
        self.0 = self
            .0
            .checked_sub(amount)
            .ok_or(GasPoolError::LimitReached {
                available: self.0,
                requested: amount,
            })?;
        Ok(())
    }

    pub const fn gas(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for GasPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_sub_beyond_capacity_leaves_pool_intact() {
        let mut pool = GasPool::new();
        pool.add_gas(30_000).unwrap();
        pool.sub_gas(21_000).unwrap();
        assert_eq!(pool.gas(), 9_000);

        assert_eq!(
            pool.sub_gas(9_001),
            Err(GasPoolError::LimitReached {
                available: 9_000,
                requested: 9_001,
            })
        );
        assert_eq!(pool.gas(), 9_000);
        pool.sub_gas(9_000).unwrap();
        assert_eq!(pool.gas(), 0);
    }

    #[test]
    fn test_add_overflow() {
        let mut pool = GasPool::new();
        pool.add_gas(u64::MAX).unwrap();
        assert_matches!(pool.add_gas(1), Err(GasPoolError::Overflow { .. }));
        assert_eq!(pool.gas(), u64::MAX);
    }
}
