use alloy_primitives::{Address, B256, U256};
use core::convert::Infallible;
use revm::bytecode::Bytecode;
use revm::database_interface::Database;
use revm::state::AccountInfo;
use stf_state::StateDb;
use stf_transition::BlockHashOracle;

/// Read-only [`Database`] view over a [`StateDb`].
///
/// `BLOCKHASH` lookups are routed through the batch's [`BlockHashOracle`], so a
/// miss answers zero and is remembered for the engine to act on.
#[derive(Debug)]
pub struct StateDbAdapter<'a> {
    state: &'a StateDb,
    block_hashes: &'a BlockHashOracle<'a>,
}

impl<'a> StateDbAdapter<'a> {
    pub const fn new(state: &'a StateDb, block_hashes: &'a BlockHashOracle<'a>) -> Self {
        Self {
            state,
            block_hashes,
        }
    }
}

impl Database for StateDbAdapter<'_> {
    type Error = Infallible;

    fn basic(&mut self, address: Address) -> Result<Option<AccountInfo>, Self::Error> {
        Ok(self.state.account(&address).map(|account| {
            AccountInfo::new(
                account.balance,
                account.nonce,
                account.code_hash,
                Bytecode::new_legacy(account.code.clone()),
            )
        }))
    }

    fn code_by_hash(&mut self, code_hash: B256) -> Result<Bytecode, Self::Error> {
        // `basic` always ships the code, this is only hit for hashes it never returned
        let code = self
            .state
            .accounts()
            .find(|(_, account)| account.code_hash == code_hash)
            .map(|(_, account)| Bytecode::new_legacy(account.code.clone()))
            .unwrap_or_default();
        Ok(code)
    }

    fn storage(&mut self, address: Address, index: U256) -> Result<U256, Self::Error> {
        Ok(self.state.get_state(&address, &B256::from(index)))
    }

    fn block_hash(&mut self, number: u64) -> Result<B256, Self::Error> {
        Ok(self.block_hashes.lookup(number))
    }
}
