use alloy_primitives::U256;
use stf_state::{StateDb, StateError};
use stf_types::DaoForkConfig;
use tracing::debug;

/// Irregular state change of the DAO fork block: move the full balance of every
/// drained account into the refund contract.
pub fn apply_dao_hard_fork(state: &mut StateDb, dao: &DaoForkConfig) -> Result<(), StateError> {
    if !state.exist(&dao.refund_contract) {
        state.create_account(dao.refund_contract);
    }
    for address in &dao.drain_list {
        let balance = state.get_balance(address);
        state.add_balance(dao.refund_contract, balance)?;
        state.set_balance(*address, U256::ZERO);
    }
    debug!(
        refund_contract = %dao.refund_contract,
        drained = dao.drain_list.len(),
        "Applied DAO hard fork"
    );
    Ok(())
}
