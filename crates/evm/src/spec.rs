use revm::primitives::hardfork::SpecId;
use stf_types::ChainConfig;

/// The EVM rule set active at block `number`.
pub const fn spec_id(chain: &ChainConfig, number: u64) -> SpecId {
    if chain.is_istanbul(number) {
        SpecId::ISTANBUL
    } else if chain.is_petersburg(number) {
        SpecId::PETERSBURG
    } else if chain.is_constantinople(number) {
        SpecId::CONSTANTINOPLE
    } else if chain.is_byzantium(number) {
        SpecId::BYZANTIUM
    } else if chain.is_eip158(number) {
        SpecId::SPURIOUS_DRAGON
    } else if chain.is_eip150(number) {
        SpecId::TANGERINE
    } else if chain.is_homestead(number) {
        SpecId::HOMESTEAD
    } else {
        SpecId::FRONTIER
    }
}
