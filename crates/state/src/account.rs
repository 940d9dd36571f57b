use alloy_consensus::constants::KECCAK_EMPTY;
use alloy_primitives::{keccak256, Bytes, B256, U256};
use alloy_trie::TrieAccount;
use std::collections::BTreeMap;

/// A single account record as held by the state store.
///
/// Storage never holds zero values, a zero write removes the slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateAccount {
    pub nonce: u64,
    pub balance: U256,
    pub code: Bytes,
    pub code_hash: B256,
    pub storage: BTreeMap<B256, U256>,
}

impl Default for StateAccount {
    fn default() -> Self {
        Self {
            nonce: 0,
            balance: U256::ZERO,
            code: Bytes::new(),
            code_hash: KECCAK_EMPTY,
            storage: BTreeMap::new(),
        }
    }
}

impl StateAccount {
    /// Zero nonce, zero balance, no code and no storage.
    pub fn is_empty(&self) -> bool {
        self.nonce == 0
            && self.balance.is_zero()
            && self.code_hash == KECCAK_EMPTY
            && self.storage.is_empty()
    }

    pub fn set_code(&mut self, code: Bytes) {
        self.code_hash = if code.is_empty() {
            KECCAK_EMPTY
        } else {
            keccak256(&code)
        };
        self.code = code;
    }

    /// Secure-trie root over `keccak(slot) -> rlp(value)`.
    pub fn storage_root(&self) -> B256 {
        if self.storage.is_empty() {
            return alloy_trie::EMPTY_ROOT_HASH;
        }
        alloy_trie::root::storage_root_unsorted(
            self.storage
                .iter()
                .map(|(slot, value)| (keccak256(slot), *value)),
        )
    }

    pub fn trie_account(&self) -> TrieAccount {
        TrieAccount {
            nonce: self.nonce,
            balance: self.balance,
            storage_root: self.storage_root(),
            code_hash: self.code_hash,
        }
    }
}
