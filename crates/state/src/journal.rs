//! Change log backing snapshot and revert.

use crate::StateAccount;
use alloy_primitives::{Address, Bytes, B256, U256};
use std::collections::BTreeMap;

/// The prior value of one mutation, enough to undo it.
#[derive(Debug, Clone)]
pub(crate) enum JournalEntry {
    /// Account did not exist before
    Created { address: Address },
    /// Account was recreated over an existing one
    Reset {
        address: Address,
        prev: StateAccount,
        prev_destructed: bool,
    },
    Balance { address: Address, prev: U256 },
    Nonce { address: Address, prev: u64 },
    Code {
        address: Address,
        prev_code: Bytes,
        prev_hash: B256,
    },
    Storage {
        address: Address,
        slot: B256,
        prev: U256,
    },
    SelfDestruct {
        address: Address,
        prev_destructed: bool,
        prev_balance: U256,
    },
    Touch { address: Address },
    AddLog,
}

impl JournalEntry {
    pub(crate) const fn address(&self) -> Option<Address> {
        match self {
            Self::Created { address }
            | Self::Reset { address, .. }
            | Self::Balance { address, .. }
            | Self::Nonce { address, .. }
            | Self::Code { address, .. }
            | Self::Storage { address, .. }
            | Self::SelfDestruct { address, .. }
            | Self::Touch { address } => Some(*address),
            Self::AddLog => None,
        }
    }
}

/// Ordered change log plus a per-address count of live entries.
///
/// An address is dirty while it has at least one entry, finalisation only
/// looks at dirty addresses.
#[derive(Debug, Default)]
pub(crate) struct Journal {
    entries: Vec<JournalEntry>,
    dirties: BTreeMap<Address, usize>,
}

impl Journal {
    pub(crate) fn append(&mut self, entry: JournalEntry) {
        if let Some(address) = entry.address() {
            *self.dirties.entry(address).or_default() += 1;
        }
        self.entries.push(entry);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Pop the newest entry, releasing its dirty mark.
    pub(crate) fn pop(&mut self) -> Option<JournalEntry> {
        let entry = self.entries.pop()?;
        if let Some(address) = entry.address() {
            if let Some(count) = self.dirties.get_mut(&address) {
                *count -= 1;
                if *count == 0 {
                    self.dirties.remove(&address);
                }
            }
        }
        Some(entry)
    }

    pub(crate) fn dirty_addresses(&self) -> impl Iterator<Item = &Address> {
        self.dirties.keys()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.dirties.clear();
    }
}
