use crate::backend::Accounts;
use crate::journal::{Journal, JournalEntry};
use crate::{StateAccount, StateBackend, StateError};
use alloy_genesis::GenesisAccount;
use alloy_primitives::{keccak256, Address, Bytes, Log, B256, U256};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use stf_types::GenesisAlloc;
use tracing::{debug, trace};

/// Revision identifier handed out by [`StateDb::snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotId(u64);

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct Revision {
    id: SnapshotId,
    journal_len: usize,
}

/// A log together with the transaction context it was emitted under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLog {
    pub log: Log,
    pub tx_hash: B256,
    pub block_hash: B256,
    pub tx_index: u64,
    /// Position among every log of the block
    pub index: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct TxContext {
    tx_hash: B256,
    block_hash: B256,
    tx_index: u64,
}

/// Mutable account store with journaled snapshots.
///
/// Every mutation records its prior value in a change log, so reverting costs
/// as much as the mutations made since the snapshot. Reads see all mutations
/// immediately. Nothing reaches the backend until [`StateDb::commit`].
#[derive(Debug)]
pub struct StateDb {
    backend: Arc<dyn StateBackend>,
    /// Root the store was opened at, or last committed to
    root: B256,
    accounts: Accounts,
    destructed: BTreeSet<Address>,
    logs: Vec<StateLog>,
    tx: TxContext,
    journal: Journal,
    revisions: Vec<Revision>,
    next_revision: u64,
}

impl StateDb {
    /// An empty store over `backend`.
    pub fn new(backend: Arc<dyn StateBackend>) -> Self {
        Self {
            backend,
            root: alloy_trie::EMPTY_ROOT_HASH,
            accounts: Accounts::new(),
            destructed: BTreeSet::new(),
            logs: Vec::new(),
            tx: TxContext::default(),
            journal: Journal::default(),
            revisions: Vec::new(),
            next_revision: 0,
        }
    }

    /// Open the account set committed under `root`.
    pub fn open(root: B256, backend: Arc<dyn StateBackend>) -> Result<Self, StateError> {
        let accounts = match backend.load(root).map_err(StateError::Backend)? {
            Some(accounts) => accounts,
            None if root == alloy_trie::EMPTY_ROOT_HASH => Accounts::new(),
            None => return Err(StateError::UnknownRoot(root)),
        };
        debug!(%root, accounts = accounts.len(), "Opened state");
        Ok(Self {
            root,
            accounts,
            ..Self::new(backend)
        })
    }

    /// Materialise an allocation: write every entry, commit once, reopen at the root.
    pub fn from_alloc(
        alloc: &GenesisAlloc,
        backend: Arc<dyn StateBackend>,
    ) -> Result<Self, StateError> {
        let mut state = Self::new(Arc::clone(&backend));
        for (address, account) in alloc {
            state.set_balance(*address, account.balance);
            state.set_nonce(*address, account.nonce.unwrap_or_default());
            state.set_code(*address, account.code.clone().unwrap_or_default());
            for (slot, value) in account.storage.iter().flatten() {
                state.set_state(*address, *slot, U256::from_be_bytes(value.0));
            }
        }
        let root = state.commit(false)?;
        Self::open(root, backend)
    }

    pub const fn root(&self) -> B256 {
        self.root
    }

    pub fn backend(&self) -> &Arc<dyn StateBackend> {
        &self.backend
    }

    // --- snapshots ---

    pub fn snapshot(&mut self) -> SnapshotId {
        let id = SnapshotId(self.next_revision);
        self.next_revision += 1;
        self.revisions.push(Revision {
            id,
            journal_len: self.journal.len(),
        });
        trace!(%id, journal_len = self.journal.len(), "Snapshot taken");
        id
    }

    /// Undo every mutation made since `id` was issued, including those under
    /// snapshots issued after it. `id` and every later snapshot become invalid.
    pub fn revert_to_snapshot(&mut self, id: SnapshotId) -> Result<(), StateError> {
        let position = self
            .revisions
            .binary_search_by_key(&id, |revision| revision.id)
            .map_err(|_| StateError::UnknownSnapshot(id))?;
        let target = self.revisions[position].journal_len;

        let reverted = self.journal.len() - target;
        while self.journal.len() > target {
            if let Some(entry) = self.journal.pop() {
                self.undo(entry);
            }
        }
        self.revisions.truncate(position);
        trace!(%id, reverted, "Reverted to snapshot");
        Ok(())
    }

    fn undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::Created { address } => {
                self.accounts.remove(&address);
                self.destructed.remove(&address);
            }
            JournalEntry::Reset {
                address,
                prev,
                prev_destructed,
            } => {
                self.accounts.insert(address, prev);
                self.set_destructed_flag(address, prev_destructed);
            }
            JournalEntry::Balance { address, prev } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    account.balance = prev;
                }
            }
            JournalEntry::Nonce { address, prev } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    account.nonce = prev;
                }
            }
            JournalEntry::Code {
                address,
                prev_code,
                prev_hash,
            } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    account.code = prev_code;
                    account.code_hash = prev_hash;
                }
            }
            JournalEntry::Storage {
                address,
                slot,
                prev,
            } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    write_slot(account, slot, prev);
                }
            }
            JournalEntry::SelfDestruct {
                address,
                prev_destructed,
                prev_balance,
            } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    account.balance = prev_balance;
                }
                self.set_destructed_flag(address, prev_destructed);
            }
            JournalEntry::Touch { .. } => {}
            JournalEntry::AddLog => {
                self.logs.pop();
            }
        }
    }

    fn set_destructed_flag(&mut self, address: Address, destructed: bool) {
        if destructed {
            self.destructed.insert(address);
        } else {
            self.destructed.remove(&address);
        }
    }

    // --- reads ---

    pub fn account(&self, address: &Address) -> Option<&StateAccount> {
        self.accounts.get(address)
    }

    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &StateAccount)> {
        self.accounts.iter()
    }

    pub fn exist(&self, address: &Address) -> bool {
        self.accounts.contains_key(address)
    }

    /// True for a missing account or one with zero nonce, zero balance, no code and no storage.
    pub fn empty(&self, address: &Address) -> bool {
        self.accounts
            .get(address)
            .is_none_or(StateAccount::is_empty)
    }

    pub fn get_balance(&self, address: &Address) -> U256 {
        self.accounts
            .get(address)
            .map(|account| account.balance)
            .unwrap_or_default()
    }

    pub fn get_nonce(&self, address: &Address) -> u64 {
        self.accounts
            .get(address)
            .map(|account| account.nonce)
            .unwrap_or_default()
    }

    pub fn get_code(&self, address: &Address) -> Bytes {
        self.accounts
            .get(address)
            .map(|account| account.code.clone())
            .unwrap_or_default()
    }

    /// Code hash of an existing account, the zero hash for a missing one.
    pub fn get_code_hash(&self, address: &Address) -> B256 {
        self.accounts
            .get(address)
            .map(|account| account.code_hash)
            .unwrap_or_default()
    }

    pub fn get_state(&self, address: &Address, slot: &B256) -> U256 {
        self.accounts
            .get(address)
            .and_then(|account| account.storage.get(slot).copied())
            .unwrap_or_default()
    }

    pub fn has_self_destructed(&self, address: &Address) -> bool {
        self.destructed.contains(address)
    }

    // --- writes ---

    fn get_or_create(&mut self, address: Address) -> &mut StateAccount {
        if !self.accounts.contains_key(&address) {
            self.journal.append(JournalEntry::Created { address });
        }
        self.accounts.entry(address).or_default()
    }

    /// Replace any existing account at `address` with a fresh one, keeping its balance.
    pub fn create_account(&mut self, address: Address) {
        let balance = self.get_balance(&address);
        let fresh = StateAccount {
            balance,
            ..Default::default()
        };
        match self.accounts.insert(address, fresh) {
            Some(prev) => {
                let prev_destructed = self.destructed.remove(&address);
                self.journal.append(JournalEntry::Reset {
                    address,
                    prev,
                    prev_destructed,
                });
            }
            None => self.journal.append(JournalEntry::Created { address }),
        }
    }

    pub fn set_balance(&mut self, address: Address, balance: U256) {
        let account = self.get_or_create(address);
        let prev = std::mem::replace(&mut account.balance, balance);
        self.journal.append(JournalEntry::Balance { address, prev });
    }

    /// Credit `amount`. A zero amount still touches the account.
    pub fn add_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError> {
        if amount.is_zero() {
            self.touch(address);
            return Ok(());
        }
        let balance = self
            .get_balance(&address)
            .checked_add(amount)
            .ok_or(StateError::BalanceOverflow { address })?;
        self.set_balance(address, balance);
        Ok(())
    }

    /// Debit `amount`, failing without any change when the balance is too low.
    pub fn sub_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError> {
        if amount.is_zero() {
            return Ok(());
        }
        let balance = self.get_balance(&address);
        let remaining = balance
            .checked_sub(amount)
            .ok_or(StateError::InsufficientBalance {
                address,
                balance,
                amount,
            })?;
        self.set_balance(address, remaining);
        Ok(())
    }

    pub fn set_nonce(&mut self, address: Address, nonce: u64) {
        let account = self.get_or_create(address);
        let prev = std::mem::replace(&mut account.nonce, nonce);
        self.journal.append(JournalEntry::Nonce { address, prev });
    }

    pub fn set_code(&mut self, address: Address, code: Bytes) {
        let account = self.get_or_create(address);
        let prev_code = account.code.clone();
        let prev_hash = account.code_hash;
        account.set_code(code);
        self.journal.append(JournalEntry::Code {
            address,
            prev_code,
            prev_hash,
        });
    }

    /// Write a storage slot. Writing zero clears it.
    pub fn set_state(&mut self, address: Address, slot: B256, value: U256) {
        let account = self.get_or_create(address);
        let prev = write_slot(account, slot, value);
        self.journal.append(JournalEntry::Storage {
            address,
            slot,
            prev,
        });
    }

    /// Mark the account as accessed, creating it if missing, so finalisation considers it.
    pub fn touch(&mut self, address: Address) {
        self.get_or_create(address);
        self.journal.append(JournalEntry::Touch { address });
    }

    /// Flag the account for removal at the next finalisation and zero its balance.
    /// Returns false when the account does not exist.
    pub fn self_destruct(&mut self, address: Address) -> bool {
        let Some(account) = self.accounts.get_mut(&address) else {
            return false;
        };
        let prev_balance = std::mem::take(&mut account.balance);
        let prev_destructed = !self.destructed.insert(address);
        self.journal.append(JournalEntry::SelfDestruct {
            address,
            prev_destructed,
            prev_balance,
        });
        true
    }

    // --- logs ---

    /// Set the transaction context subsequent logs are tagged with.
    pub fn prepare(&mut self, tx_hash: B256, block_hash: B256, tx_index: u64) {
        self.tx = TxContext {
            tx_hash,
            block_hash,
            tx_index,
        };
    }

    pub fn add_log(&mut self, log: Log) {
        let index = self.logs.len() as u64;
        self.logs.push(StateLog {
            log,
            tx_hash: self.tx.tx_hash,
            block_hash: self.tx.block_hash,
            tx_index: self.tx.tx_index,
            index,
        });
        self.journal.append(JournalEntry::AddLog);
    }

    /// Logs emitted under `tx_hash`, in emission order.
    pub fn logs_of(&self, tx_hash: &B256) -> Vec<Log> {
        self.logs
            .iter()
            .filter(|entry| &entry.tx_hash == tx_hash)
            .map(|entry| entry.log.clone())
            .collect()
    }

    pub fn logs(&self) -> &[StateLog] {
        &self.logs
    }

    // --- finalisation ---

    /// Settle pending mutations: drop self-destructed accounts and, when asked,
    /// empty ones. Only accounts changed since the previous finalisation are
    /// considered. All outstanding snapshots become invalid.
    pub fn finalise(&mut self, delete_empty: bool) {
        let removed: Vec<Address> = self
            .journal
            .dirty_addresses()
            .filter(|address| {
                self.destructed.contains(*address)
                    || (delete_empty
                        && self
                            .accounts
                            .get(*address)
                            .is_some_and(StateAccount::is_empty))
            })
            .copied()
            .collect();

        for address in &removed {
            self.accounts.remove(address);
            self.destructed.remove(address);
        }
        if !removed.is_empty() {
            trace!(removed = removed.len(), delete_empty, "Finalised state");
        }
        self.journal.clear();
        self.revisions.clear();
    }

    /// Finalise and compute the root of the current accounts without persisting.
    pub fn intermediate_root(&mut self, delete_empty: bool) -> B256 {
        self.finalise(delete_empty);
        crate::state_root(&self.accounts)
    }

    /// Finalise, persist to the backend and return the new root.
    pub fn commit(&mut self, delete_empty: bool) -> Result<B256, StateError> {
        let root = self.intermediate_root(delete_empty);
        self.backend
            .store(root, &self.accounts)
            .map_err(StateError::Backend)?;
        self.root = root;
        debug!(%root, accounts = self.accounts.len(), "Committed state");
        Ok(root)
    }

    /// Current accounts in allocation form.
    pub fn dump(&self) -> GenesisAlloc {
        self.accounts
            .iter()
            .map(|(address, account)| {
                let storage = (!account.storage.is_empty()).then(|| {
                    account
                        .storage
                        .iter()
                        .map(|(slot, value)| (*slot, B256::from(*value)))
                        .collect()
                });
                let dumped = GenesisAccount {
                    nonce: (account.nonce != 0).then_some(account.nonce),
                    balance: account.balance,
                    code: (!account.code.is_empty()).then(|| account.code.clone()),
                    storage,
                    ..Default::default()
                };
                (*address, dumped)
            })
            .collect()
    }
}

/// Write `value` into `slot`, returning the previous value.
fn write_slot(account: &mut StateAccount, slot: B256, value: U256) -> U256 {
    let prev = if value.is_zero() {
        account.storage.remove(&slot)
    } else {
        account.storage.insert(slot, value)
    };
    prev.unwrap_or_default()
}

/// Hash of the account set, matching the state root of a secure Merkle-Patricia trie.
pub fn state_root(accounts: &Accounts) -> B256 {
    if accounts.is_empty() {
        return alloy_trie::EMPTY_ROOT_HASH;
    }
    alloy_trie::root::state_root_unsorted(
        accounts
            .iter()
            .map(|(address, account)| (keccak256(address), account.trie_account())),
    )
}
