//! Persistence of committed account sets, keyed by state root.

use crate::{BackendError, StateAccount};
use alloy_primitives::{Address, B256};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::sync::{Arc, RwLock};

pub type Accounts = BTreeMap<Address, StateAccount>;

/// Storage the account store commits to and reopens from.
pub trait StateBackend: Send + Sync + Debug {
    /// Accounts committed under `root`, `None` if the root was never stored.
    fn load(&self, root: B256) -> Result<Option<Accounts>, BackendError>;

    fn store(&self, root: B256, accounts: &Accounts) -> Result<(), BackendError>;
}

/// Keeps every committed account set in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    roots: RwLock<HashMap<B256, Arc<Accounts>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<dyn StateBackend> {
        Arc::new(Self::new())
    }

    /// Number of distinct roots stored so far.
    pub fn len(&self) -> usize {
        self.roots.read().map(|roots| roots.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StateBackend for MemoryBackend {
    fn load(&self, root: B256) -> Result<Option<Accounts>, BackendError> {
        let roots = self
            .roots
            .read()
            .map_err(|_| "memory backend lock poisoned")?;
        Ok(roots.get(&root).map(|accounts| accounts.as_ref().clone()))
    }

    fn store(&self, root: B256, accounts: &Accounts) -> Result<(), BackendError> {
        let mut roots = self
            .roots
            .write()
            .map_err(|_| "memory backend lock poisoned")?;
        roots
            .entry(root)
            .or_insert_with(|| Arc::new(accounts.clone()));
        Ok(())
    }
}
