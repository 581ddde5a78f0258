//! In-process engine backed by ordered maps.
//!
//! Committed state is an immutable snapshot behind an `Arc`. Readers clone
//! the `Arc` and never block. Read-write transactions hold an owned writer
//! lock from `begin` until they finish, buffer their writes in a per-keyspace
//! overlay, and publish a new snapshot on commit.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

use super::{Engine, EngineResult, EngineTxn, Entry, TxnMode, is_empty_range};
use crate::error::EngineError;

type Space = BTreeMap<Vec<u8>, Vec<u8>>;
type Spaces = BTreeMap<String, Space>;

#[derive(Default)]
struct Shared {
    committed: RwLock<Arc<Spaces>>,
    writer_lock: Arc<Mutex<()>>,
    next_txn_id: AtomicU64,
}

/// An in-memory [`Engine`]. Cloning yields another handle to the same data.
#[derive(Clone, Default)]
pub struct MemoryEngine {
    shared: Arc<Shared>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed entries in a keyspace.
    pub fn keyspace_len(&self, space: &str) -> usize {
        self.shared
            .committed
            .read()
            .get(space)
            .map_or(0, BTreeMap::len)
    }

    /// Names of keyspaces holding at least one committed entry.
    pub fn keyspaces(&self) -> Vec<String> {
        self.shared
            .committed
            .read()
            .iter()
            .filter(|(_, space)| !space.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl std::fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("keyspaces", &self.keyspaces())
            .finish()
    }
}

#[async_trait]
impl Engine for MemoryEngine {
    type Txn = MemoryTxn;

    async fn begin(&self, mode: TxnMode) -> EngineResult<MemoryTxn> {
        let writer = match mode {
            TxnMode::ReadWrite => Some(self.shared.writer_lock.clone().lock_owned().await),
            TxnMode::ReadOnly => None,
        };
        // Taken after the writer lock so a writer sees every earlier commit.
        let base = self.shared.committed.read().clone();
        let id = self.shared.next_txn_id.fetch_add(1, Ordering::Relaxed) + 1;
        trace!(txn = id, ?mode, "begin");
        Ok(MemoryTxn {
            id,
            mode,
            base,
            overlay: BTreeMap::new(),
            shared: Arc::clone(&self.shared),
            _writer: writer,
        })
    }
}

/// Pending writes to one keyspace.
#[derive(Default)]
struct Overlay {
    cleared: bool,
    /// `None` marks a deletion.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

/// A transaction on a [`MemoryEngine`].
pub struct MemoryTxn {
    id: u64,
    mode: TxnMode,
    base: Arc<Spaces>,
    overlay: BTreeMap<String, Overlay>,
    shared: Arc<Shared>,
    _writer: Option<OwnedMutexGuard<()>>,
}

impl MemoryTxn {
    fn check_writable(&self) -> EngineResult<()> {
        match self.mode {
            TxnMode::ReadWrite => Ok(()),
            TxnMode::ReadOnly => Err(EngineError::ReadOnly),
        }
    }

    fn overlay_mut(&mut self, space: &str) -> &mut Overlay {
        self.overlay.entry(space.to_string()).or_default()
    }
}

#[async_trait]
impl EngineTxn for MemoryTxn {
    fn mode(&self) -> TxnMode {
        self.mode
    }

    async fn get(&self, space: &str, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        if let Some(overlay) = self.overlay.get(space) {
            if let Some(write) = overlay.writes.get(key) {
                return Ok(write.clone());
            }
            if overlay.cleared {
                return Ok(None);
            }
        }
        Ok(self.base.get(space).and_then(|s| s.get(key)).cloned())
    }

    async fn put(&mut self, space: &str, key: Vec<u8>, value: Vec<u8>) -> EngineResult<()> {
        self.check_writable()?;
        self.overlay_mut(space).writes.insert(key, Some(value));
        Ok(())
    }

    async fn delete(&mut self, space: &str, key: &[u8]) -> EngineResult<()> {
        self.check_writable()?;
        self.overlay_mut(space).writes.insert(key.to_vec(), None);
        Ok(())
    }

    async fn clear(&mut self, space: &str) -> EngineResult<()> {
        self.check_writable()?;
        let overlay = self.overlay_mut(space);
        overlay.cleared = true;
        overlay.writes.clear();
        Ok(())
    }

    async fn scan(
        &self,
        space: &str,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
    ) -> EngineResult<Vec<Entry>> {
        if is_empty_range(lower, upper) {
            return Ok(Vec::new());
        }
        let overlay = self.overlay.get(space);
        let mut merged = Space::new();
        if !overlay.is_some_and(|o| o.cleared)
            && let Some(base) = self.base.get(space)
        {
            for (k, v) in base.range::<[u8], _>((lower, upper)) {
                merged.insert(k.clone(), v.clone());
            }
        }
        if let Some(overlay) = overlay {
            for (k, write) in overlay.writes.range::<[u8], _>((lower, upper)) {
                match write {
                    Some(v) => {
                        merged.insert(k.clone(), v.clone());
                    }
                    None => {
                        merged.remove(k);
                    }
                }
            }
        }
        Ok(merged.into_iter().collect())
    }

    async fn commit(self) -> EngineResult<()> {
        if self.mode == TxnMode::ReadOnly || self.overlay.is_empty() {
            trace!(txn = self.id, "commit (no writes)");
            return Ok(());
        }
        let mut next = (*self.base).clone();
        for (name, overlay) in self.overlay {
            let space = next.entry(name).or_default();
            if overlay.cleared {
                space.clear();
            }
            for (k, write) in overlay.writes {
                match write {
                    Some(v) => {
                        space.insert(k, v);
                    }
                    None => {
                        space.remove(&k);
                    }
                }
            }
        }
        *self.shared.committed.write() = Arc::new(next);
        trace!(txn = self.id, "commit");
        Ok(())
    }

    async fn abort(self) {
        trace!(txn = self.id, "abort");
    }
}
