//! The storage engine contract.
//!
//! Every store operation is expressed in terms of these primitives: begin a
//! transaction, point get/put/delete on a keyspace, ascending range scan,
//! and commit/abort. Keyspaces are named maps ordered by their byte keys.
//!
//! Engines serialize overlapping read-write transactions themselves; callers
//! add no locking on top.

pub mod memory;

use std::ops::Bound;

use async_trait::async_trait;

use crate::error::EngineError;

pub use memory::{MemoryEngine, MemoryTxn};

/// Result type for engine primitives.
pub type EngineResult<T> = Result<T, EngineError>;

/// One `(key, value)` pair returned by a scan.
pub type Entry = (Vec<u8>, Vec<u8>);

/// Transaction access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnMode {
    ReadOnly,
    ReadWrite,
}

/// A transactional, ordered key-value engine.
#[async_trait]
pub trait Engine: Send + Sync + 'static {
    type Txn: EngineTxn;

    /// Start a transaction. Read-write transactions may wait for earlier
    /// writers to finish.
    async fn begin(&self, mode: TxnMode) -> EngineResult<Self::Txn>;
}

/// An open engine transaction.
///
/// Writes become visible to other transactions only after [`commit`]
/// succeeds. Dropping a transaction without committing discards its writes.
///
/// [`commit`]: EngineTxn::commit
#[async_trait]
pub trait EngineTxn: Send + Sync {
    fn mode(&self) -> TxnMode;

    async fn get(&self, space: &str, key: &[u8]) -> EngineResult<Option<Vec<u8>>>;

    /// Insert or replace.
    async fn put(&mut self, space: &str, key: Vec<u8>, value: Vec<u8>) -> EngineResult<()>;

    /// Delete a key. Deleting a missing key is not an error.
    async fn delete(&mut self, space: &str, key: &[u8]) -> EngineResult<()>;

    /// Remove every entry of a keyspace.
    async fn clear(&mut self, space: &str) -> EngineResult<()>;

    /// Entries with `lower <= key <= upper` (per bound kind), ascending.
    async fn scan(
        &self,
        space: &str,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
    ) -> EngineResult<Vec<Entry>>;

    async fn commit(self) -> EngineResult<()>;

    async fn abort(self);
}

/// Whether a pair of byte bounds can match nothing at all.
pub fn is_empty_range(lower: Bound<&[u8]>, upper: Bound<&[u8]>) -> bool {
    match (lower, upper) {
        (Bound::Included(l), Bound::Included(u)) => l > u,
        (Bound::Included(l) | Bound::Excluded(l), Bound::Included(u) | Bound::Excluded(u)) => {
            l >= u
        }
        _ => false,
    }
}
