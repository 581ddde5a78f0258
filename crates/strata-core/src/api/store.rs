use std::sync::Arc;

use tracing::debug;

use crate::engine::{Engine, MemoryEngine, TxnMode};
use crate::error::{Result, SchemaError};
use crate::index::IndexRegistry;
use crate::key::Key;
use crate::key_path::KeyPath;
use crate::types::{Record, StoreSchema};

use super::builders::StoreBuilder;
use super::query::Query;
use super::transaction::StoreTxn;

/// Fixed per-store state shared by every handle and transaction.
pub(crate) struct StoreInner {
    pub(crate) schema: StoreSchema,
    pub(crate) indexes: IndexRegistry,
    pub(crate) records_space: String,
    pub(crate) meta_space: String,
}

/// A handle to one store: a keyed collection of records with secondary
/// indexes, living in an [`Engine`].
///
/// `ObjectStore` is cheaply clonable (`Arc`-based). Every single-record
/// operation runs in its own engine transaction; use
/// [`begin_write`](Self::begin_write) to group several.
pub struct ObjectStore<E: Engine = MemoryEngine> {
    engine: Arc<E>,
    inner: Arc<StoreInner>,
}

impl<E: Engine> Clone for ObjectStore<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl ObjectStore<MemoryEngine> {
    /// Start building a store schema with the default key path (`"id"`) and
    /// auto-increment on.
    pub fn builder(name: impl Into<String>) -> StoreBuilder {
        StoreBuilder::new(name)
    }
}

impl<E: Engine> ObjectStore<E> {
    /// Open a store over `engine`, validating its schema.
    pub fn open(engine: E, schema: StoreSchema) -> Result<Self> {
        if schema.name.is_empty() {
            return Err(SchemaError::EmptyStoreName.into());
        }
        if let Some(path) = &schema.key_path {
            path.validate()?;
            if schema.auto_increment {
                if path.is_compound() {
                    return Err(SchemaError::AutoIncrementCompound.into());
                }
                if matches!(path, KeyPath::Single(p) if p.is_empty()) {
                    return Err(SchemaError::InvalidKeyPath(String::new()).into());
                }
            }
        }
        let indexes = IndexRegistry::define(schema.indexes.clone())?;

        debug!(
            store = %schema.name,
            key_path = ?schema.key_path,
            auto_increment = schema.auto_increment,
            indexes = indexes.len(),
            "opened store"
        );

        Ok(Self {
            engine: Arc::new(engine),
            inner: Arc::new(StoreInner {
                records_space: schema.records_space(),
                meta_space: schema.meta_space(),
                schema,
                indexes,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.schema.name
    }

    pub fn schema(&self) -> &StoreSchema {
        &self.inner.schema
    }

    pub fn indexes(&self) -> &IndexRegistry {
        &self.inner.indexes
    }

    /// Names of the store's indexes, sorted.
    pub fn index_names(&self) -> Vec<String> {
        self.inner.indexes.names()
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.inner.indexes.has_index(name)
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Begin a read-only transaction over a consistent snapshot.
    pub async fn begin_read(&self) -> Result<StoreTxn<'_, E>> {
        let txn = self.engine.begin(TxnMode::ReadOnly).await?;
        Ok(StoreTxn::new(&self.inner, txn))
    }

    /// Begin a read-write transaction. Its writes become visible on commit.
    pub async fn begin_write(&self) -> Result<StoreTxn<'_, E>> {
        let txn = self.engine.begin(TxnMode::ReadWrite).await?;
        Ok(StoreTxn::new(&self.inner, txn))
    }

    // -----------------------------------------------------------------------
    // CRUD
    // -----------------------------------------------------------------------

    /// Insert or replace a record; the key comes from the key path or the
    /// key generator. Returns the key.
    pub async fn put(&self, record: Record) -> Result<Key> {
        let mut txn = self.begin_write().await?;
        let result = txn.put(record).await;
        txn.finish(result).await
    }

    /// Insert or replace a record under an explicit (out-of-line) key.
    pub async fn put_with_key(&self, key: impl Into<Key>, record: Record) -> Result<Key> {
        let mut txn = self.begin_write().await?;
        let result = txn.put_with_key(key.into(), record).await;
        txn.finish(result).await
    }

    pub async fn get(&self, key: impl Into<Key>) -> Result<Option<Record>> {
        let txn = self.begin_read().await?;
        let result = txn.get(&key.into()).await;
        txn.finish(result).await
    }

    /// Delete a record. Deleting a missing key succeeds.
    pub async fn remove(&self, key: impl Into<Key>) -> Result<()> {
        let mut txn = self.begin_write().await?;
        let result = txn.remove(&key.into()).await;
        txn.finish(result).await
    }

    /// Every record, in ascending key order.
    pub async fn get_all(&self) -> Result<Vec<Record>> {
        let txn = self.begin_read().await?;
        let result = txn.get_all().await;
        txn.finish(result).await
    }

    /// Remove all records and index entries.
    pub async fn clear(&self) -> Result<()> {
        let mut txn = self.begin_write().await?;
        let result = txn.clear().await;
        txn.finish(result).await
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub async fn query(&self, query: &Query) -> Result<Vec<Record>> {
        let txn = self.begin_read().await?;
        let result = txn.query(query).await;
        txn.finish(result).await
    }

    pub async fn query_keys(&self, query: &Query) -> Result<Vec<Key>> {
        let txn = self.begin_read().await?;
        let result = txn.query_keys(query).await;
        txn.finish(result).await
    }

    /// Number of entries `query` would return.
    pub async fn count(&self, query: &Query) -> Result<usize> {
        let txn = self.begin_read().await?;
        let result = txn.count(query).await;
        txn.finish(result).await
    }
}

impl<E: Engine> std::fmt::Debug for ObjectStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStore")
            .field("schema", &self.inner.schema)
            .finish_non_exhaustive()
    }
}
