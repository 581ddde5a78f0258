use tracing::debug;

use crate::engine::Engine;
use crate::error::Result;
use crate::key::Key;
use crate::shape::{ArrayType, BatchArray};
use crate::types::Record;

use super::store::ObjectStore;
use super::transaction::StoreTxn;

/// A single operation within a write batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    /// Insert or replace. `key` is required for out-of-line stores without a
    /// key generator and must be absent for in-line stores.
    Put { key: Option<Key>, record: Record },
    /// Delete by primary key; missing keys are tolerated.
    Remove { key: Key },
}

impl BatchOp {
    pub fn put(record: Record) -> Self {
        BatchOp::Put { key: None, record }
    }

    pub fn put_with_key(key: impl Into<Key>, record: Record) -> Self {
        BatchOp::Put {
            key: Some(key.into()),
            record,
        }
    }

    pub fn remove(key: impl Into<Key>) -> Self {
        BatchOp::Remove { key: key.into() }
    }
}

/// Collects write operations and commits them atomically in one
/// transaction.
pub struct WriteBatch<'a, E: Engine> {
    store: &'a ObjectStore<E>,
    ops: Vec<BatchOp>,
}

impl<'a, E: Engine> WriteBatch<'a, E> {
    pub(crate) fn new(store: &'a ObjectStore<E>) -> Self {
        Self {
            store,
            ops: Vec::new(),
        }
    }

    /// Queue a put whose key comes from the record or the key generator.
    pub fn put(&mut self, record: Record) -> &mut Self {
        self.ops.push(BatchOp::put(record));
        self
    }

    /// Queue a put under an explicit key.
    pub fn put_with_key(&mut self, key: impl Into<Key>, record: Record) -> &mut Self {
        self.ops.push(BatchOp::put_with_key(key, record));
        self
    }

    /// Queue a delete.
    pub fn remove(&mut self, key: impl Into<Key>) -> &mut Self {
        self.ops.push(BatchOp::remove(key));
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Discard all queued operations.
    pub fn clear(&mut self) {
        self.ops.clear();
    }

    /// Apply every queued operation in order, all or nothing.
    pub async fn commit(self) -> Result<()> {
        self.store.batch(self.ops).await
    }
}

impl<E: Engine> StoreTxn<'_, E> {
    /// Apply `ops` in order. The first failure is reported with its
    /// position and poisons the transaction, so it can no longer commit.
    pub async fn apply(&mut self, ops: Vec<BatchOp>) -> Result<()> {
        for (position, op) in ops.into_iter().enumerate() {
            let outcome = match op {
                BatchOp::Put { key: None, record } => self.put(record).await.map(drop),
                BatchOp::Put {
                    key: Some(key),
                    record,
                } => self.put_with_key(key, record).await.map(drop),
                BatchOp::Remove { key } => self.remove(&key).await,
            };
            outcome.map_err(|e| e.at_position(position))?;
        }
        Ok(())
    }
}

impl<E: Engine> ObjectStore<E> {
    /// Start a [`WriteBatch`] against this store.
    pub fn write_batch(&self) -> WriteBatch<'_, E> {
        WriteBatch::new(self)
    }

    /// Apply a mixed list of puts and removes in one transaction.
    ///
    /// Fails with [`Error::BatchWriteFailed`](crate::Error::BatchWriteFailed)
    /// naming the first failing operation; nothing is written in that case.
    pub async fn batch(&self, ops: Vec<BatchOp>) -> Result<()> {
        if ops.is_empty() {
            return Ok(());
        }
        let len = ops.len();
        let mut txn = self.begin_write().await?;
        let result = txn.apply(ops).await;
        txn.finish(result).await?;
        debug!(store = %self.name(), ops = len, "committed batch");
        Ok(())
    }

    /// Insert or replace several records in one transaction, all or nothing.
    pub async fn put_batch(&self, records: Vec<Record>) -> Result<()> {
        self.batch(records.into_iter().map(BatchOp::put).collect())
            .await
    }

    /// Delete several records in one transaction. Missing keys are ignored.
    pub async fn remove_batch<K: Into<Key>>(&self, keys: Vec<K>) -> Result<()> {
        self.batch(keys.into_iter().map(BatchOp::remove).collect())
            .await
    }

    /// Look up several keys against one snapshot and shape the results.
    pub async fn get_batch<K: Into<Key>>(
        &self,
        keys: Vec<K>,
        array_type: ArrayType,
    ) -> Result<BatchArray> {
        let txn = self.begin_read().await?;
        let mut lookups = Vec::with_capacity(keys.len());
        for key in keys {
            match txn.get(&key.into()).await {
                Ok(record) => lookups.push(record),
                Err(e) => return txn.finish(Err(e)).await,
            }
        }
        txn.finish(Ok(BatchArray::shape(lookups, array_type))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MemoryEngine;
    use crate::error::Error;
    use crate::types::StoreSchema;
    use serde_json::json;

    fn store() -> ObjectStore {
        ObjectStore::open(MemoryEngine::new(), StoreSchema::new("items")).unwrap()
    }

    #[tokio::test]
    async fn test_write_batch_mixed_ops() {
        let store = store();
        store.put(json!({"id": "a", "val": 1})).await.unwrap();
        store.put(json!({"id": "b", "val": 2})).await.unwrap();

        let mut batch = store.write_batch();
        batch
            .remove("a")
            .put(json!({"id": "c", "val": 3}))
            .remove("missing");
        assert_eq!(batch.len(), 3);
        batch.commit().await.unwrap();

        assert!(store.get("a").await.unwrap().is_none());
        assert!(store.get("b").await.unwrap().is_some());
        assert_eq!(store.get("c").await.unwrap().unwrap()["val"], 3);
    }

    #[tokio::test]
    async fn test_failure_reports_position_and_rolls_back() {
        let store = store();
        let ops = vec![
            BatchOp::put(json!({"id": 1})),
            BatchOp::put_with_key(2, json!({"name": "no"})),
            BatchOp::put(json!({"id": 3})),
        ];
        let err = store.batch(ops).await.unwrap_err();
        assert!(matches!(err, Error::BatchWriteFailed { position: 1, .. }));
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_apply_cannot_commit() {
        let store = store();
        let mut txn = store.begin_write().await.unwrap();
        let err = txn
            .apply(vec![
                BatchOp::put(json!({"id": 1})),
                BatchOp::put(json!({"id": true})),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BatchWriteFailed { position: 1, .. }));
        assert!(txn.is_poisoned());
        assert!(matches!(
            txn.commit().await,
            Err(Error::Engine(crate::error::EngineError::Aborted))
        ));
        assert!(store.get(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let store = store();
        store.batch(Vec::new()).await.unwrap();
        assert!(store.write_batch().is_empty());
    }
}
