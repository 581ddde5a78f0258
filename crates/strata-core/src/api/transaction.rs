use std::ops::Bound;

use tracing::{debug, warn};

use crate::encoding::{decode_exact, encode_key, prefix_successor};
use crate::engine::{Engine, EngineTxn, TxnMode};
use crate::error::{EncodingError, EngineError, Error, Result, SchemaError};
use crate::key::Key;
use crate::types::{GENERATOR_KEY, IndexDefinition, Record};

use super::store::StoreInner;

pub(crate) fn encode_record(record: &Record) -> Result<Vec<u8>> {
    rmp_serde::to_vec(record).map_err(|e| EncodingError::Record(e.to_string()).into())
}

pub(crate) fn decode_record(bytes: &[u8]) -> Result<Record> {
    rmp_serde::from_slice(bytes).map_err(|e| EncodingError::Record(e.to_string()).into())
}

/// Store operations bound to one engine transaction.
///
/// Obtained from [`ObjectStore::begin_read`] or [`ObjectStore::begin_write`].
/// Nothing is visible to other transactions until [`commit`](Self::commit).
/// Dropping the transaction discards its writes.
///
/// A failed `put`, `put_with_key`, `remove` or `clear` poisons the
/// transaction: later commits abort with [`EngineError::Aborted`], so a
/// half-applied write is never published.
///
/// [`ObjectStore::begin_read`]: super::ObjectStore::begin_read
/// [`ObjectStore::begin_write`]: super::ObjectStore::begin_write
pub struct StoreTxn<'a, E: Engine> {
    pub(crate) store: &'a StoreInner,
    pub(crate) txn: E::Txn,
    poisoned: bool,
}

impl<'a, E: Engine> StoreTxn<'a, E> {
    pub(crate) fn new(store: &'a StoreInner, txn: E::Txn) -> Self {
        Self {
            store,
            txn,
            poisoned: false,
        }
    }

    /// Fetch a record by primary key.
    pub async fn get(&self, key: &Key) -> Result<Option<Record>> {
        let pk = encode_key(key)?;
        self.read_record(&pk).await
    }

    /// Insert or replace a record whose key comes from the store's key path
    /// or key generator. Returns the key it was stored under.
    pub async fn put(&mut self, record: Record) -> Result<Key> {
        let result = self.write(None, record).await;
        self.poison_on_err(result)
    }

    /// Insert or replace a record under an explicit key. Only valid for
    /// stores with out-of-line keys.
    pub async fn put_with_key(&mut self, key: Key, record: Record) -> Result<Key> {
        let store = self.store;
        let result = match &store.schema.key_path {
            Some(path) => Err(SchemaError::InlineKeyConflict(path.to_string()).into()),
            None => self.write(Some(key), record).await,
        };
        self.poison_on_err(result)
    }

    /// Delete a record and its index entries. Missing keys are a no-op.
    pub async fn remove(&mut self, key: &Key) -> Result<()> {
        let result = self.delete(key).await;
        self.poison_on_err(result)
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        let pk = encode_key(key)?;
        let Some(old) = self.read_record(&pk).await? else {
            return Ok(());
        };
        self.unindex(&pk, &old).await?;
        self.txn.delete(&self.store.records_space, &pk).await?;
        Ok(())
    }

    /// All records in ascending key order.
    pub async fn get_all(&self) -> Result<Vec<Record>> {
        self.txn
            .scan(&self.store.records_space, Bound::Unbounded, Bound::Unbounded)
            .await?
            .iter()
            .map(|(_, bytes)| decode_record(bytes))
            .collect()
    }

    /// Remove every record and index entry. The key generator keeps its value.
    pub async fn clear(&mut self) -> Result<()> {
        let result = self.clear_spaces().await;
        self.poison_on_err(result)
    }

    async fn clear_spaces(&mut self) -> Result<()> {
        let store = self.store;
        self.txn.clear(&store.records_space).await?;
        for def in store.indexes.iter() {
            self.txn.clear(&store.schema.index_space(&def.name)).await?;
        }
        Ok(())
    }

    /// Publish every write. Fails with [`EngineError::Aborted`] and discards
    /// the writes if an earlier write in this transaction failed.
    pub async fn commit(self) -> Result<()> {
        if self.poisoned {
            self.txn.abort().await;
            return Err(EngineError::Aborted.into());
        }
        self.txn.commit().await?;
        Ok(())
    }

    /// Whether a failed write has doomed this transaction.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub async fn abort(self) {
        self.txn.abort().await;
    }

    /// Commit on `Ok`, abort on `Err`, and hand the result back.
    pub async fn finish<T>(self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(e) => {
                let store = &self.store.schema.name;
                match self.txn.mode() {
                    TxnMode::ReadOnly => debug!(store = %store, error = %e, "read failed"),
                    TxnMode::ReadWrite => {
                        warn!(store = %store, error = %e, "transaction rolled back")
                    }
                }
                self.abort().await;
                Err(e)
            }
        }
    }

    pub(crate) async fn read_record(&self, pk: &[u8]) -> Result<Option<Record>> {
        match self.txn.get(&self.store.records_space, pk).await? {
            Some(bytes) => Ok(Some(decode_record(&bytes)?)),
            None => Ok(None),
        }
    }

    fn poison_on_err<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.poisoned = true;
        }
        result
    }

    async fn write(&mut self, explicit: Option<Key>, mut record: Record) -> Result<Key> {
        let key = self.assign_key(explicit, &mut record).await?;
        let pk = encode_key(&key)?;
        // Constraints are checked before anything is touched.
        self.check_constraints(&pk, &record).await?;
        if let Some(old) = self.read_record(&pk).await? {
            self.unindex(&pk, &old).await?;
        }
        self.index(&pk, &record).await?;
        let bytes = encode_record(&record)?;
        self.txn.put(&self.store.records_space, pk, bytes).await?;
        Ok(key)
    }

    // -----------------------------------------------------------------------
    // Keys
    // -----------------------------------------------------------------------

    async fn assign_key(&mut self, explicit: Option<Key>, record: &mut Record) -> Result<Key> {
        let store = self.store;
        let schema = &store.schema;
        let key = match (&schema.key_path, explicit) {
            (Some(path), _) => match path.resolve(record) {
                Some(key) => Some(key),
                // A value is present but cannot be a key.
                None if path.value(record).is_some_and(|v| !v.is_null()) => {
                    return Err(EncodingError::InvalidKey(format!(
                        "value at key path '{path}' is not a valid key"
                    ))
                    .into());
                }
                None => None,
            },
            (None, explicit) => explicit,
        };

        match key {
            Some(key) => {
                if schema.auto_increment {
                    self.advance_generator(&key).await?;
                }
                Ok(key)
            }
            None if schema.auto_increment => {
                let key = Key::Number(self.generator().await? + 1.0);
                self.set_generator(&key).await?;
                if let Some(path) = &schema.key_path {
                    path.inject(record, &key)?;
                }
                Ok(key)
            }
            None => Err(Error::MissingKey {
                key_path: schema
                    .key_path
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            }),
        }
    }

    async fn generator(&self) -> Result<f64> {
        match self.txn.get(&self.store.meta_space, GENERATOR_KEY).await? {
            Some(bytes) => {
                rmp_serde::from_slice(&bytes).map_err(|e| EncodingError::Record(e.to_string()).into())
            }
            None => Ok(0.0),
        }
    }

    async fn set_generator(&mut self, key: &Key) -> Result<()> {
        let value = key.as_number().unwrap_or_default();
        let bytes = rmp_serde::to_vec(&value).map_err(|e| EncodingError::Record(e.to_string()))?;
        self.txn
            .put(&self.store.meta_space, GENERATOR_KEY.to_vec(), bytes)
            .await?;
        Ok(())
    }

    /// Explicit numeric keys at or above the generator push it forward.
    async fn advance_generator(&mut self, key: &Key) -> Result<()> {
        let Key::Number(n) = key else {
            return Ok(());
        };
        if !n.is_finite() {
            return Ok(());
        }
        let floor = n.floor();
        if floor > self.generator().await? {
            self.set_generator(&Key::Number(floor)).await?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Index maintenance
    // -----------------------------------------------------------------------

    async fn index(&mut self, pk: &[u8], record: &Record) -> Result<()> {
        let store = self.store;
        for def in store.indexes.iter() {
            let space = store.schema.index_space(&def.name);
            for index_key in def.index_keys(record) {
                let mut entry = encode_key(&index_key)?;
                entry.extend_from_slice(pk);
                self.txn.put(&space, entry, pk.to_vec()).await?;
            }
        }
        Ok(())
    }

    async fn unindex(&mut self, pk: &[u8], old: &Record) -> Result<()> {
        let store = self.store;
        for def in store.indexes.iter() {
            let space = store.schema.index_space(&def.name);
            for index_key in def.index_keys(old) {
                let mut entry = encode_key(&index_key)?;
                entry.extend_from_slice(pk);
                self.txn.delete(&space, &entry).await?;
            }
        }
        Ok(())
    }

    async fn check_constraints(&self, pk: &[u8], record: &Record) -> Result<()> {
        let store = self.store;
        for def in store.indexes.iter().filter(|def| def.unique) {
            let space = store.schema.index_space(&def.name);
            for index_key in def.index_keys(record) {
                let prefix = encode_key(&index_key)?;
                self.check_unique(def, &space, &prefix, pk, index_key).await?;
            }
        }
        Ok(())
    }

    async fn check_unique(
        &self,
        def: &IndexDefinition,
        space: &str,
        prefix: &[u8],
        pk: &[u8],
        index_key: Key,
    ) -> Result<()> {
        let successor = prefix_successor(prefix);
        let upper = match &successor {
            Some(s) => Bound::Excluded(s.as_slice()),
            None => Bound::Unbounded,
        };
        let entries = self.txn.scan(space, Bound::Included(prefix), upper).await?;
        if entries.iter().any(|(_, owner)| owner.as_slice() != pk) {
            return Err(Error::ConstraintViolation {
                index: def.name.clone(),
                key: index_key,
            });
        }
        Ok(())
    }
}

/// Decode the primary key stored as an index entry's value.
pub(crate) fn decode_primary_key(bytes: &[u8]) -> Result<Key> {
    Ok(decode_exact(bytes)?)
}
