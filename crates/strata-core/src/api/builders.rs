use crate::engine::Engine;
use crate::error::Result;
use crate::key_path::KeyPath;
use crate::types::{IndexDefinition, StoreSchema};

use super::store::ObjectStore;

// ---------------------------------------------------------------------------
// StoreBuilder
// ---------------------------------------------------------------------------

/// Builder for a [`StoreSchema`] and the store opened from it.
///
/// ```
/// use strata_core::{IndexDefinition, MemoryEngine, ObjectStore};
///
/// let store = ObjectStore::builder("people")
///     .index(IndexDefinition::new("basic", "name"))
///     .index(IndexDefinition::new("compound", ["name", "age"]))
///     .open(MemoryEngine::new())
///     .unwrap();
/// assert_eq!(store.index_names(), vec!["basic", "compound"]);
/// ```
#[derive(Debug, Clone)]
pub struct StoreBuilder {
    schema: StoreSchema,
}

impl StoreBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: StoreSchema::new(name),
        }
    }

    /// Derive keys from records at this path (in-line keys).
    pub fn key_path(mut self, key_path: impl Into<KeyPath>) -> Self {
        self.schema.key_path = Some(key_path.into());
        self
    }

    /// Take keys from the caller instead of the records.
    pub fn out_of_line_keys(mut self) -> Self {
        self.schema.key_path = None;
        self
    }

    pub fn auto_increment(mut self, auto_increment: bool) -> Self {
        self.schema.auto_increment = auto_increment;
        self
    }

    /// Add a secondary index.
    pub fn index(mut self, index: IndexDefinition) -> Self {
        self.schema.indexes.push(index);
        self
    }

    pub fn schema(&self) -> &StoreSchema {
        &self.schema
    }

    pub fn build(self) -> StoreSchema {
        self.schema
    }

    /// Validate the schema and open the store over `engine`.
    pub fn open<E: Engine>(self, engine: E) -> Result<ObjectStore<E>> {
        ObjectStore::open(engine, self.schema)
    }
}

impl From<StoreSchema> for StoreBuilder {
    fn from(schema: StoreSchema) -> Self {
        Self { schema }
    }
}
