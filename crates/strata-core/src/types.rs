//! Core types: store schemas, index definitions, and keyspace naming.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::key::Key;
use crate::key_path::KeyPath;

/// A record: a schema-less structured value.
pub type Record = Value;

/// Key path used when a schema does not name one.
pub const DEFAULT_KEY_PATH: &str = "id";

/// Key under which the auto-increment generator lives in the meta keyspace.
pub const GENERATOR_KEY: &[u8] = b"key-generator";

/// A secondary index definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDefinition {
    /// Index name, unique within its store.
    pub name: String,
    /// Path (or compound paths) the index key is read from.
    pub key_path: KeyPath,
    /// Reject two records that produce the same index key.
    #[serde(default)]
    pub unique: bool,
    /// Index each element of an array-valued field separately.
    #[serde(default)]
    pub multi_entry: bool,
}

impl IndexDefinition {
    pub fn new(name: impl Into<String>, key_path: impl Into<KeyPath>) -> Self {
        Self {
            name: name.into(),
            key_path: key_path.into(),
            unique: false,
            multi_entry: false,
        }
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn multi_entry(mut self, multi_entry: bool) -> Self {
        self.multi_entry = multi_entry;
        self
    }

    /// The index keys `record` contributes to this index.
    ///
    /// Empty when the key path does not resolve. For a multi-entry index
    /// over an array, one key per distinct valid element (invalid elements
    /// are skipped); otherwise at most one key.
    pub fn index_keys(&self, record: &Value) -> Vec<Key> {
        if self.multi_entry
            && let Some(Value::Array(items)) = self.key_path.value(record)
        {
            let mut keys: Vec<Key> = items
                .iter()
                .filter_map(|item| Key::from_value(item).ok())
                .collect();
            keys.sort();
            keys.dedup();
            return keys;
        }
        self.key_path.resolve(record).into_iter().collect()
    }
}

/// Everything fixed about a store when it is opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSchema {
    pub name: String,
    /// In-line key path; `None` means keys are supplied out of line.
    #[serde(default = "default_key_path")]
    pub key_path: Option<KeyPath>,
    /// Generate increasing integer keys for records that lack one.
    #[serde(default = "default_auto_increment")]
    pub auto_increment: bool,
    #[serde(default)]
    pub indexes: Vec<IndexDefinition>,
}

fn default_key_path() -> Option<KeyPath> {
    Some(KeyPath::from(DEFAULT_KEY_PATH))
}

fn default_auto_increment() -> bool {
    true
}

impl StoreSchema {
    /// A schema with the default key path (`"id"`), auto-increment on, and
    /// no indexes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_path: default_key_path(),
            auto_increment: default_auto_increment(),
            indexes: Vec::new(),
        }
    }

    pub fn records_space(&self) -> String {
        self.name.clone()
    }

    pub fn index_space(&self, index: &str) -> String {
        format!("{}/index/{index}", self.name)
    }

    pub fn meta_space(&self) -> String {
        format!("{}/meta", self.name)
    }
}
