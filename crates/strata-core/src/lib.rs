//! # Strata
//!
//! A typed object-store layer over a transactional, ordered key-value engine.
//!
//! A store holds schema-less records (`serde_json::Value`) under primary keys
//! taken from the records themselves (in-line keys), supplied by the caller
//! (out-of-line keys), or generated. Secondary indexes are maintained on
//! every write and can be range-queried with a [`KeyRange`].
//!
//! ## Quick Start
//!
//! ```
//! use strata_core::{ArrayType, IndexDefinition, KeyRangeSpec, MemoryEngine, ObjectStore, Query};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = ObjectStore::builder("people")
//!     .index(IndexDefinition::new("basic", "name"))
//!     .open(MemoryEngine::new())
//!     .unwrap();
//!
//! store.put(json!({"id": 1, "name": "John"})).await.unwrap();
//! store.put(json!({"id": 2, "name": "Joe"})).await.unwrap();
//!
//! let range = KeyRangeSpec::new().only("John").build().unwrap();
//! let johns = store.query(&Query::new().index("basic").range(range)).await.unwrap();
//! assert_eq!(johns.len(), 1);
//!
//! let batch = store.get_batch(vec![1, 10, 2], ArrayType::Sparse).await.unwrap();
//! assert_eq!(batch.len(), 3);
//! assert_eq!(batch.enumerable_len(), 2);
//! # }
//! ```

pub mod api;
pub mod encoding;
pub mod engine;
pub mod error;
pub mod index;
pub mod key;
pub mod key_path;
pub mod key_range;
pub mod shape;
pub mod types;

pub use api::{BatchOp, ObjectStore, Order, Query, QuerySpec, StoreBuilder, StoreTxn, WriteBatch};
pub use engine::{Engine, EngineTxn, MemoryEngine, TxnMode};
pub use error::{EncodingError, EngineError, Error, Result, SchemaError};
pub use index::IndexRegistry;
pub use key::Key;
pub use key_path::KeyPath;
pub use key_range::{KeyRange, KeyRangeSpec};
pub use shape::{ArrayType, BatchArray, Slot};
pub use types::{IndexDefinition, Record, StoreSchema};
