//! Public API: store handle, CRUD, batching, queries, and explicit transactions.

pub mod batch;
pub mod builders;
pub mod query;
pub mod store;
pub mod transaction;

pub use batch::{BatchOp, WriteBatch};
pub use builders::StoreBuilder;
pub use query::{Order, Query, QuerySpec};
pub use store::ObjectStore;
pub use transaction::StoreTxn;
