//! Error types for all Strata operations.

use thiserror::Error;

use crate::key::Key;

/// Top-level error type for Strata operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid key range: {0}")]
    InvalidRangeSpec(String),

    #[error("record has no key at key path '{key_path}' and the store has no key generator")]
    MissingKey { key_path: String },

    #[error("unknown index: {0}")]
    UnknownIndex(String),

    #[error("unique index '{index}' already contains key {key}")]
    ConstraintViolation { index: String, key: Key },

    #[error("batch write failed at item {position}: {source}")]
    BatchWriteFailed {
        position: usize,
        #[source]
        source: Box<Error>,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

impl Error {
    /// Wrap an item-level failure with its position inside a batch.
    pub(crate) fn at_position(self, position: usize) -> Self {
        Error::BatchWriteFailed {
            position,
            source: Box::new(self),
        }
    }
}

/// Failures reported by the storage engine. Passed through to callers as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("transaction aborted")]
    Aborted,

    #[error("write attempted in a read-only transaction")]
    ReadOnly,

    #[error("engine failure: {0}")]
    Internal(String),
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("store name must not be empty")]
    EmptyStoreName,

    #[error("index names must not be empty")]
    EmptyIndexName,

    #[error("index already defined: {0}")]
    DuplicateIndex(String),

    #[error("invalid key path: {0:?}")]
    InvalidKeyPath(String),

    #[error("index '{0}' has a compound key path and cannot be multi-entry")]
    MultiEntryCompound(String),

    #[error("auto-increment requires a single key path, got a compound one")]
    AutoIncrementCompound,

    #[error("store uses in-line keys at '{0}'; an explicit key cannot be supplied")]
    InlineKeyConflict(String),

    #[error("cannot write generated key at '{0}': an intermediate value is not an object")]
    KeyInjection(String),
}

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("NaN is not a valid key value")]
    NaN,

    #[error("value is not a valid key: {0}")]
    InvalidKey(String),

    #[error("malformed encoded key")]
    MalformedKey,

    #[error("invalid key type tag: {0:#04x}")]
    InvalidTypeTag(u8),

    #[error("record serialization error: {0}")]
    Record(String),
}

pub type Result<T> = std::result::Result<T, Error>;
