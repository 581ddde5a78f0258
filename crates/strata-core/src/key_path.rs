//! Key paths: extracting keys from records and writing generated keys back.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, SchemaError};
use crate::key::Key;

/// A field-addressing expression used to compute a key from a record.
///
/// Serialized as either a string (`"address.email"`) or a list of strings
/// (`["name", "age"]`), the same shapes accepted by store option objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyPath {
    Single(String),
    Compound(Vec<String>),
}

impl KeyPath {
    pub fn single(path: impl Into<String>) -> Self {
        KeyPath::Single(path.into())
    }

    pub fn compound<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KeyPath::Compound(paths.into_iter().map(Into::into).collect())
    }

    pub fn is_compound(&self) -> bool {
        matches!(self, KeyPath::Compound(_))
    }

    /// Check that every component is a well-formed dotted path.
    pub fn validate(&self) -> Result<(), SchemaError> {
        match self {
            KeyPath::Single(path) => {
                if is_valid_path(path) {
                    Ok(())
                } else {
                    Err(SchemaError::InvalidKeyPath(path.clone()))
                }
            }
            KeyPath::Compound(paths) => {
                if paths.is_empty() {
                    return Err(SchemaError::InvalidKeyPath("[]".to_string()));
                }
                match paths.iter().find(|p| p.is_empty() || !is_valid_path(p)) {
                    Some(bad) => Err(SchemaError::InvalidKeyPath(bad.clone())),
                    None => Ok(()),
                }
            }
        }
    }

    /// Resolve this path against a record.
    ///
    /// Returns `None` when any addressed field is missing or is not a valid
    /// key; for a compound path, `None` if any component is `None`.
    pub fn resolve(&self, record: &Value) -> Option<Key> {
        match self {
            KeyPath::Single(path) => lookup(record, path).and_then(|v| Key::from_value(v).ok()),
            KeyPath::Compound(paths) => paths
                .iter()
                .map(|p| lookup(record, p).and_then(|v| Key::from_value(v).ok()))
                .collect::<Option<Vec<_>>>()
                .map(Key::Array),
        }
    }

    /// The raw value addressed by a single path, without key conversion.
    ///
    /// Compound paths have no single value and return `None`.
    pub fn value<'a>(&self, record: &'a Value) -> Option<&'a Value> {
        match self {
            KeyPath::Single(path) => lookup(record, path),
            KeyPath::Compound(_) => None,
        }
    }

    /// Write `key` into `record` at this (single) path, creating missing
    /// intermediate objects.
    pub fn inject(&self, record: &mut Value, key: &Key) -> Result<(), Error> {
        let path = match self {
            KeyPath::Single(path) if !path.is_empty() => path,
            KeyPath::Single(_) => return Err(SchemaError::KeyInjection(String::new()).into()),
            KeyPath::Compound(_) => return Err(SchemaError::AutoIncrementCompound.into()),
        };

        let mut segments = path.split('.').peekable();
        let mut current = record;
        while let Some(segment) = segments.next() {
            let map = current
                .as_object_mut()
                .ok_or_else(|| SchemaError::KeyInjection(path.clone()))?;
            if segments.peek().is_none() {
                map.insert(segment.to_string(), key.to_value());
                return Ok(());
            }
            current = map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        Ok(())
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPath::Single(path) => f.write_str(path),
            KeyPath::Compound(paths) => write!(f, "[{}]", paths.join(", ")),
        }
    }
}

impl From<&str> for KeyPath {
    fn from(path: &str) -> Self {
        KeyPath::Single(path.to_string())
    }
}

impl From<String> for KeyPath {
    fn from(path: String) -> Self {
        KeyPath::Single(path)
    }
}

impl From<Vec<&str>> for KeyPath {
    fn from(paths: Vec<&str>) -> Self {
        KeyPath::compound(paths)
    }
}

impl<const N: usize> From<[&str; N]> for KeyPath {
    fn from(paths: [&str; N]) -> Self {
        KeyPath::compound(paths)
    }
}

/// Empty, or identifier segments separated by single dots.
fn is_valid_path(path: &str) -> bool {
    path.is_empty()
        || path.split('.').all(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {
                    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
                }
                _ => false,
            }
        })
}

/// Walk a dotted path. The empty path addresses the record itself.
fn lookup<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(record);
    }
    path.split('.')
        .try_fold(record, |value, segment| value.as_object()?.get(segment))
}
