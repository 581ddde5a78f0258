//! The key model: valid key values, their total ordering, and conversion
//! to and from record values.
//!
//! Keys order by type first (numbers < dates < strings < binary < arrays),
//! then naturally within a type. Arrays compare element by element, and a
//! proper prefix orders before the longer array.
//!
//! In a record a key-valued field is a JSON number, a JSON string, a JSON
//! array of key-valued elements, `{"$date": <ms>}` or `{"$binary": [..]}`.

use std::cmp::Ordering;
use std::fmt;

use serde_json::{Map, Value};

use crate::error::EncodingError;

/// Marker field for date keys inside records.
pub const DATE_FIELD: &str = "$date";

/// Marker field for binary keys inside records.
pub const BINARY_FIELD: &str = "$binary";

/// A value that identifies a record or an index entry.
#[derive(Debug, Clone)]
pub enum Key {
    Number(f64),
    /// Milliseconds since the Unix epoch.
    Date(f64),
    String(String),
    Binary(Vec<u8>),
    Array(Vec<Key>),
}

impl Key {
    /// Build a date key from milliseconds since the Unix epoch.
    pub fn date(millis: f64) -> Self {
        Key::Date(millis)
    }

    /// Position of this key's type in the cross-type ordering.
    pub(crate) fn type_rank(&self) -> u8 {
        match self {
            Key::Number(_) => 0,
            Key::Date(_) => 1,
            Key::String(_) => 2,
            Key::Binary(_) => 3,
            Key::Array(_) => 4,
        }
    }

    /// Convert a record value into a key.
    ///
    /// Fails for booleans, null, NaN, and objects that are not date or
    /// binary markers.
    pub fn from_value(value: &Value) -> Result<Self, EncodingError> {
        match value {
            Value::Number(n) => {
                let n = n
                    .as_f64()
                    .ok_or_else(|| EncodingError::InvalidKey(value.to_string()))?;
                if n.is_nan() {
                    return Err(EncodingError::NaN);
                }
                Ok(Key::Number(n))
            }
            Value::String(s) => Ok(Key::String(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(Key::from_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Key::Array),
            Value::Object(map) if map.len() == 1 => {
                if let Some(ms) = map.get(DATE_FIELD) {
                    let ms = ms
                        .as_f64()
                        .ok_or_else(|| EncodingError::InvalidKey(value.to_string()))?;
                    return Ok(Key::Date(ms));
                }
                if let Some(Value::Array(bytes)) = map.get(BINARY_FIELD) {
                    let bytes = bytes
                        .iter()
                        .map(|b| {
                            b.as_u64()
                                .and_then(|b| u8::try_from(b).ok())
                                .ok_or_else(|| EncodingError::InvalidKey(value.to_string()))
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    return Ok(Key::Binary(bytes));
                }
                Err(EncodingError::InvalidKey(value.to_string()))
            }
            _ => Err(EncodingError::InvalidKey(value.to_string())),
        }
    }

    /// Convert this key back into its record representation.
    pub fn to_value(&self) -> Value {
        match self {
            Key::Number(n) => number_value(*n),
            Key::Date(ms) => {
                let mut map = Map::new();
                map.insert(DATE_FIELD.to_string(), number_value(*ms));
                Value::Object(map)
            }
            Key::String(s) => Value::String(s.clone()),
            Key::Binary(b) => {
                let mut map = Map::new();
                map.insert(
                    BINARY_FIELD.to_string(),
                    Value::Array(b.iter().map(|&byte| Value::from(byte)).collect()),
                );
                Value::Object(map)
            }
            Key::Array(items) => Value::Array(items.iter().map(Key::to_value).collect()),
        }
    }

    /// The numeric value of a number key, if this is one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Key::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// Integral numbers round-trip as JSON integers so `{"id": 1}` reads back as `1`.
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    if a == b {
        Ordering::Equal
    } else {
        a.total_cmp(&b)
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Key::Number(a), Key::Number(b)) | (Key::Date(a), Key::Date(b)) => cmp_f64(*a, *b),
            (Key::String(a), Key::String(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Key::Binary(a), Key::Binary(b)) => a.cmp(b),
            (Key::Array(a), Key::Array(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.cmp(y) {
                        Ordering::Equal => continue,
                        ord => return ord,
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Number(n) => write!(f, "{n}"),
            Key::Date(ms) => write!(f, "date({ms})"),
            Key::String(s) => write!(f, "{s:?}"),
            Key::Binary(b) => {
                f.write_str("0x")?;
                for byte in b {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            Key::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<f64> for Key {
    fn from(n: f64) -> Self {
        Key::Number(n)
    }
}

impl From<i32> for Key {
    fn from(n: i32) -> Self {
        Key::Number(f64::from(n))
    }
}

impl From<u32> for Key {
    fn from(n: u32) -> Self {
        Key::Number(f64::from(n))
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Number(n as f64)
    }
}

impl From<u64> for Key {
    fn from(n: u64) -> Self {
        Key::Number(n as f64)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::String(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::String(s)
    }
}

impl From<Vec<u8>> for Key {
    fn from(b: Vec<u8>) -> Self {
        Key::Binary(b)
    }
}

impl From<Vec<Key>> for Key {
    fn from(items: Vec<Key>) -> Self {
        Key::Array(items)
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Self {
        key.to_value()
    }
}

impl TryFrom<&Value> for Key {
    type Error = EncodingError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        Key::from_value(value)
    }
}

impl TryFrom<Value> for Key {
    type Error = EncodingError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Key::from_value(&value)
    }
}
