//! Key ranges: immutable intervals over key space, and the declarative
//! configuration they are built from.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::key::Key;

/// Declarative range configuration.
///
/// Recognized options: `only`, `lower`, `upper`, `excludeLower`,
/// `excludeUpper`; anything else is ignored. Bounds are record values (see
/// [`Key::from_value`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRangeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<Value>,
    #[serde(default)]
    pub exclude_lower: bool,
    #[serde(default)]
    pub exclude_upper: bool,
}

impl KeyRangeSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn only(mut self, value: impl Into<Value>) -> Self {
        self.only = Some(value.into());
        self
    }

    pub fn lower(mut self, value: impl Into<Value>) -> Self {
        self.lower = Some(value.into());
        self
    }

    pub fn upper(mut self, value: impl Into<Value>) -> Self {
        self.upper = Some(value.into());
        self
    }

    pub fn exclude_lower(mut self, exclude: bool) -> Self {
        self.exclude_lower = exclude;
        self
    }

    pub fn exclude_upper(mut self, exclude: bool) -> Self {
        self.exclude_upper = exclude;
        self
    }

    /// Build the range this configuration describes.
    pub fn build(&self) -> Result<KeyRange> {
        KeyRange::from_spec(self)
    }
}

/// A contiguous interval over key space.
///
/// A missing bound is unbounded on that side. Given bounds are closed unless
/// marked open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    lower: Option<Key>,
    upper: Option<Key>,
    lower_open: bool,
    upper_open: bool,
}

fn to_bound(value: &Value, name: &str) -> Result<Key> {
    Key::from_value(value)
        .map_err(|e| Error::InvalidRangeSpec(format!("'{name}' is not a valid key: {e}")))
}

impl KeyRange {
    /// Construct a range from a declarative configuration.
    pub fn from_spec(spec: &KeyRangeSpec) -> Result<Self> {
        if let Some(only) = &spec.only {
            if spec.lower.is_some() || spec.upper.is_some() {
                return Err(Error::InvalidRangeSpec(
                    "'only' cannot be combined with 'lower' or 'upper'".to_string(),
                ));
            }
            return Ok(Self::only(to_bound(only, "only")?));
        }

        match (&spec.lower, &spec.upper) {
            (None, None) => Err(Error::InvalidRangeSpec(
                "one of 'only', 'lower' or 'upper' is required".to_string(),
            )),
            (Some(lower), None) => Ok(Self::lower_bound(
                to_bound(lower, "lower")?,
                spec.exclude_lower,
            )),
            (None, Some(upper)) => Ok(Self::upper_bound(
                to_bound(upper, "upper")?,
                spec.exclude_upper,
            )),
            (Some(lower), Some(upper)) => Self::bound(
                to_bound(lower, "lower")?,
                to_bound(upper, "upper")?,
                spec.exclude_lower,
                spec.exclude_upper,
            ),
        }
    }

    /// A single-point range.
    pub fn only(key: Key) -> Self {
        Self {
            lower: Some(key.clone()),
            upper: Some(key),
            lower_open: false,
            upper_open: false,
        }
    }

    /// `[lower, +inf)`, or `(lower, +inf)` when `open`.
    pub fn lower_bound(lower: Key, open: bool) -> Self {
        Self {
            lower: Some(lower),
            upper: None,
            lower_open: open,
            upper_open: false,
        }
    }

    /// `(-inf, upper]`, or `(-inf, upper)` when `open`.
    pub fn upper_bound(upper: Key, open: bool) -> Self {
        Self {
            lower: None,
            upper: Some(upper),
            lower_open: false,
            upper_open: open,
        }
    }

    /// A range bounded on both sides.
    ///
    /// Fails when `lower > upper`, or when they are equal and either end is
    /// open (the range could never match anything).
    pub fn bound(lower: Key, upper: Key, lower_open: bool, upper_open: bool) -> Result<Self> {
        if lower > upper {
            return Err(Error::InvalidRangeSpec(format!(
                "lower bound {lower} is greater than upper bound {upper}"
            )));
        }
        if lower == upper && (lower_open || upper_open) {
            return Err(Error::InvalidRangeSpec(format!(
                "bounds are both {lower} but one end is excluded"
            )));
        }
        Ok(Self {
            lower: Some(lower),
            upper: Some(upper),
            lower_open,
            upper_open,
        })
    }

    pub fn lower(&self) -> Option<&Key> {
        self.lower.as_ref()
    }

    pub fn upper(&self) -> Option<&Key> {
        self.upper.as_ref()
    }

    pub fn lower_open(&self) -> bool {
        self.lower_open
    }

    pub fn upper_open(&self) -> bool {
        self.upper_open
    }

    /// Whether this is a single-point range.
    pub fn is_only(&self) -> bool {
        matches!((&self.lower, &self.upper), (Some(l), Some(u)) if l == u)
    }

    /// Whether `key` falls inside the range.
    pub fn contains(&self, key: &Key) -> bool {
        let above_lower = match &self.lower {
            None => true,
            Some(lower) if self.lower_open => key > lower,
            Some(lower) => key >= lower,
        };
        let below_upper = match &self.upper {
            None => true,
            Some(upper) if self.upper_open => key < upper,
            Some(upper) => key <= upper,
        };
        above_lower && below_upper
    }
}

impl TryFrom<KeyRangeSpec> for KeyRange {
    type Error = Error;

    fn try_from(spec: KeyRangeSpec) -> Result<Self> {
        KeyRange::from_spec(&spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_only_is_single_point() {
        let range = KeyRangeSpec::new().only("John").build().unwrap();
        assert!(range.is_only());
        assert!(range.contains(&Key::from("John")));
        assert!(!range.contains(&Key::from("Joe")));
    }

    #[test]
    fn test_only_with_other_bounds_fails() {
        let err = KeyRangeSpec::new().only(1).lower(0).build().unwrap_err();
        assert!(matches!(err, Error::InvalidRangeSpec(_)));
        let err = KeyRangeSpec::new().only(1).upper(3).build().unwrap_err();
        assert!(matches!(err, Error::InvalidRangeSpec(_)));
    }

    #[test]
    fn test_lower_only_defaults_inclusive() {
        let range = KeyRangeSpec::new().lower("Jo").build().unwrap();
        assert!(range.contains(&Key::from("Jo")));
        assert!(range.contains(&Key::from("John")));
        assert!(!range.contains(&Key::from("James")));
        assert!(range.upper().is_none());

        let open = KeyRangeSpec::new().lower("Jo").exclude_lower(true).build().unwrap();
        assert!(!open.contains(&Key::from("Jo")));
    }

    #[test]
    fn test_upper_only_defaults_inclusive() {
        let range = KeyRangeSpec::new().upper(10).build().unwrap();
        assert!(range.contains(&Key::from(10)));
        assert!(range.contains(&Key::from(-1000)));
        assert!(!range.contains(&Key::from(11)));

        let open = KeyRangeSpec::new().upper(10).exclude_upper(true).build().unwrap();
        assert!(!open.contains(&Key::from(10)));
    }

    #[test]
    fn test_inverted_bounds_fail() {
        let err = KeyRangeSpec::new().lower(5).upper(1).build().unwrap_err();
        assert!(matches!(err, Error::InvalidRangeSpec(_)));
        // Strings sort after numbers, so this is inverted too.
        let err = KeyRangeSpec::new().lower("a").upper(1).build().unwrap_err();
        assert!(matches!(err, Error::InvalidRangeSpec(_)));
    }

    #[test]
    fn test_equal_bounds_with_exclusion_fail() {
        assert!(KeyRangeSpec::new().lower(2).upper(2).build().unwrap().is_only());
        assert!(
            KeyRangeSpec::new()
                .lower(2)
                .upper(2)
                .exclude_upper(true)
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_empty_spec_fails() {
        assert!(KeyRangeSpec::new().build().is_err());
    }

    #[test]
    fn test_invalid_key_value_fails() {
        let err = KeyRangeSpec::new().only(json!(true)).build().unwrap_err();
        assert!(matches!(err, Error::InvalidRangeSpec(_)));
    }

    #[test]
    fn test_deserialize_spec_names() {
        let spec: KeyRangeSpec =
            serde_json::from_value(json!({"lower": 1, "upper": 5, "excludeUpper": true}))
                .unwrap();
        let range = spec.build().unwrap();
        assert!(range.contains(&Key::from(1)));
        assert!(!range.contains(&Key::from(5)));
        assert!(range.upper_open());
    }

    #[test]
    fn test_deserialize_ignores_unrecognized_option() {
        let spec: KeyRangeSpec =
            serde_json::from_value(json!({"upper": "j", "excludeUppr": true})).unwrap();
        assert!(!spec.exclude_upper);
        let range = spec.build().unwrap();
        assert!(range.contains(&Key::from("j")));
        assert!(!range.upper_open());
    }

    #[test]
    fn test_date_bounds() {
        let range = KeyRangeSpec::new()
            .lower(Key::date(946_684_800_000.0))
            .build()
            .unwrap();
        assert!(range.contains(&Key::date(1_000_000_000_000.0)));
        // Numbers sort below every date.
        assert!(!range.contains(&Key::from(2_000_000_000_000_i64)));
    }
}
