//! Index registry: the validated, read-only set of index definitions owned
//! by a store handle.

use std::collections::BTreeMap;

use crate::error::{Error, SchemaError};
use crate::types::IndexDefinition;

/// Index definitions of one store, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct IndexRegistry {
    indexes: BTreeMap<String, IndexDefinition>,
}

impl IndexRegistry {
    /// Validate and register a set of index definitions.
    ///
    /// Rejects duplicate names, malformed key paths, and multi-entry indexes
    /// with compound key paths.
    pub fn define(definitions: Vec<IndexDefinition>) -> Result<Self, SchemaError> {
        let mut indexes = BTreeMap::new();
        for def in definitions {
            if def.name.is_empty() {
                return Err(SchemaError::EmptyIndexName);
            }
            def.key_path.validate()?;
            if def.multi_entry && def.key_path.is_compound() {
                return Err(SchemaError::MultiEntryCompound(def.name));
            }
            if indexes.contains_key(&def.name) {
                return Err(SchemaError::DuplicateIndex(def.name));
            }
            indexes.insert(def.name.clone(), def);
        }
        Ok(Self { indexes })
    }

    /// Look up an index by name.
    pub fn resolve(&self, name: &str) -> Result<&IndexDefinition, Error> {
        self.indexes
            .get(name)
            .ok_or_else(|| Error::UnknownIndex(name.to_string()))
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.indexes.contains_key(name)
    }

    /// Index names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.indexes.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexDefinition> {
        self.indexes.values()
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_path::KeyPath;

    fn people_indexes() -> Vec<IndexDefinition> {
        vec![
            IndexDefinition::new("basic", "name"),
            IndexDefinition::new("deep", "address.email"),
            IndexDefinition::new("date", "joined"),
            IndexDefinition::new("compound", ["name", "age"]),
        ]
    }

    #[test]
    fn test_define_and_resolve() {
        let registry = IndexRegistry::define(people_indexes()).unwrap();
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.names(), vec!["basic", "compound", "date", "deep"]);
        let deep = registry.resolve("deep").unwrap();
        assert_eq!(deep.key_path, KeyPath::from("address.email"));
        assert!(registry.has_index("compound"));
        assert!(!registry.has_index("missing"));
    }

    #[test]
    fn test_unknown_index() {
        let registry = IndexRegistry::define(people_indexes()).unwrap();
        let err = registry.resolve("nope").unwrap_err();
        assert!(matches!(err, Error::UnknownIndex(name) if name == "nope"));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut defs = people_indexes();
        defs.push(IndexDefinition::new("basic", "lastname"));
        let err = IndexRegistry::define(defs).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateIndex(name) if name == "basic"));
    }

    #[test]
    fn test_malformed_key_path_rejected() {
        let err = IndexRegistry::define(vec![IndexDefinition::new("bad", "a..b")]).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidKeyPath(_)));
    }

    #[test]
    fn test_multi_entry_compound_rejected() {
        let def = IndexDefinition::new("tags", ["a", "b"]).multi_entry(true);
        let err = IndexRegistry::define(vec![def]).unwrap_err();
        assert!(matches!(err, SchemaError::MultiEntryCompound(_)));
    }

    #[test]
    fn test_empty_registry() {
        let registry = IndexRegistry::define(Vec::new()).unwrap();
        assert!(registry.is_empty());
        assert!(registry.names().is_empty());
    }
}
