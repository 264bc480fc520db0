use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::error::{Error, ErrorKind, Result};

/// Value type of a queryable property, which fixes how literals in a
/// constraint are read and which operators apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryableType {
    Text,
    Numeric,
    DateTime,
    Envelope,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Queryable {
    pub name: String,
    pub value_type: QueryableType,
}

/// Property names a constraint may mention. Lookups are case-sensitive:
/// `identifier` and `Identifier` are different queryables.
#[derive(Debug, Clone)]
pub struct QueryableRegistry {
    entries: BTreeMap<String, Queryable>,
}

/// Name of the property holding every text scalar of a record.
pub const ANY_TEXT: &str = "AnyText";

const STANDARD: &[(&str, QueryableType)] = &[
    ("identifier", QueryableType::Text),
    ("Identifier", QueryableType::Text),
    ("ParentIdentifier", QueryableType::Text),
    ("Title", QueryableType::Text),
    ("title", QueryableType::Text),
    ("AlternateTitle", QueryableType::Text),
    ("Abstract", QueryableType::Text),
    ("abstract", QueryableType::Text),
    ("Subject", QueryableType::Text),
    ("subject", QueryableType::Text),
    ("TopicCategory", QueryableType::Text),
    ("Language", QueryableType::Text),
    ("language", QueryableType::Text),
    ("ResourceLanguage", QueryableType::Text),
    ("Modified", QueryableType::DateTime),
    ("Date", QueryableType::DateTime),
    ("Type", QueryableType::Text),
    ("type", QueryableType::Text),
    ("Format", QueryableType::Text),
    ("format", QueryableType::Text),
    ("OrganisationName", QueryableType::Text),
    ("BoundingBox", QueryableType::Envelope),
    ("TempExtent_begin", QueryableType::DateTime),
    ("TempExtent_end", QueryableType::DateTime),
    (ANY_TEXT, QueryableType::Text),
];

impl QueryableRegistry {
    pub fn new() -> Self {
        QueryableRegistry { entries: BTreeMap::new() }
    }

    /// The queryables every schema adapter knows how to populate.
    pub fn standard() -> Self {
        let mut registry = QueryableRegistry::new();
        for (name, value_type) in STANDARD {
            registry.register(name, *value_type);
        }
        registry
    }

    pub fn register(&mut self, name: &str, value_type: QueryableType) {
        self.entries.insert(
            name.to_string(),
            Queryable {
                name: name.to_string(),
                value_type,
            },
        );
    }

    pub fn get(&self, name: &str) -> Result<&Queryable> {
        self.entries.get(name).ok_or_else(|| {
            Error::new(ErrorKind::UnknownProperty, format!("'{}' is not a queryable property", name))
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for QueryableRegistry {
    fn default() -> Self {
        QueryableRegistry::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_are_case_sensitive() {
        let registry = QueryableRegistry::standard();
        assert!(registry.get("Identifier").is_ok());
        assert!(registry.get("identifier").is_ok());
        let err = registry.get("IDENTIFIER").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownProperty);
    }

    #[test]
    fn standard_types() {
        let registry = QueryableRegistry::standard();
        assert_eq!(registry.get("BoundingBox").unwrap().value_type, QueryableType::Envelope);
        assert_eq!(registry.get("Modified").unwrap().value_type, QueryableType::DateTime);
        assert_eq!(registry.get(ANY_TEXT).unwrap().value_type, QueryableType::Text);
    }
}
