use parking_lot::{RwLock, RwLockWriteGuard};
use std::collections::BTreeMap;

use crate::core::types::{Record, SchemaKind};

/// Authoritative record content, keyed by identifier.
///
/// Writers take [`RecordStore::write`] and publish the matching index change
/// before releasing it, so store and index move together.
pub struct RecordStore {
    records: RwLock<BTreeMap<String, Record>>,
}

impl RecordStore {
    pub fn new() -> Self {
        RecordStore {
            records: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn get(&self, identifier: &str) -> Option<Record> {
        self.records.read().get(identifier).cloned()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.records.read().contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn counts_by_kind(&self) -> BTreeMap<SchemaKind, usize> {
        let mut counts = BTreeMap::new();
        for record in self.records.read().values() {
            *counts.entry(record.schema_kind()).or_insert(0) += 1;
        }
        counts
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Record>> {
        self.records.write()
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}
