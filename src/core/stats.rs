use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::types::SchemaKind;
use crate::query::cache::CacheStats;

/// Catalog statistics for monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogStats {
    pub uptime_secs: u64,

    // Store
    pub total_records: usize,
    pub records_by_kind: BTreeMap<SchemaKind, usize>,

    // Index
    pub indexed_properties: usize,
    pub index_generation: u64,
    pub cache_stats: CacheStats,

    // Transactions
    pub transactions_committed: usize,
    pub transactions_failed: usize,
}

impl CatalogStats {
    pub fn records_of(&self, kind: SchemaKind) -> usize {
        self.records_by_kind.get(&kind).copied().unwrap_or(0)
    }
}
