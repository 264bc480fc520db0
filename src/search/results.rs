use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::types::SchemaKind;
use crate::tree::node::Structure;

/// What a query sends back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultMode {
    Hits,     // count only
    Results,  // count plus the projected page
    Validate, // acknowledgement once the constraint is accepted
}

/// A record shaped by the requested element set.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedRecord {
    pub identifier: String,
    pub kind: SchemaKind,
    pub content: Structure,
}

impl ProjectedRecord {
    pub fn to_json(&self) -> Value {
        self.content.to_json()
    }
}

/// Query outcome with paging metadata.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub mode: ResultMode,
    pub matched: usize,
    pub returned: usize,
    /// 1-based position of the next page, 0 once the last one was returned.
    pub next_record: usize,
    pub records: Vec<ProjectedRecord>,
    pub took_ms: u64,
}

impl QueryResult {
    pub fn identifiers(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.identifier.as_str()).collect()
    }
}
