use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::store::RecordStore;
use crate::core::types::SchemaKind;
use crate::index::catalog_index::CatalogIndex;
use crate::index::entry::IndexEntry;
use crate::query::ast::{Constraint, Predicate};
use crate::query::cache::{QueryCache, QueryKey};
use crate::query::queryable::QueryableRegistry;
use crate::query::translator::ConstraintTranslator;
use crate::search::projection::Projection;
use crate::search::results::{QueryResult, ResultMode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub property: String,
    pub descending: bool,
}

/// A search request. `start_position` is 1-based.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub type_names: Vec<SchemaKind>,
    pub projection: Projection,
    pub sort_by: Vec<SortKey>,
    pub constraint: Option<Constraint>,
    pub result_mode: ResultMode,
    pub start_position: usize,
    pub max_records: Option<usize>,
}

impl QueryRequest {
    pub fn new() -> Self {
        QueryRequest {
            type_names: Vec::new(),
            projection: Projection::Summary,
            sort_by: Vec::new(),
            constraint: None,
            result_mode: ResultMode::Results,
            start_position: 1,
            max_records: None,
        }
    }

    pub fn cql(text: impl Into<String>) -> Self {
        QueryRequest::new().with_constraint(Constraint::cql(text))
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    pub fn with_type_names(mut self, kinds: &[SchemaKind]) -> Self {
        self.type_names = kinds.to_vec();
        self
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    pub fn sort(mut self, property: impl Into<String>, descending: bool) -> Self {
        self.sort_by.push(SortKey {
            property: property.into(),
            descending,
        });
        self
    }

    pub fn mode(mut self, mode: ResultMode) -> Self {
        self.result_mode = mode;
        self
    }

    pub fn page(mut self, start_position: usize, max_records: usize) -> Self {
        self.start_position = start_position;
        self.max_records = Some(max_records);
        self
    }

    /// Resolve protocol type names such as `csw:Record`.
    pub fn parse_type_names(names: &[&str]) -> Result<Vec<SchemaKind>> {
        names
            .iter()
            .map(|name| {
                SchemaKind::from_type_name(name)
                    .ok_or_else(|| Error::new(ErrorKind::InvalidArgument, format!("unknown type name '{}'", name)))
            })
            .collect()
    }
}

impl Default for QueryRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs one request against the index, then reads the page from the store.
pub struct QueryExecutor<'a> {
    pub registry: &'a QueryableRegistry,
    pub index: &'a CatalogIndex,
    pub store: &'a RecordStore,
    pub cache: &'a QueryCache,
    pub config: &'a Config,
}

impl<'a> QueryExecutor<'a> {
    pub fn execute(&self, request: &QueryRequest) -> Result<QueryResult> {
        let started = Instant::now();

        if request.start_position < 1 {
            return Err(Error::new(
                ErrorKind::InvalidPagingParameter,
                format!("startPosition must be 1 or more, got {}", request.start_position),
            ));
        }
        for key in &request.sort_by {
            self.registry.get(&key.property).map_err(|e| e.within("sortBy"))?;
        }

        let identifiers = self.matching(request)?;
        let matched = identifiers.len();

        if request.result_mode != ResultMode::Results {
            debug!(matched, mode = ?request.result_mode, "query evaluated");
            return Ok(QueryResult {
                mode: request.result_mode,
                matched,
                returned: 0,
                next_record: 0,
                records: Vec::new(),
                took_ms: started.elapsed().as_millis() as u64,
            });
        }

        let limit = request
            .max_records
            .unwrap_or(self.config.default_max_records)
            .min(self.config.max_records_limit);
        let start = request.start_position - 1;
        let page: &[String] = identifiers.get(start..).unwrap_or(&[]);
        let page = &page[..page.len().min(limit)];

        // a record deleted since evaluation is skipped
        let records: Vec<_> = page
            .iter()
            .filter_map(|identifier| self.store.get(identifier))
            .map(|record| request.projection.apply(&record.identifier, record.content.as_ref()))
            .collect();

        let next = start + page.len();
        let result = QueryResult {
            mode: ResultMode::Results,
            matched,
            returned: records.len(),
            next_record: if next < matched { next + 1 } else { 0 },
            records,
            took_ms: started.elapsed().as_millis() as u64,
        };
        debug!(matched, returned = result.returned, next = result.next_record, "query executed");
        Ok(result)
    }

    /// Ordered identifiers of every matching record.
    fn matching(&self, request: &QueryRequest) -> Result<Arc<Vec<String>>> {
        let translator = ConstraintTranslator::new(self.registry);
        let filter = request.constraint.as_ref().map(|c| translator.to_filter(c)).transpose()?;
        let predicate = match &filter {
            Some(filter) => translator.translate_filter(filter)?,
            None => Predicate::All,
        };

        let mut kinds = request.type_names.clone();
        kinds.sort();
        kinds.dedup();

        let query = cache_text(&kinds, filter.as_ref().map(|f| f.to_string()), &request.sort_by);
        let key = QueryKey {
            generation: self.index.generation(),
            query: query.clone(),
        };
        if let Some(identifiers) = self.cache.get(&key) {
            return Ok(identifiers);
        }

        let (generation, mut entries) = self.index.evaluate_versioned(&predicate, &kinds);
        order(&mut entries, &request.sort_by);
        let identifiers = Arc::new(entries.iter().map(|e| e.identifier.clone()).collect::<Vec<_>>());
        self.cache.put(QueryKey { generation, query }, Arc::clone(&identifiers));
        Ok(identifiers)
    }
}

fn cache_text(kinds: &[SchemaKind], filter: Option<String>, sort_by: &[SortKey]) -> String {
    let kinds: Vec<&str> = kinds.iter().map(|k| k.type_name()).collect();
    let sort: Vec<String> = sort_by
        .iter()
        .map(|k| format!("{} {}", k.property, if k.descending { "DESC" } else { "ASC" }))
        .collect();
    format!("[{}] {} [{}]", kinds.join(","), filter.unwrap_or_else(|| "*".to_string()), sort.join(","))
}

/// Sort by the keys in turn, records lacking a value last, identifier
/// ascending on ties. Ascending keys compare each record's smallest value,
/// descending keys its largest.
fn order(entries: &mut [Arc<IndexEntry>], keys: &[SortKey]) {
    entries.sort_by(|a, b| {
        for key in keys {
            let (left, right) = if key.descending {
                (a.max_value(&key.property), b.max_value(&key.property))
            } else {
                (a.min_value(&key.property), b.min_value(&key.property))
            };
            let ordering = match (left, right) {
                (Some(l), Some(r)) if key.descending => r.total_cmp(l),
                (Some(l), Some(r)) => l.total_cmp(r),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        a.identifier.cmp(&b.identifier)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::entry::IndexValue;
    use std::collections::HashMap;

    fn entry(identifier: &str, title: Option<&str>) -> Arc<IndexEntry> {
        let mut values = HashMap::new();
        if let Some(title) = title {
            values.insert("Title".to_string(), vec![IndexValue::Text(title.to_string())]);
        }
        Arc::new(IndexEntry {
            identifier: identifier.to_string(),
            kind: SchemaKind::Dc,
            values,
        })
    }

    #[test]
    fn missing_values_sort_last_in_both_directions() {
        let mut entries = vec![entry("c", None), entry("b", Some("beta")), entry("a", Some("alpha"))];
        let key = |descending| SortKey {
            property: "Title".into(),
            descending,
        };

        order(&mut entries, &[key(false)]);
        let ids: Vec<_> = entries.iter().map(|e| e.identifier.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        order(&mut entries, &[key(true)]);
        let ids: Vec<_> = entries.iter().map(|e| e.identifier.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn unknown_type_names_are_rejected() {
        assert_eq!(
            QueryRequest::parse_type_names(&["csw:Record", "gmd:MD_Metadata"]).unwrap(),
            vec![SchemaKind::Dc, SchemaKind::Iso]
        );
        let err = QueryRequest::parse_type_names(&["csw:Unknown"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }
}
