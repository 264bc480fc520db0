use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::locks::RecordLocks;
use crate::core::stats::CatalogStats;
use crate::core::store::RecordStore;
use crate::core::transaction::{Action, TransactionCoordinator, TransactionSummary};
use crate::core::types::{Record, SchemaKind};
use crate::index::catalog_index::CatalogIndex;
use crate::index::entry::IndexEntry;
use crate::parallel::indexer::ParallelIndexer;
use crate::query::ast::Constraint;
use crate::query::cache::QueryCache;
use crate::query::queryable::QueryableRegistry;
use crate::query::translator::ConstraintTranslator;
use crate::schema::record::RecordKind;
use crate::search::domain::{DomainResolver, DomainValues};
use crate::search::executor::{QueryExecutor, QueryRequest};
use crate::search::projection::Projection;
use crate::search::results::{ProjectedRecord, QueryResult};
use crate::tree::applier::{PropertyUpdate, UpdateApplier};
use crate::tree::record::RecordTree;

/// The record store together with its index.
///
/// Lock order for writers: record lock, then the store write lock, then the
/// index write lock. Readers evaluate against the index first and read the
/// store afterwards, never holding both.
pub struct Catalog {
    config: Config,
    registry: QueryableRegistry,

    store: RecordStore,
    index: CatalogIndex,
    locks: RecordLocks,
    cache: QueryCache,
    indexer: ParallelIndexer,

    started: Instant,
    transactions_committed: AtomicUsize,
    transactions_failed: AtomicUsize,
}

impl Catalog {
    pub fn new(config: Config) -> Result<Self> {
        Catalog::with_registry(config, QueryableRegistry::standard())
    }

    pub fn with_registry(config: Config, registry: QueryableRegistry) -> Result<Self> {
        config.validate()?;
        let indexer = ParallelIndexer::new(config.bulk_index_workers, config.bulk_index_batch_size)?;
        Ok(Catalog {
            cache: QueryCache::new(config.query_cache_size),
            indexer,
            config,
            registry,
            store: RecordStore::new(),
            index: CatalogIndex::new(),
            locks: RecordLocks::new(),
            started: Instant::now(),
            transactions_committed: AtomicUsize::new(0),
            transactions_failed: AtomicUsize::new(0),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &QueryableRegistry {
        &self.registry
    }

    pub fn transaction(&self, actions: Vec<Action>) -> Result<TransactionSummary> {
        let outcome = TransactionCoordinator::begin(self).execute(actions);
        match &outcome {
            Ok(_) => self.transactions_committed.fetch_add(1, Ordering::Relaxed),
            Err(_) => self.transactions_failed.fetch_add(1, Ordering::Relaxed),
        };
        outcome
    }

    pub fn query(&self, request: &QueryRequest) -> Result<QueryResult> {
        QueryExecutor {
            registry: &self.registry,
            index: &self.index,
            store: &self.store,
            cache: &self.cache,
            config: &self.config,
        }
        .execute(request)
    }

    /// Records in request order. `output` defaults to each record's own schema.
    pub fn get_by_id(
        &self,
        identifiers: &[&str],
        projection: &Projection,
        output: Option<SchemaKind>,
    ) -> Result<Vec<ProjectedRecord>> {
        identifiers
            .iter()
            .map(|identifier| {
                let record = self.store.get(identifier).ok_or_else(|| not_found(identifier))?;
                let output = output.unwrap_or_else(|| record.schema_kind());
                projection.apply_as(identifier, record.content.as_ref(), &record.indexed, output)
            })
            .collect()
    }

    pub fn record(&self, identifier: &str) -> Option<Record> {
        self.store.get(identifier)
    }

    pub fn get_domain(&self, property_name: Option<&str>, parameter_name: Option<&str>) -> Result<Vec<DomainValues>> {
        DomainResolver::new(&self.registry, &self.index).resolve(property_name, parameter_name)
    }

    /// Load many documents at once. Either all are stored or, on a missing
    /// or duplicate identifier, none is.
    pub fn insert_batch(&self, documents: Vec<RecordKind>) -> Result<Vec<String>> {
        let mut prepared: Vec<(String, Box<dyn RecordTree>)> = Vec::with_capacity(documents.len());
        let mut seen = HashSet::new();
        for document in documents {
            let (identifier, tree) = self.identified(document)?;
            if !seen.insert(identifier.clone()) {
                return Err(duplicate(&identifier));
            }
            prepared.push((identifier, tree));
        }

        let entries = self.indexer.derive_entries(&prepared, &self.registry);

        let mut records = self.store.write();
        if let Some((identifier, _)) = prepared.iter().find(|(identifier, _)| records.contains_key(identifier)) {
            return Err(duplicate(identifier));
        }
        let mut published = Vec::with_capacity(entries.len());
        let mut identifiers = Vec::with_capacity(entries.len());
        for ((identifier, tree), entry) in prepared.into_iter().zip(entries) {
            let record = Record::new(identifier.clone(), tree, entry);
            published.push(Arc::clone(&record.indexed));
            identifiers.push(identifier.clone());
            records.insert(identifier, record);
        }
        self.index.publish_batch(published);

        info!(count = identifiers.len(), "bulk load finished");
        Ok(identifiers)
    }

    /// Re-derive every index entry from the stored content.
    pub fn rebuild_index(&self) -> Result<usize> {
        let mut records = self.store.write();
        let trees: Vec<(String, Box<dyn RecordTree>)> = records
            .iter()
            .map(|(identifier, record)| (identifier.clone(), record.content.box_clone()))
            .collect();
        let entries = self.indexer.derive_entries(&trees, &self.registry);

        let mut published = Vec::with_capacity(entries.len());
        for entry in entries {
            let entry = Arc::new(entry);
            if let Some(record) = records.get_mut(&entry.identifier) {
                record.indexed = Arc::clone(&entry);
                published.push(entry);
            }
        }
        let count = published.len();
        self.index.rebuild(published);
        info!(records = count, "index rebuilt");
        Ok(count)
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            uptime_secs: self.started.elapsed().as_secs(),
            total_records: self.store.len(),
            records_by_kind: self.store.counts_by_kind(),
            indexed_properties: self.index.property_count(),
            index_generation: self.index.generation(),
            cache_stats: self.cache.stats(),
            transactions_committed: self.transactions_committed.load(Ordering::Relaxed),
            transactions_failed: self.transactions_failed.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    // Mutations used by the transaction coordinator.

    /// Identifiers of every record matching the constraint.
    pub(crate) fn resolve_targets(&self, constraint: &Constraint) -> Result<Vec<String>> {
        let predicate = ConstraintTranslator::new(&self.registry).translate(Some(constraint))?;
        Ok(self
            .index
            .evaluate(&predicate, &[])
            .iter()
            .map(|entry| entry.identifier.clone())
            .collect())
    }

    pub(crate) fn insert_document(&self, document: RecordKind) -> Result<String> {
        let (identifier, tree) = self.identified(document)?;
        let entry = IndexEntry::derive(&identifier, tree.as_ref(), &self.registry);

        self.locks.with_lock(&identifier, || {
            let mut records = self.store.write();
            if records.contains_key(&identifier) {
                return Err(duplicate(&identifier));
            }
            let record = Record::new(identifier.clone(), tree, entry);
            self.index.publish(Arc::clone(&record.indexed));
            records.insert(identifier.clone(), record);
            Ok(())
        })?;

        debug!(identifier = %identifier, "record inserted");
        Ok(identifier)
    }

    /// Returns whether a record was removed.
    pub(crate) fn delete_record(&self, identifier: &str) -> bool {
        self.locks.with_lock(identifier, || {
            let mut records = self.store.write();
            let removed = records.remove(identifier).is_some();
            if removed {
                self.index.remove(identifier);
                debug!(identifier = %identifier, "record deleted");
            }
            removed
        })
    }

    /// Swap the content of `identifier`. A replacement without an
    /// identifier keeps the old one; a different one re-keys the record.
    pub(crate) fn replace_record(&self, identifier: &str, document: RecordKind) -> Result<String> {
        self.locks.with_lock(identifier, || {
            if !self.store.contains(identifier) {
                return Err(not_found(identifier));
            }
            let mut tree = document.into_tree();
            if tree.identifier().is_none() {
                tree.set_identifier(identifier);
            }
            self.commit_tree(identifier, tree)
        })
    }

    /// Apply targeted writes in order. Any failure leaves the record as it was.
    pub(crate) fn update_properties(&self, identifier: &str, updates: &[PropertyUpdate]) -> Result<String> {
        self.locks.with_lock(identifier, || {
            let record = self.store.get(identifier).ok_or_else(|| not_found(identifier))?;
            let updated = UpdateApplier::apply_all(record.content.as_ref(), updates)
                .map_err(|e| e.within(&format!("record '{}'", identifier)))?;
            self.commit_tree(identifier, updated)
        })
    }

    /// Store a new tree for a record whose lock the caller holds.
    fn commit_tree(&self, identifier: &str, tree: Box<dyn RecordTree>) -> Result<String> {
        let new_identifier = tree.identifier().ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidArgument,
                format!("update would leave record '{}' without an identifier", identifier),
            )
        })?;
        let entry = IndexEntry::derive(&new_identifier, tree.as_ref(), &self.registry);

        let mut records = self.store.write();
        if !records.contains_key(identifier) {
            return Err(not_found(identifier));
        }
        if new_identifier != identifier && records.contains_key(&new_identifier) {
            return Err(duplicate(&new_identifier));
        }

        records.remove(identifier);
        let record = Record::new(new_identifier.clone(), tree, entry);
        if new_identifier == identifier {
            self.index.publish(Arc::clone(&record.indexed));
        } else {
            self.index.publish_rekeyed(identifier, Arc::clone(&record.indexed));
        }
        records.insert(new_identifier.clone(), record);

        debug!(identifier = %new_identifier, "record updated");
        Ok(new_identifier)
    }

    /// The document's identifier, assigning one when allowed.
    fn identified(&self, document: RecordKind) -> Result<(String, Box<dyn RecordTree>)> {
        let mut tree = document.into_tree();
        match tree.identifier() {
            Some(identifier) => Ok((identifier, tree)),
            None if self.config.assign_missing_identifiers => {
                let identifier = Uuid::new_v4().to_string();
                tree.set_identifier(&identifier);
                Ok((identifier, tree))
            }
            None => Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("{} document carries no identifier", tree.schema_kind()),
            )),
        }
    }
}

fn not_found(identifier: &str) -> Error {
    Error::new(ErrorKind::RecordNotFound, format!("no record with identifier '{}'", identifier))
}

fn duplicate(identifier: &str) -> Error {
    Error::new(
        ErrorKind::DuplicateIdentifier,
        format!("a record with identifier '{}' already exists", identifier),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::Action;
    use crate::tree::node::Node;
    use serde_json::json;

    fn dc(identifier: Option<&str>, title: &str) -> RecordKind {
        let mut document = json!({"title": title, "language": "en"});
        if let Some(identifier) = identifier {
            document["identifier"] = json!(identifier);
        }
        RecordKind::from_json(SchemaKind::Dc, &document).unwrap()
    }

    #[test]
    fn assigned_identifier_is_written_back() {
        let catalog = Catalog::new(Config::default()).unwrap();
        let summary = catalog.transaction(vec![Action::insert(dc(None, "untitled"))]).unwrap();
        let identifier = &summary.inserted_identifiers[0];

        let record = catalog.record(identifier).unwrap();
        assert_eq!(record.content.identifier().as_deref(), Some(identifier.as_str()));
    }

    #[test]
    fn missing_identifier_rejected_when_assignment_is_off() {
        let config = Config {
            assign_missing_identifiers: false,
            ..Config::default()
        };
        let catalog = Catalog::new(config).unwrap();
        let err = catalog.transaction(vec![Action::insert(dc(None, "x"))]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
        assert_eq!(catalog.stats().transactions_failed, 1);
    }

    #[test]
    fn rewriting_the_identifier_rekeys_the_record() {
        let catalog = Catalog::new(Config::default()).unwrap();
        catalog
            .transaction(vec![Action::insert(dc(Some("a"), "one")), Action::insert(dc(Some("b"), "two"))])
            .unwrap();

        catalog
            .transaction(vec![Action::update_properties(
                Constraint::cql("identifier = 'a'"),
                vec![PropertyUpdate::set("identifier", Node::text("c"))],
            )])
            .unwrap();
        assert!(catalog.record("a").is_none());
        assert!(catalog.record("c").is_some());

        let err = catalog
            .transaction(vec![Action::update_properties(
                Constraint::cql("identifier = 'c'"),
                vec![PropertyUpdate::set("identifier", Node::text("b"))],
            )])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateIdentifier);
        assert!(catalog.record("c").is_some());
    }

    #[test]
    fn bulk_load_is_all_or_nothing() {
        let catalog = Catalog::new(Config::default()).unwrap();
        catalog.insert_batch(vec![dc(Some("a"), "one")]).unwrap();

        let err = catalog.insert_batch(vec![dc(Some("b"), "two"), dc(Some("a"), "again")]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateIdentifier);
        assert_eq!(catalog.len(), 1);

        assert_eq!(catalog.rebuild_index().unwrap(), 1);
        let stats = catalog.stats();
        assert_eq!(stats.records_of(SchemaKind::Dc), 1);
        assert!(stats.indexed_properties > 0);
    }
}
