use parking_lot::RwLock;
use roaring::RoaringBitmap;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::core::types::{DocId, SchemaKind};
use crate::index::entry::{IndexEntry, IndexValue};
use crate::query::ast::{CompareOp, Predicate};
use crate::query::matcher::PredicateMatcher;

/// Per-record index entries plus the bitmaps used to narrow evaluation.
///
/// Entries are published whole: a reader holding the read lock sees either
/// the previous entry of a record or the new one, never a mix. Every change
/// bumps the generation, which keys the query cache.
pub struct CatalogIndex {
    state: RwLock<IndexState>,
    generation: AtomicU64,
    matcher: PredicateMatcher,
}

#[derive(Default)]
struct IndexState {
    slots: HashMap<String, DocId>,
    entries: HashMap<DocId, Arc<IndexEntry>>,
    /// property -> text value -> records holding it
    text_postings: HashMap<String, HashMap<String, RoaringBitmap>>,
    by_kind: HashMap<SchemaKind, RoaringBitmap>,
    all: RoaringBitmap,
    next_doc: u32,
    free: Vec<DocId>,
}

impl IndexState {
    fn allocate(&mut self) -> DocId {
        if let Some(doc) = self.free.pop() {
            return doc;
        }
        let doc = DocId::new(self.next_doc);
        self.next_doc += 1;
        doc
    }

    fn insert(&mut self, entry: Arc<IndexEntry>) {
        self.remove(&entry.identifier);

        let doc = self.allocate();
        for (property, values) in &entry.values {
            for value in values {
                if let IndexValue::Text(text) = value {
                    self.text_postings
                        .entry(property.clone())
                        .or_default()
                        .entry(text.clone())
                        .or_default()
                        .insert(doc.value());
                }
            }
        }
        self.by_kind.entry(entry.kind).or_default().insert(doc.value());
        self.all.insert(doc.value());
        self.slots.insert(entry.identifier.clone(), doc);
        self.entries.insert(doc, entry);
    }

    fn remove(&mut self, identifier: &str) -> Option<Arc<IndexEntry>> {
        let doc = self.slots.remove(identifier)?;
        let entry = self.entries.remove(&doc)?;

        for (property, values) in &entry.values {
            let Some(postings) = self.text_postings.get_mut(property) else {
                continue;
            };
            for value in values {
                if let IndexValue::Text(text) = value {
                    if let Some(bitmap) = postings.get_mut(text) {
                        bitmap.remove(doc.value());
                        if bitmap.is_empty() {
                            postings.remove(text);
                        }
                    }
                }
            }
            if postings.is_empty() {
                self.text_postings.remove(property);
            }
        }
        if let Some(bitmap) = self.by_kind.get_mut(&entry.kind) {
            bitmap.remove(doc.value());
        }
        self.all.remove(doc.value());
        self.free.push(doc);
        Some(entry)
    }

    fn candidates(&self, kinds: &[SchemaKind]) -> RoaringBitmap {
        if kinds.is_empty() {
            return self.all.clone();
        }
        kinds
            .iter()
            .filter_map(|kind| self.by_kind.get(kind))
            .fold(RoaringBitmap::new(), |acc, bitmap| acc | bitmap)
    }

    /// Records of `domain` satisfying the predicate.
    fn bitmap(&self, matcher: &PredicateMatcher, predicate: &Predicate, domain: &RoaringBitmap) -> RoaringBitmap {
        match predicate {
            Predicate::All => domain.clone(),
            Predicate::And(children) => {
                let mut acc = domain.clone();
                for child in children {
                    if acc.is_empty() {
                        break;
                    }
                    acc = self.bitmap(matcher, child, &acc);
                }
                acc
            }
            Predicate::Or(children) => children
                .iter()
                .fold(RoaringBitmap::new(), |acc, child| acc | self.bitmap(matcher, child, domain)),
            Predicate::Not(child) => domain - self.bitmap(matcher, child, domain),
            Predicate::Compare {
                property,
                op: CompareOp::Eq,
                literal: IndexValue::Text(text),
            } => match self.text_postings.get(property).and_then(|postings| postings.get(text)) {
                Some(bitmap) => bitmap & domain,
                None => RoaringBitmap::new(),
            },
            leaf => domain
                .iter()
                .filter(|doc| {
                    self.entries
                        .get(&DocId::new(*doc))
                        .is_some_and(|entry| matcher.matches(entry, leaf))
                })
                .collect(),
        }
    }
}

impl CatalogIndex {
    pub fn new() -> Self {
        CatalogIndex {
            state: RwLock::new(IndexState::default()),
            generation: AtomicU64::new(0),
            matcher: PredicateMatcher::new(),
        }
    }

    /// Insert or replace the entry of `entry.identifier`.
    pub fn publish(&self, entry: Arc<IndexEntry>) {
        let mut state = self.state.write();
        debug!(identifier = %entry.identifier, properties = entry.values.len(), "publishing index entry");
        state.insert(entry);
        self.bump();
    }

    /// Replace the entry of a record whose identifier changed.
    pub fn publish_rekeyed(&self, old_identifier: &str, entry: Arc<IndexEntry>) {
        let mut state = self.state.write();
        state.remove(old_identifier);
        debug!(from = %old_identifier, to = %entry.identifier, "re-keying index entry");
        state.insert(entry);
        self.bump();
    }

    pub fn publish_batch(&self, entries: Vec<Arc<IndexEntry>>) {
        let mut state = self.state.write();
        let count = entries.len();
        for entry in entries {
            state.insert(entry);
        }
        debug!(count, "published index batch");
        self.bump();
    }

    pub fn remove(&self, identifier: &str) -> Option<Arc<IndexEntry>> {
        let mut state = self.state.write();
        let removed = state.remove(identifier);
        if removed.is_some() {
            debug!(identifier = %identifier, "removed index entry");
            self.bump();
        }
        removed
    }

    /// Swap the whole content for `entries` in one step.
    pub fn rebuild(&self, entries: Vec<Arc<IndexEntry>>) {
        let mut fresh = IndexState::default();
        for entry in entries {
            fresh.insert(entry);
        }
        *self.state.write() = fresh;
        self.bump();
    }

    /// Entries of the records matching `predicate`, restricted to `kinds`
    /// when it is not empty, ordered by identifier.
    pub fn evaluate(&self, predicate: &Predicate, kinds: &[SchemaKind]) -> Vec<Arc<IndexEntry>> {
        self.evaluate_versioned(predicate, kinds).1
    }

    /// Like [`CatalogIndex::evaluate`], also returning the generation the
    /// result was computed at.
    pub fn evaluate_versioned(&self, predicate: &Predicate, kinds: &[SchemaKind]) -> (u64, Vec<Arc<IndexEntry>>) {
        let state = self.state.read();
        let generation = self.generation();
        let domain = state.candidates(kinds);
        let hits = state.bitmap(&self.matcher, predicate, &domain);

        let mut entries: Vec<Arc<IndexEntry>> = hits
            .iter()
            .filter_map(|doc| state.entries.get(&DocId::new(doc)).cloned())
            .collect();
        entries.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        (generation, entries)
    }

    pub fn entry(&self, identifier: &str) -> Option<Arc<IndexEntry>> {
        let state = self.state.read();
        let doc = state.slots.get(identifier)?;
        state.entries.get(doc).cloned()
    }

    /// Sorted distinct values of a property across all records.
    pub fn domain(&self, property: &str) -> Vec<IndexValue> {
        let state = self.state.read();
        let mut values: Vec<IndexValue> = state
            .entries
            .values()
            .flat_map(|entry| entry.values(property).iter().cloned())
            .collect();
        values.sort_by(|a, b| a.total_cmp(b));
        values.dedup();
        values
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct properties holding at least one value.
    pub fn property_count(&self) -> usize {
        let state = self.state.read();
        state
            .entries
            .values()
            .flat_map(|entry| entry.values.keys())
            .collect::<BTreeSet<_>>()
            .len()
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

impl Default for CatalogIndex {
    fn default() -> Self {
        Self::new()
    }
}
