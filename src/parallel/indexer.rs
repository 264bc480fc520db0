use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;

use crate::core::error::{Error, ErrorKind, Result};
use crate::index::entry::IndexEntry;
use crate::query::queryable::QueryableRegistry;
use crate::tree::record::RecordTree;

/// Derives index entries for many records at once. The pool lives as long
/// as the indexer and serves every bulk load and rebuild.
pub struct ParallelIndexer {
    pub workers: usize,
    pub batch_size: usize,
    pub progress: Arc<AtomicUsize>,
    pool: ThreadPool,
}

impl ParallelIndexer {
    /// `workers == 0` lets rayon pick the thread count.
    pub fn new(workers: usize, batch_size: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("catalog-indexer-{}", i))
            .build()
            .map_err(|e| Error::new(ErrorKind::InvalidState, format!("cannot start indexing pool: {}", e)))?;

        Ok(ParallelIndexer {
            workers: pool.current_num_threads(),
            batch_size: batch_size.max(1),
            progress: Arc::new(AtomicUsize::new(0)),
            pool,
        })
    }

    pub fn get_progress(&self) -> usize {
        self.progress.load(Ordering::Relaxed)
    }

    /// Entries come back in input order.
    pub fn derive_entries(
        &self,
        records: &[(String, Box<dyn RecordTree>)],
        registry: &QueryableRegistry,
    ) -> Vec<IndexEntry> {
        self.progress.store(0, Ordering::Relaxed);
        let total = records.len();

        let entries: Vec<IndexEntry> = self.pool.install(|| {
            records
                .par_chunks(self.batch_size)
                .flat_map_iter(|batch| {
                    let derived: Vec<IndexEntry> = batch
                        .iter()
                        .map(|(identifier, tree)| IndexEntry::derive(identifier, tree.as_ref(), registry))
                        .collect();
                    let done = self.progress.fetch_add(derived.len(), Ordering::Relaxed) + derived.len();
                    info!(done, total, "indexing progress");
                    derived
                })
                .collect()
        });

        info!(records = total, workers = self.workers, "bulk indexing finished");
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::raw::RawRecord;
    use serde_json::json;

    #[test]
    fn entries_follow_input_order() {
        let records: Vec<(String, Box<dyn RecordTree>)> = (0..25)
            .map(|i| {
                let id = format!("rec-{:02}", i);
                let tree = RawRecord::from_json(&json!({"identifier": &id, "title": "t"})).unwrap();
                (id, Box::new(tree) as Box<dyn RecordTree>)
            })
            .collect();

        let indexer = ParallelIndexer::new(2, 4).unwrap();
        let entries = indexer.derive_entries(&records, &QueryableRegistry::standard());

        assert_eq!(entries.len(), 25);
        assert_eq!(indexer.get_progress(), 25);
        for (entry, (id, _)) in entries.iter().zip(&records) {
            assert_eq!(&entry.identifier, id);
        }
    }

    #[test]
    fn one_pool_serves_repeated_runs() {
        let records = |count: usize| -> Vec<(String, Box<dyn RecordTree>)> {
            (0..count)
                .map(|i| {
                    let id = format!("run-{}", i);
                    let tree = RawRecord::from_json(&json!({"identifier": &id})).unwrap();
                    (id, Box::new(tree) as Box<dyn RecordTree>)
                })
                .collect()
        };
        let indexer = ParallelIndexer::new(3, 2).unwrap();
        let registry = QueryableRegistry::standard();

        assert_eq!(indexer.derive_entries(&records(7), &registry).len(), 7);
        assert_eq!(indexer.derive_entries(&records(3), &registry).len(), 3);
        assert_eq!(indexer.get_progress(), 3);
        assert_eq!(indexer.workers, 3);
    }
}
