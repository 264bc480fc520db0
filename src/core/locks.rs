use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Exclusive lock per record identifier.
///
/// Held across navigate, apply and re-index so two writers never interleave
/// on the same record. Entries are dropped once nobody holds or waits on them.
pub struct RecordLocks {
    table: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RecordLocks {
    pub fn new() -> Self {
        RecordLocks {
            table: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_lock<T>(&self, identifier: &str, f: impl FnOnce() -> T) -> T {
        let lock = {
            let mut table = self.table.lock();
            Arc::clone(table.entry(identifier.to_string()).or_default())
        };

        let result = {
            let _guard = lock.lock();
            f()
        };

        let mut table = self.table.lock();
        // the table and this call are the only owners left
        if Arc::strong_count(&lock) == 2 {
            table.remove(identifier);
        }
        result
    }

    /// Identifiers currently locked or waited on.
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RecordLocks {
    fn default() -> Self {
        Self::new()
    }
}
