use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

use super::models::FileRecord;

/// In-memory index of known files, keyed by stored name.
///
/// Listing order is insertion order, oldest first. Every method takes the
/// internal lock once, so each call is atomic with respect to the others.
/// Contents live for the lifetime of the process only.
#[derive(Default)]
pub struct Registry {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    next_seq: u64,
    by_seq: BTreeMap<u64, FileRecord>,
    index: HashMap<String, u64>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add records in the given order.
    /// A record whose stored name is already present replaces the old entry
    /// and moves to the end.
    pub fn append(&self, records: Vec<FileRecord>) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        for record in records {
            if let Some(old_seq) = inner.index.remove(&record.stored_name) {
                tracing::warn!(stored_name = %record.stored_name, "Replacing duplicate registry entry");
                inner.by_seq.remove(&old_seq);
            }
            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner.index.insert(record.stored_name.clone(), seq);
            inner.by_seq.insert(seq, record);
        }
    }

    /// Snapshot of all records, oldest first.
    pub fn list(&self) -> Vec<FileRecord> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.by_seq.values().cloned().collect()
    }

    pub fn find_by_stored_name(&self, name: &str) -> Option<FileRecord> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .index
            .get(name)
            .and_then(|seq| inner.by_seq.get(seq))
            .cloned()
    }

    /// Remove and return the record for `name`.
    pub fn remove(&self, name: &str) -> Option<FileRecord> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let seq = inner.index.remove(name)?;
        inner.by_seq.remove(&seq)
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
