//! In-memory device registry.
//!
//! One registry is owned per adapter and shared with it by `Arc`. All
//! operations take a single exclusive lock for their duration; readers and
//! writers are fully serialized. The lock is never held across I/O, so
//! callers must finish any network work before calling in.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::device::DeviceRecord;

/// Concurrency-safe mapping from device id to [`DeviceRecord`].
///
/// At most one record per id; writes are last-write-wins.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    records: Mutex<HashMap<String, DeviceRecord>>,
}

impl DeviceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites whatever is stored for `id`. No validation of the payload.
    pub fn set(&self, id: impl Into<String>, record: DeviceRecord) {
        self.records.lock().insert(id.into(), record);
    }

    /// Exact-match lookup.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<DeviceRecord> {
        self.records.lock().get(id).cloned()
    }

    /// Returns a copy of every entry.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(String, DeviceRecord)> {
        self.snapshot_excluding(|_| false)
    }

    /// Returns a copy of every entry whose id does not match `exclude`.
    ///
    /// Used to hide reserved namespaces (e.g. broker-internal topics).
    #[must_use]
    pub fn snapshot_excluding<F>(&self, exclude: F) -> Vec<(String, DeviceRecord)>
    where
        F: Fn(&str) -> bool,
    {
        self.records
            .lock()
            .iter()
            .filter(|(id, _)| !exclude(id.as_str()))
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect()
    }

    /// Atomically swaps the whole mapping for `records`.
    ///
    /// Returns the number of records now stored.
    pub fn replace_all<I>(&self, records: I) -> usize
    where
        I: IntoIterator<Item = (String, DeviceRecord)>,
    {
        // Build outside the lock; only the swap is serialized.
        let fresh: HashMap<String, DeviceRecord> = records.into_iter().collect();
        let count = fresh.len();
        *self.records.lock() = fresh;
        count
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}
