use crate::storage::{Item, MergeOutcome, Storage, StorageResult, StoreDocument};
use std::sync::Mutex;

/// Store kept in process memory
///
/// Used for dry runs and tests; same merge semantics as [`crate::storage::FileStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Mutex<StoreDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, StoreDocument> {
        // A poisoned lock only means another merge panicked mid-way; the
        // document itself is still a valid value.
        self.document
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Storage for MemoryStore {
    fn load(&self) -> StorageResult<StoreDocument> {
        Ok(self.guard().clone())
    }

    fn merge_bucket(&self, name: &str, items: &[Item]) -> StorageResult<MergeOutcome> {
        Ok(self.guard().merge_bucket(name, items))
    }

    fn describe(&self) -> String {
        "in-memory store".to_string()
    }
}
