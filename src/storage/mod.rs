//! Storage module for persisting harvested items
//!
//! This module handles:
//! - The store document model (named buckets of ordered items)
//! - Store layouts placing those buckets inside the document
//! - The append-only, dedup-by-URL merge rule
//! - File persistence with atomic replace and an advisory lock
//! - An in-memory backend for dry runs and tests

mod document;
mod file_store;
mod layout;
mod memory;
mod traits;

pub use document::{merge_items, Bucket, Item, MergeOutcome, StoreDocument};
pub use file_store::{DocumentFormat, FileStore};
pub use layout::{BucketLayout, StoreLayout};
pub use memory::MemoryStore;
pub use traits::{Storage, StorageError, StorageResult};

use crate::config::StoreConfig;

/// Opens the file store described by the configuration
///
/// Nothing is created on disk until the first merge.
pub fn open_store(config: &StoreConfig) -> FileStore {
    FileStore::new(&config.path, &config.js_variable)
        .with_layout(StoreLayout::from_config(config))
}
