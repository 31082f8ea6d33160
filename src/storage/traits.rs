//! Storage traits and error types
//!
//! This module defines the trait interface for store backends and
//! associated error types.

use crate::storage::{Item, MergeOutcome, StoreDocument};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
///
/// Any of these is fatal to the merge call that raised it. The caller still
/// holds the items it tried to merge and may retry.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not lock {path}: {source}")]
    Lock {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Malformed store document {path}: {message}")]
    Malformed { path: PathBuf, message: String },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A durable collection of named buckets
///
/// Implementations perform the whole read-modify-write inside
/// `merge_bucket`; callers never hold a document across calls.
pub trait Storage {
    /// Reads the full store; a store that was never written is empty
    fn load(&self) -> StorageResult<StoreDocument>;

    /// Appends the novel items to a bucket and persists the full store
    ///
    /// # Returns
    ///
    /// Counts before and after the merge; `added` is the number of items
    /// that were not already present.
    fn merge_bucket(&self, name: &str, items: &[Item]) -> StorageResult<MergeOutcome>;

    /// Human-readable location used in logs
    fn describe(&self) -> String;
}
