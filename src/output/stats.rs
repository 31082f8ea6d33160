//! Statistics over the store document
//!
//! This module provides functionality for extracting and displaying
//! per-bucket statistics from the storage layer.

use crate::storage::{Storage, StoreDocument};
use crate::HarvestError;
use std::collections::BTreeMap;
use url::Url;

/// Statistics for one bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketStatistics {
    pub name: String,

    /// Number of items in the bucket
    pub items: usize,

    /// Items carrying a display title
    pub titled: usize,

    /// Item count per asset host
    pub hosts: BTreeMap<String, usize>,
}

/// Store statistics summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStatistics {
    /// Where the store lives
    pub location: String,

    /// Sum of all bucket sizes
    pub total_items: usize,

    /// Buckets sorted by size, largest first
    pub buckets: Vec<BucketStatistics>,
}

/// Loads statistics from storage
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - The store could not be read
pub fn load_statistics(storage: &dyn Storage) -> Result<StoreStatistics, HarvestError> {
    let document = storage.load()?;
    Ok(statistics_for(&document, storage.describe()))
}

/// Computes statistics for an already loaded document
pub fn statistics_for(document: &StoreDocument, location: String) -> StoreStatistics {
    let mut buckets: Vec<BucketStatistics> = document
        .buckets()
        .iter()
        .map(|bucket| {
            let mut hosts = BTreeMap::new();
            for item in &bucket.items {
                let host = Url::parse(&item.url)
                    .ok()
                    .and_then(|u| u.host_str().map(str::to_string))
                    .unwrap_or_else(|| "(invalid)".to_string());
                *hosts.entry(host).or_insert(0) += 1;
            }

            BucketStatistics {
                name: bucket.name.clone(),
                items: bucket.items.len(),
                titled: bucket.items.iter().filter(|i| i.title.is_some()).count(),
                hosts,
            }
        })
        .collect();

    buckets.sort_by(|a, b| b.items.cmp(&a.items).then_with(|| a.name.cmp(&b.name)));

    StoreStatistics {
        location,
        total_items: buckets.iter().map(|b| b.items).sum(),
        buckets,
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Store Statistics ===\n");

    println!("Overview:");
    println!("  Store: {}", stats.location);
    println!("  Buckets: {}", stats.buckets.len());
    println!("  Total items: {}", stats.total_items);
    println!();

    if stats.buckets.is_empty() {
        println!("No buckets yet.");
        return;
    }

    println!("Buckets:");
    for bucket in &stats.buckets {
        let percentage = if stats.total_items > 0 {
            (bucket.items as f64 / stats.total_items as f64) * 100.0
        } else {
            0.0
        };
        println!(
            "  {}: {} ({:.1}%), {} titled",
            bucket.name, bucket.items, percentage, bucket.titled
        );

        let mut hosts: Vec<_> = bucket.hosts.iter().collect();
        hosts.sort_by(|a, b| b.1.cmp(a.1));
        for (host, count) in hosts {
            println!("    - {}: {}", host, count);
        }
    }
}
