//! Output module for run snapshots and reports
//!
//! This module handles:
//! - Writing a per-run JSON snapshot of the items a crawl resolved
//! - Printing the crawl report
//! - Store statistics

pub mod stats;

pub use stats::{load_statistics, print_statistics, statistics_for, BucketStatistics, StoreStatistics};

use crate::crawler::CrawlReport;
use crate::storage::Item;
use crate::HarvestError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Number of items listed at the end of a crawl report
const REPORT_PREVIEW: usize = 5;

/// What one crawl found, independent of what the store already had
#[derive(Debug, Serialize)]
pub struct Snapshot<'a> {
    pub bucket: &'a str,
    pub start: &'a str,
    pub crawled_at: DateTime<Utc>,
    pub pages_visited: u32,
    pub items: &'a [Item],
}

/// Writes a snapshot as `<dir>/<bucket-slug>-<timestamp>.json`
///
/// The timestamp has millisecond precision. An existing file is never
/// overwritten; a `-2`, `-3`, ... suffix is added instead.
///
/// # Returns
///
/// * `Ok(PathBuf)` - Path of the written file
/// * `Err(HarvestError)` - Directory creation, serialization or write failed
pub fn write_snapshot(dir: &Path, snapshot: &Snapshot<'_>) -> Result<PathBuf, HarvestError> {
    fs::create_dir_all(dir)?;

    let stem = format!(
        "{}-{}",
        bucket_slug(snapshot.bucket),
        snapshot.crawled_at.format("%Y%m%d-%H%M%S-%3f")
    );
    let json = serde_json::to_string_pretty(snapshot)?;

    let mut attempt = 1u32;
    loop {
        let path = if attempt == 1 {
            dir.join(format!("{}.json", stem))
        } else {
            dir.join(format!("{}-{}.json", stem, attempt))
        };

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(json.as_bytes())?;
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Lowercase slug safe for file names
///
/// Letters and digits of any script are kept; every other run of characters
/// becomes one `-`. `"Phim Âu Mỹ"` becomes `"phim-âu-mỹ"`; an all-symbol name
/// becomes `"bucket"`.
pub fn bucket_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }

    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "bucket".to_string()
    } else {
        slug.to_string()
    }
}

/// Prints a crawl report to stdout
pub fn print_report(report: &CrawlReport) {
    let elapsed = report.finished_at - report.started_at;

    println!("=== Crawl '{}' ===", report.bucket);
    println!("  Start: {}", report.start);
    println!("  Pages visited: {}", report.pages_visited);
    println!("  Stopped: {}", report.termination);
    println!(
        "  Items: {} found, {} new, {} unresolved",
        report.items_found(),
        report.items_added(),
        report.items_failed
    );
    match report.merge {
        Some(merge) => println!("  Bucket total: {} (was {})", merge.total, merge.existing),
        None => println!("  Bucket total: unchanged"),
    }
    if let Some(path) = &report.snapshot {
        println!("  Snapshot: {}", path.display());
    }
    println!("  Elapsed: {}s", elapsed.num_seconds());

    if !report.items.is_empty() {
        println!();
        println!("First {} item(s):", report.items.len().min(REPORT_PREVIEW));
        for item in report.items.iter().take(REPORT_PREVIEW) {
            match &item.title {
                Some(title) => println!("  - {} ({})", item.url, title),
                None => println!("  - {}", item.url),
            }
        }
    }
}
