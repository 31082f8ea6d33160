//! File-backed store
//!
//! The store is a single document read and rewritten in full on every merge.
//! Writes go to a sibling temp file which is synced and renamed over the
//! original, so a crash never leaves a half-written document behind. The
//! read-modify-write runs under an exclusive advisory lock on a sibling
//! `.lock` file, which serializes merges from separate processes on one host.
//!
//! Two on-disk formats are supported:
//! - plain JSON (any extension other than `.js`)
//! - a script wrapper, `window.<VAR> = {...};`, for pages that load the
//!   store with a `<script>` tag
//!
//! Inside either format the buckets are placed according to the store's
//! [`StoreLayout`].

use crate::storage::{
    Item, MergeOutcome, Storage, StorageError, StorageResult, StoreDocument, StoreLayout,
};
use fs2::FileExt;
use regex::Regex;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const SCRIPT_HEADER: &str = "// Auto-generated by asset-harvester; do not edit by hand";

/// On-disk encoding of the store document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Plain JSON document
    Json,
    /// `window.<variable> = <json>;`
    Script { variable: String },
}

impl DocumentFormat {
    /// Picks the format from the file extension
    pub fn for_path(path: &Path, js_variable: &str) -> Self {
        let is_script = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("js"));

        if is_script {
            Self::Script {
                variable: js_variable.to_string(),
            }
        } else {
            Self::Json
        }
    }
}

/// Store persisted as one file
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    format: DocumentFormat,
    layout: StoreLayout,
}

impl FileStore {
    /// Creates a handle with the default layout; nothing is touched on disk
    /// until the first merge
    pub fn new(path: impl Into<PathBuf>, js_variable: &str) -> Self {
        let path = path.into();
        let format = DocumentFormat::for_path(&path, js_variable);
        Self {
            path,
            format,
            layout: StoreLayout::default(),
        }
    }

    pub fn with_layout(mut self, layout: StoreLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> &DocumentFormat {
        &self.format
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    fn empty(&self) -> StoreDocument {
        StoreDocument::new(self.layout.clone())
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn decode(&self, content: &str) -> StorageResult<StoreDocument> {
        let json = match &self.format {
            DocumentFormat::Json => content,
            DocumentFormat::Script { .. } => extract_script_object(content).ok_or_else(|| {
                StorageError::Malformed {
                    path: self.path.clone(),
                    message: "no `window.<name> = {...};` assignment found".to_string(),
                }
            })?,
        };

        if json.trim().is_empty() {
            return Ok(self.empty());
        }

        serde_json::from_str::<serde_json::Value>(json)
            .and_then(|value| StoreDocument::from_value(value, self.layout.clone()))
            .map_err(|source| StorageError::Json {
                path: self.path.clone(),
                source,
            })
    }

    fn encode(&self, document: &StoreDocument) -> StorageResult<String> {
        let json = serde_json::to_string_pretty(document).map_err(|source| StorageError::Json {
            path: self.path.clone(),
            source,
        })?;

        Ok(match &self.format {
            DocumentFormat::Json => format!("{}\n", json),
            DocumentFormat::Script { variable } => {
                format!("{}\nwindow.{} = {};\n", SCRIPT_HEADER, variable, json)
            }
        })
    }

    /// Takes the exclusive lock; released when the returned handle drops
    fn lock(&self) -> StorageResult<fs::File> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let lock_path = sibling_path(&self.path, "lock");
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&lock_path)
            .map_err(|e| self.io_error(e))?;

        lock.lock_exclusive().map_err(|source| StorageError::Lock {
            path: lock_path,
            source,
        })?;

        Ok(lock)
    }

    /// Writes the document to a temp file and renames it into place
    fn write(&self, document: &StoreDocument) -> StorageResult<()> {
        let content = self.encode(document)?;
        let tmp_path = sibling_path(&self.path, "tmp");

        let result = (|| -> std::io::Result<()> {
            let tmp = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp_path)?;
            let mut buf = BufWriter::new(tmp);
            buf.write_all(content.as_bytes())?;
            buf.flush()?;
            let file = buf.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
            drop(file);
            fs::rename(&tmp_path, &self.path)
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp_path);
            return Err(self.io_error(e));
        }

        Ok(())
    }
}

impl Storage for FileStore {
    fn load(&self) -> StorageResult<StoreDocument> {
        match fs::read_to_string(&self.path) {
            Ok(content) => self.decode(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(self.empty()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn merge_bucket(&self, name: &str, items: &[Item]) -> StorageResult<MergeOutcome> {
        let _lock = self.lock()?;

        let mut document = self.load()?;
        let outcome = document.merge_bucket(name, items);
        self.write(&document)?;

        tracing::info!(
            "Bucket '{}': existing {}, new {}, total {} ({})",
            name,
            outcome.existing,
            outcome.added,
            outcome.total,
            self.path.display()
        );

        Ok(outcome)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// `harvest.json` -> `harvest.json.lock`
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Returns the object literal of a `window.X = {...};` script
fn extract_script_object(content: &str) -> Option<&str> {
    static ASSIGNMENT: OnceLock<Regex> = OnceLock::new();
    let pattern = ASSIGNMENT.get_or_init(|| {
        Regex::new(r"(?s)window\.[A-Za-z_$][A-Za-z0-9_$]*\s*=\s*(\{.*\})\s*;")
            .expect("assignment pattern is valid")
    });
    pattern
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::BucketLayout;
    use tempfile::TempDir;

    fn items(urls: &[&str]) -> Vec<Item> {
        urls.iter().map(|u| Item::new(*u)).collect()
    }

    fn bucket_urls(store: &FileStore, name: &str) -> Vec<String> {
        store
            .load()
            .unwrap()
            .bucket(name)
            .iter()
            .map(|i| i.url.clone())
            .collect()
    }

    #[test]
    fn test_store_created_lazily() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("harvest.json");
        let store = FileStore::new(&path, "HARVEST_DATA");

        assert_eq!(store.load().unwrap(), StoreDocument::default());
        assert!(!path.exists());

        store.merge_bucket("girl-xinh", &items(&["a"])).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_merge_into_existing_bucket() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("harvest.json"), "HARVEST_DATA");

        store.merge_bucket("tag", &items(&["b", "c"])).unwrap();
        let outcome = store.merge_bucket("tag", &items(&["a", "b"])).unwrap();

        assert_eq!(outcome.existing, 2);
        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.total, 3);
        assert_eq!(bucket_urls(&store, "tag"), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_sibling_buckets_untouched() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("harvest.json"), "HARVEST_DATA");

        store.merge_bucket("kuzu", &items(&["k1", "k2"])).unwrap();
        store.merge_bucket("QMH", &items(&["q1"])).unwrap();

        assert_eq!(bucket_urls(&store, "kuzu"), vec!["k1", "k2"]);
        assert_eq!(store.load().unwrap().total(), 3);
    }

    #[test]
    fn test_script_format_round_trip_through_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("videos-data.js");
        let store = FileStore::new(&path, "VIDEOS_DATA");
        assert_eq!(
            store.format(),
            &DocumentFormat::Script {
                variable: "VIDEOS_DATA".to_string()
            }
        );

        let clip = Item::new("https://cdn.save.moe/v/a.mp4").with_title(Some("Clip".to_string()));
        store.merge_bucket("Clip Viet", &[clip.clone()]).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with(SCRIPT_HEADER));
        assert!(raw.contains("window.VIDEOS_DATA = {"));
        assert!(raw.trim_end().ends_with("};"));

        assert_eq!(store.load().unwrap().bucket("Clip Viet"), &[clip]);
    }

    /// `window.TAGS_DATA` as written by the gallery page
    fn tags_data_layout() -> StoreLayout {
        StoreLayout {
            buckets: BucketLayout::Map {
                key: "album_items".to_string(),
            },
            name_list_key: Some("tags".to_string()),
            index_key: Some("items".to_string()),
            write_total: false,
        }
    }

    #[test]
    fn test_reads_foreign_script_and_keeps_its_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tags-data.js");
        fs::write(
            &path,
            concat!(
                "// Auto-generated by indexlocal.html\n",
                "window.TAGS_DATA = {\"tags\": [\"girl-xinh\"], ",
                "\"items\": {\"girl-xinh\": [{\"id\": 7}]}, ",
                "\"album_items\": {\"girl-xinh\": [\"https://cdn.anh.moe/f/a.jpeg\"]}};\n"
            ),
        )
        .unwrap();

        let store = FileStore::new(&path, "TAGS_DATA").with_layout(tags_data_layout());
        let outcome = store
            .merge_bucket("girl-xinh", &items(&["https://cdn.anh.moe/f/a.jpeg"]))
            .unwrap();
        assert_eq!((outcome.existing, outcome.added), (1, 0));

        store
            .merge_bucket("kuzu", &items(&["https://cdn.anh.moe/f/k.jpeg"]))
            .unwrap();

        let doc = store.load().unwrap();
        assert_eq!(
            doc.other().get("tags"),
            Some(&serde_json::json!(["girl-xinh", "kuzu"]))
        );
        assert_eq!(
            doc.other().get("items"),
            Some(&serde_json::json!({"girl-xinh": [{"id": 7}], "kuzu": []}))
        );
        assert_eq!(bucket_urls(&store, "kuzu"), vec!["https://cdn.anh.moe/f/k.jpeg"]);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("window.TAGS_DATA = {"));
        assert!(!raw.contains("\"total\""));
        assert!(!raw.contains("\"buckets\""));
    }

    #[test]
    fn test_rewrite_keeps_unknown_item_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("harvest.json");
        fs::write(
            &path,
            r#"{"buckets":{"t":[{"url":"u1","title":"A","thumb":"x.jpg"}]}}"#,
        )
        .unwrap();

        let store = FileStore::new(&path, "X");
        store.merge_bucket("t", &items(&["u2"])).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            value["buckets"]["t"],
            serde_json::json!([{"url": "u1", "title": "A", "thumb": "x.jpg"}, "u2"])
        );
        assert_eq!(value["total"], serde_json::json!(2));
    }

    #[test]
    fn test_threads_layout_through_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("videos.json");
        fs::write(
            &path,
            r#"{"threads":[{"title":"Clip Viet","url":"https://example.com/t/1","videos":["https://cdn.save.moe/v/a.mp4"]}],"total":1}"#,
        )
        .unwrap();

        let layout = StoreLayout {
            buckets: BucketLayout::List {
                key: "threads".to_string(),
                name_field: "title".to_string(),
                items_field: "videos".to_string(),
            },
            ..StoreLayout::default()
        };
        let store = FileStore::new(&path, "X").with_layout(layout);
        store
            .merge_bucket("Phim", &items(&["https://cdn.save.moe/v/p.mp4"]))
            .unwrap();
        store
            .merge_bucket("Clip Viet", &items(&["https://cdn.save.moe/v/a.mp4"]))
            .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["threads"][0]["title"], "Phim");
        assert_eq!(value["threads"][1]["url"], "https://example.com/t/1");
        assert_eq!(value["threads"][1]["videos"].as_array().map(Vec::len), Some(1));
        assert_eq!(value["total"], serde_json::json!(2));
    }

    #[test]
    fn test_malformed_script_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.js");
        fs::write(&path, "console.log('nope');").unwrap();

        let store = FileStore::new(&path, "X");
        assert!(matches!(
            store.merge_bucket("a", &items(&["u"])).unwrap_err(),
            StorageError::Malformed { .. }
        ));
        // the original file is left as it was
        assert_eq!(fs::read_to_string(&path).unwrap(), "console.log('nope');");
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("harvest.json");
        fs::write(&path, "{not json").unwrap();

        let store = FileStore::new(&path, "X");
        assert!(matches!(
            store.load().unwrap_err(),
            StorageError::Json { .. }
        ));
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("harvest.json");
        let store = FileStore::new(&path, "X");
        store.merge_bucket("a", &items(&["u"])).unwrap();

        assert!(!sibling_path(&path, "tmp").exists());
    }
}
