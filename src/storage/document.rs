//! Store document model and the merge rule
//!
//! The whole store is one document holding named buckets of ordered item
//! lists. Merging only ever appends novel items, so replaying the same crawl
//! is harmless. Where the buckets sit inside the document is decided by the
//! [`StoreLayout`]; every key the layout does not own is carried through
//! untouched.

use crate::storage::{BucketLayout, StoreLayout};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Key of the cross-bucket item count
const TOTAL_KEY: &str = "total";

/// One harvested asset
///
/// Identity is the canonical `url`; `title` and `extra` are advisory.
/// `extra` holds any other keys an item object carried on disk.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "ItemRepr")]
pub struct Item {
    pub url: String,
    pub title: Option<String>,
    pub extra: Map<String, Value>,
}

impl Item {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            extra: Map::new(),
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }
}

/// Items without metadata are written as bare URL strings, which is what
/// image buckets have always looked like on disk.
impl Serialize for Item {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.title.is_none() && self.extra.is_empty() {
            return serializer.serialize_str(&self.url);
        }

        let len = 1 + usize::from(self.title.is_some()) + self.extra.len();
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("url", &self.url)?;
        if let Some(title) = &self.title {
            map.serialize_entry("title", title)?;
        }
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ItemRepr {
    Bare(String),
    Full {
        url: String,
        #[serde(default)]
        title: Option<String>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

impl From<ItemRepr> for Item {
    fn from(repr: ItemRepr) -> Self {
        match repr {
            ItemRepr::Bare(url) => Item::new(url),
            ItemRepr::Full { url, title, extra } => Item { url, title, extra },
        }
    }
}

/// Result of merging items into a bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Items in the bucket before the merge
    pub existing: usize,
    /// Novel items appended
    pub added: usize,
    /// Items in the bucket after the merge
    pub total: usize,
}

/// Appends the items whose URL is not yet in `bucket`
///
/// Existing items are never reordered or removed. New items keep their
/// relative order; duplicates inside `new_items` are collapsed to the first.
/// Returns the number of items appended.
pub fn merge_items(bucket: &mut Vec<Item>, new_items: &[Item]) -> usize {
    let mut known: HashSet<String> = bucket.iter().map(|item| item.url.clone()).collect();
    let before = bucket.len();

    for item in new_items {
        if known.insert(item.url.clone()) {
            bucket.push(item.clone());
        }
    }

    bucket.len() - before
}

/// A named, ordered item list
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub name: String,
    pub items: Vec<Item>,
    /// Sibling keys of a list-layout entry (e.g. a thread's `url`)
    pub fields: Map<String, Value>,
}

impl Bucket {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            items: Vec::new(),
            fields: Map::new(),
        }
    }
}

/// The full persisted store
#[derive(Debug, Clone, PartialEq)]
pub struct StoreDocument {
    buckets: Vec<Bucket>,
    other: Map<String, Value>,
    layout: StoreLayout,
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self::new(StoreLayout::default())
    }
}

impl StoreDocument {
    /// An empty document
    pub fn new(layout: StoreLayout) -> Self {
        Self {
            buckets: Vec::new(),
            other: Map::new(),
            layout,
        }
    }

    /// Reads a document laid out as `layout`
    ///
    /// Keys outside the bucket collection are kept as they are. A missing
    /// or `null` collection reads as no buckets.
    pub fn from_value(value: Value, layout: StoreLayout) -> Result<Self, serde_json::Error> {
        use serde::de::Error;

        let mut other = match value {
            Value::Object(map) => map,
            _ => return Err(serde_json::Error::custom("store document must be a JSON object")),
        };

        let collection = other.shift_remove(layout.buckets.key()).unwrap_or(Value::Null);
        let buckets: Vec<Bucket> = match (&layout.buckets, collection) {
            (_, Value::Null) => Vec::new(),
            (BucketLayout::Map { .. }, Value::Object(map)) => map
                .into_iter()
                .map(|(name, items)| {
                    Ok(Bucket {
                        name,
                        items: serde_json::from_value(items)?,
                        fields: Map::new(),
                    })
                })
                .collect::<Result<_, serde_json::Error>>()?,
            (
                BucketLayout::List {
                    name_field,
                    items_field,
                    ..
                },
                Value::Array(entries),
            ) => entries
                .into_iter()
                .map(|entry| read_list_entry(entry, name_field, items_field))
                .collect::<Result<_, serde_json::Error>>()?,
            (BucketLayout::Map { key }, _) => {
                return Err(Error::custom(format!("`{}` must be an object", key)))
            }
            (BucketLayout::List { key, .. }, _) => {
                return Err(Error::custom(format!("`{}` must be an array", key)))
            }
        };

        if layout.write_total {
            other.shift_remove(TOTAL_KEY);
        }

        Ok(Self {
            buckets,
            other,
            layout,
        })
    }

    /// Builds the JSON value written to disk
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        let collection = match &self.layout.buckets {
            BucketLayout::Map { .. } => Value::Object(
                self.buckets
                    .iter()
                    .map(|bucket| Ok((bucket.name.clone(), serde_json::to_value(&bucket.items)?)))
                    .collect::<Result<Map<_, _>, serde_json::Error>>()?,
            ),
            BucketLayout::List {
                name_field,
                items_field,
                ..
            } => Value::Array(
                self.buckets
                    .iter()
                    .map(|bucket| {
                        let mut entry = Map::new();
                        entry.insert(name_field.clone(), Value::String(bucket.name.clone()));
                        entry.extend(bucket.fields.clone());
                        entry.insert(items_field.clone(), serde_json::to_value(&bucket.items)?);
                        Ok(Value::Object(entry))
                    })
                    .collect::<Result<_, serde_json::Error>>()?,
            ),
        };

        let mut root = Map::new();
        root.insert(self.layout.buckets.key().to_string(), collection);
        if self.layout.write_total {
            root.insert(TOTAL_KEY.to_string(), Value::from(self.total()));
        }
        for (key, value) in &self.other {
            if !root.contains_key(key) {
                root.insert(key.clone(), value.clone());
            }
        }

        Ok(Value::Object(root))
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// Keys written by other tools
    pub fn other(&self) -> &Map<String, Value> {
        &self.other
    }

    /// Items of a bucket, empty if the bucket does not exist
    pub fn bucket(&self, name: &str) -> &[Item] {
        self.buckets
            .iter()
            .find(|bucket| bucket.name == name)
            .map(|bucket| bucket.items.as_slice())
            .unwrap_or(&[])
    }

    /// Item count across all buckets
    pub fn total(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.items.len()).sum()
    }

    /// Merges items into a bucket, creating it if absent
    ///
    /// A new bucket goes to the end of a map layout and to the front of a
    /// list layout. The name is also registered under the layout's name
    /// list and index keys.
    pub fn merge_bucket(&mut self, name: &str, new_items: &[Item]) -> MergeOutcome {
        let position = match self.buckets.iter().position(|bucket| bucket.name == name) {
            Some(position) => position,
            None => match self.layout.buckets {
                BucketLayout::Map { .. } => {
                    self.buckets.push(Bucket::new(name));
                    self.buckets.len() - 1
                }
                BucketLayout::List { .. } => {
                    self.buckets.insert(0, Bucket::new(name));
                    0
                }
            },
        };

        let bucket = &mut self.buckets[position];
        let existing = bucket.items.len();
        let added = merge_items(&mut bucket.items, new_items);
        let total = bucket.items.len();

        self.register_name(name);

        MergeOutcome {
            existing,
            added,
            total,
        }
    }

    fn register_name(&mut self, name: &str) {
        if let Some(key) = &self.layout.name_list_key {
            match self
                .other
                .entry(key.clone())
                .or_insert_with(|| Value::Array(Vec::new()))
            {
                Value::Array(names) => {
                    if !names.iter().any(|n| n.as_str() == Some(name)) {
                        names.push(Value::String(name.to_string()));
                    }
                }
                _ => tracing::warn!("`{}` is not an array; bucket '{}' not listed", key, name),
            }
        }

        if let Some(key) = &self.layout.index_key {
            match self
                .other
                .entry(key.clone())
                .or_insert_with(|| Value::Object(Map::new()))
            {
                Value::Object(index) => {
                    index
                        .entry(name.to_string())
                        .or_insert_with(|| Value::Array(Vec::new()));
                }
                _ => tracing::warn!("`{}` is not an object; bucket '{}' not indexed", key, name),
            }
        }
    }
}

fn read_list_entry(
    entry: Value,
    name_field: &str,
    items_field: &str,
) -> Result<Bucket, serde_json::Error> {
    use serde::de::Error;

    let mut fields = match entry {
        Value::Object(map) => map,
        _ => return Err(Error::custom("bucket entries must be objects")),
    };

    let name = match fields.shift_remove(name_field) {
        Some(Value::String(name)) => name,
        _ => {
            return Err(Error::custom(format!(
                "bucket entry without a string `{}`",
                name_field
            )))
        }
    };

    let items = match fields.shift_remove(items_field) {
        None | Some(Value::Null) => Vec::new(),
        Some(items) => serde_json::from_value(items)?,
    };

    Ok(Bucket {
        name,
        items,
        fields,
    })
}

impl Serialize for StoreDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::Error;

        self.to_value()
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}
