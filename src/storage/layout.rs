use crate::config::{BucketLayoutKind, StoreConfig};

/// Where buckets live inside the store document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketLayout {
    /// `{"<key>": {"<name>": [items]}}`
    Map { key: String },

    /// `{"<key>": [{"<name_field>": "<name>", "<items_field>": [items], ...}]}`
    ///
    /// New buckets are inserted at the front of the list.
    List {
        key: String,
        name_field: String,
        items_field: String,
    },
}

impl BucketLayout {
    /// Top-level key holding the bucket collection
    pub fn key(&self) -> &str {
        match self {
            Self::Map { key } | Self::List { key, .. } => key,
        }
    }
}

/// The document schema a store reads and writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    pub buckets: BucketLayout,

    /// Top-level array every merged bucket name is appended to
    pub name_list_key: Option<String>,

    /// Top-level object every merged bucket name gets an empty entry in
    pub index_key: Option<String>,

    /// Rewrite the top-level `total` count on every merge
    pub write_total: bool,
}

impl StoreLayout {
    pub fn from_config(config: &StoreConfig) -> Self {
        let key = config.bucket_key().to_string();
        let buckets = match config.layout {
            BucketLayoutKind::Map => BucketLayout::Map { key },
            BucketLayoutKind::List => BucketLayout::List {
                key,
                name_field: config.name_field.clone(),
                items_field: config.items_field.clone(),
            },
        };

        Self {
            buckets,
            name_list_key: config.name_list_key.clone(),
            index_key: config.index_key.clone(),
            write_total: config.write_total,
        }
    }
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self {
            buckets: BucketLayout::Map {
                key: "buckets".to_string(),
            },
            name_list_key: None,
            index_key: None,
            write_total: true,
        }
    }
}
