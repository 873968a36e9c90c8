use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{MetadataError, MetadataValue};

/// Metadata key holding the scan's source path
pub const FILEPATH_KEY: &str = "Filepath";

/// Metadata key holding the source file's modification time
pub const LAST_MODIFIED_KEY: &str = "File Last Modified";

/// Metadata key holding the run counter assigned during discovery
pub const RUN_ID_KEY: &str = "Run ID";

/// Key-value description of a scan's acquisition context.
///
/// Built once by the assembler from the file path, header lines and
/// discovery context. Scans only hand out shared references to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanMetadata {
    entries: BTreeMap<String, MetadataValue>,
}

impl ScanMetadata {
    /// Create empty metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the previous one for this key
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<MetadataValue>,
    ) -> Option<MetadataValue> {
        self.entries.insert(key.into(), value.into())
    }

    /// Look up a value by key
    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.entries.get(key)
    }

    /// Whether a key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterate over entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate over keys in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy every entry of `other` into `self`, overwriting shared keys
    pub fn extend_from(&mut self, other: &ScanMetadata) {
        for (k, v) in &other.entries {
            self.entries.insert(k.clone(), v.clone());
        }
    }

    /// Serialize to a JSON object
    pub fn to_json(&self) -> Result<String, MetadataError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from a JSON object
    pub fn from_json(json: &str) -> Result<Self, MetadataError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl<K: Into<String>, V: Into<MetadataValue>> FromIterator<(K, V)> for ScanMetadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
