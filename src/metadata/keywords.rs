use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{MetadataError, MetadataValue, ScanMetadata};
use crate::source::DEFAULT_PATTERN;

/// Tag a scan when a path element equals `token`.
///
/// e.g. `("warmup", "Warmup?", "Yes")`: `.._warmup_..` → `Warmup? = Yes`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagRule {
    /// Path element to match exactly
    pub token: String,
    /// Metadata key to set
    pub key: String,
    /// Value stored under `key` (type inferred)
    pub value: String,
}

/// Store the element(s) following `token` under `keys`, in order.
///
/// e.g. `("2Dscan", ["SecondScanType", "FirstScanType"])`:
/// `.._2Dscan_MirrorY_MirrorZ_..` → `SecondScanType = MirrorY`,
/// `FirstScanType = MirrorZ`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextElementRule {
    /// Path element to match exactly
    pub token: String,
    /// Keys for the following elements
    pub keys: Vec<String>,
}

/// Store the numeric remainder of an element containing `suffix`.
///
/// e.g. `("K", "SetTemperature")`: `.._30K_..` → `SetTemperature = 30`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuffixRule {
    /// Unit-like text to strip
    pub suffix: String,
    /// Metadata key to set
    pub key: String,
}

/// Rules for deriving metadata tags from a scan's file path.
///
/// The path is normalized by removing [`extension`](Self::extension) (only
/// when the file actually ends with it), turning path separators and spaces
/// into `_` and splitting on `_`. Each element is checked against all three
/// rule kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordRules {
    /// Exact-match flag rules
    pub flags: Vec<FlagRule>,
    /// Following-element rules
    pub next_element: Vec<NextElementRule>,
    /// Unit-suffix rules; the longest matching suffix wins
    pub suffixes: Vec<SuffixRule>,
    /// File extension removed before splitting, with its leading dot
    pub extension: String,
}

impl Default for KeywordRules {
    fn default() -> Self {
        Self {
            flags: Vec::new(),
            next_element: Vec::new(),
            suffixes: Vec::new(),
            extension: DEFAULT_PATTERN.to_string(),
        }
    }
}

impl KeywordRules {
    /// Whether no rules are configured
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty() && self.next_element.is_empty() && self.suffixes.is_empty()
    }

    /// Strip `extension` instead of `.dat`; empty keeps every extension
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.to_string();
        self
    }

    /// Reject rules that could never match
    pub fn validate(&self) -> Result<(), MetadataError> {
        for rule in &self.flags {
            if rule.token.is_empty() || rule.key.is_empty() {
                return Err(MetadataError::InvalidRule(format!(
                    "flag rule needs a token and a key: {rule:?}"
                )));
            }
        }
        for rule in &self.next_element {
            if rule.token.is_empty() || rule.keys.is_empty() {
                return Err(MetadataError::InvalidRule(format!(
                    "next-element rule needs a token and at least one key: {rule:?}"
                )));
            }
        }
        for rule in &self.suffixes {
            if rule.suffix.is_empty() || rule.key.is_empty() {
                return Err(MetadataError::InvalidRule(format!(
                    "suffix rule needs a suffix and a key: {rule:?}"
                )));
            }
        }
        Ok(())
    }

    /// Apply all rules to `path`, storing matches in `metadata`.
    pub fn apply(&self, path: &Path, metadata: &mut ScanMetadata) {
        if self.is_empty() {
            return;
        }

        let wanted = self.extension.strip_prefix('.').unwrap_or(&self.extension);
        let stem = match path.extension() {
            Some(ext) if !wanted.is_empty() && ext == wanted => path.with_extension(""),
            _ => path.to_path_buf(),
        };
        let normalized = stem.to_string_lossy().replace(['\\', '/', ' '], "_");

        let mut pending: Vec<&str> = Vec::new();
        for element in normalized.split('_').filter(|e| !e.is_empty()) {
            if !pending.is_empty() {
                let key = pending.remove(0);
                metadata.insert(key, self.next_element_value(element));
            } else {
                for rule in &self.next_element {
                    if element == rule.token {
                        pending = rule.keys.iter().map(String::as_str).collect();
                    }
                }
            }

            for rule in &self.flags {
                if element == rule.token {
                    metadata.insert(rule.key.as_str(), MetadataValue::infer(&rule.value));
                }
            }

            if let Some(rule) = self
                .suffixes
                .iter()
                .filter(|r| element.contains(r.suffix.as_str()))
                .max_by_key(|r| r.suffix.len())
            {
                if let Some(value) = numeric_value(&element.replace(rule.suffix.as_str(), "")) {
                    metadata.insert(rule.key.as_str(), value);
                }
            }
        }
    }

    fn next_element_value(&self, element: &str) -> MetadataValue {
        if let Some(value) = numeric_value(element) {
            return value;
        }
        for rule in &self.suffixes {
            if let Some(stripped) = element.strip_suffix(rule.suffix.as_str()) {
                if let Some(value) = numeric_value(stripped) {
                    return value;
                }
            }
        }
        MetadataValue::String(element.to_string())
    }
}

fn numeric_value(text: &str) -> Option<MetadataValue> {
    if let Ok(i) = text.parse::<i64>() {
        return Some(MetadataValue::Integer(i));
    }
    text.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(MetadataValue::Float)
}
