use serde::{Deserialize, Serialize};

use super::{MetadataValue, ScanMetadata};

/// How a header line is split into a key and a value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderSplit {
    /// Only lines with exactly one colon are pairs. Banners such as
    /// `Scan started at 12:30` are skipped.
    #[default]
    SingleColon,
    /// Split on the first colon; the value may contain further colons
    FirstColon,
}

impl HeaderSplit {
    /// Key and raw value of `line`, if it is a pair under this rule
    pub fn split<'a>(&self, line: &'a str) -> Option<(&'a str, &'a str)> {
        let (key, value) = line.split_once(':')?;
        match self {
            HeaderSplit::SingleColon if value.contains(':') => None,
            _ => Some((key, value)),
        }
    }
}

/// Extract `key: value` pairs from raw header lines into `metadata`.
///
/// The comment prefix (if any) is stripped first, then each line is split
/// according to `split`. Lines that are not pairs or have an empty key are
/// ignored. Values are typed with [`MetadataValue::infer`]. Returns the
/// number of pairs stored.
pub fn parse_header_pairs<S: AsRef<str>>(
    lines: &[S],
    comment_prefix: Option<&str>,
    split: HeaderSplit,
    metadata: &mut ScanMetadata,
) -> usize {
    let mut stored = 0;
    for line in lines {
        let mut line = line.as_ref().trim();
        if let Some(prefix) = comment_prefix {
            if let Some(rest) = line.strip_prefix(prefix) {
                line = rest.trim_start();
            }
        }

        let Some((key, value)) = split.split(line) else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        metadata.insert(key, MetadataValue::infer(value));
        stored += 1;
    }
    stored
}
