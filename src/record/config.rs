use serde::{Deserialize, Serialize};

use crate::metadata::HeaderSplit;

/// Default input buffer size for raw scan files (64KB)
pub const DEFAULT_INPUT_BUFFER_SIZE: usize = 64 * 1024;

/// Selects a column either by position or by its header name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnSelector {
    /// Zero-based column position
    Index(usize),
    /// Column header name
    Name(String),
}

impl ColumnSelector {
    /// Resolve against the file's column names
    pub fn resolve(&self, names: &[String]) -> Option<usize> {
        match self {
            ColumnSelector::Index(i) => (*i < names.len()).then_some(*i),
            ColumnSelector::Name(name) => names.iter().position(|n| n == name),
        }
    }
}

impl std::fmt::Display for ColumnSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnSelector::Index(i) => write!(f, "#{i}"),
            ColumnSelector::Name(name) => write!(f, "{name}"),
        }
    }
}

impl From<&str> for ColumnSelector {
    fn from(name: &str) -> Self {
        ColumnSelector::Name(name.to_string())
    }
}

impl From<usize> for ColumnSelector {
    fn from(index: usize) -> Self {
        ColumnSelector::Index(index)
    }
}

/// Layout of a raw scan file.
///
/// ```text
/// <header_lines fixed lines>          e.g. instrument banner
/// # key: value                        comment-prefixed header lines
/// time<TAB>signal<TAB>reference       column header (optional)
/// 0.0<TAB>1.25<TAB>0.5                data rows, acquisition order
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Field delimiter (ASCII)
    pub delimiter: char,

    /// Number of leading lines always treated as header
    pub header_lines: usize,

    /// Lines starting with this prefix after the fixed header are header too
    pub comment_prefix: Option<String>,

    /// How header lines are split into metadata pairs
    pub header_split: HeaderSplit,

    /// Whether a column-name line precedes the data rows
    pub column_header: bool,

    /// Independent (swept) variable column
    pub independent_column: ColumnSelector,

    /// Dependent columns; empty means every remaining column
    pub dependent_columns: Vec<ColumnSelector>,

    /// Optional per-record timestamp column (seconds or RFC 3339)
    pub timestamp_column: Option<ColumnSelector>,

    /// Optional per-record channel id column
    pub channel_column: Option<ColumnSelector>,

    /// Treat a file without data rows as malformed
    pub require_records: bool,

    /// Input buffer size used by [`RecordParser::open`](super::RecordParser::open)
    pub buffer_size: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            delimiter: '\t',
            header_lines: 0,
            comment_prefix: Some("#".to_string()),
            header_split: HeaderSplit::default(),
            column_header: true,
            independent_column: ColumnSelector::Index(0),
            dependent_columns: Vec::new(),
            timestamp_column: None,
            channel_column: None,
            require_records: true,
            buffer_size: DEFAULT_INPUT_BUFFER_SIZE,
        }
    }
}

impl ParserConfig {
    /// Comma-separated variant of the default layout
    pub fn csv() -> Self {
        Self {
            delimiter: ',',
            ..Default::default()
        }
    }

    /// Set the number of fixed header lines
    pub fn with_header_lines(mut self, header_lines: usize) -> Self {
        self.header_lines = header_lines;
        self
    }

    /// Set the header pair splitting rule
    pub fn with_header_split(mut self, split: HeaderSplit) -> Self {
        self.header_split = split;
        self
    }

    /// Select the independent column
    pub fn with_independent(mut self, column: impl Into<ColumnSelector>) -> Self {
        self.independent_column = column.into();
        self
    }

    /// Select the dependent columns
    pub fn with_dependent<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnSelector>,
    {
        self.dependent_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Delimiter as a byte, if it is ASCII
    pub(crate) fn delimiter_byte(&self) -> Option<u8> {
        self.delimiter.is_ascii().then_some(self.delimiter as u8)
    }
}
