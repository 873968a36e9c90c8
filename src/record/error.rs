use std::fmt;

/// What went wrong while decoding a raw scan file
#[derive(Debug, thiserror::Error)]
pub enum ParseErrorKind {
    /// I/O error while reading the stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended inside the fixed header block
    #[error("Truncated header: expected {expected} header lines, found {found}")]
    TruncatedHeader {
        /// Configured header line count
        expected: usize,
        /// Lines actually present
        found: usize,
    },

    /// The column-name line is missing or empty
    #[error("Missing column header")]
    MissingColumnHeader,

    /// A configured column does not exist in the file
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// Column selection left no dependent columns
    #[error("No dependent columns selected")]
    NoDependentColumns,

    /// A numeric field could not be parsed
    #[error("Invalid number in column '{column}'")]
    InvalidNumber {
        /// Column header name
        column: String,
    },

    /// A timestamp field could not be parsed
    #[error("Invalid timestamp in column '{column}'")]
    InvalidTimestamp {
        /// Column header name
        column: String,
    },

    /// A row has a different number of fields than the header
    #[error("Field count mismatch: expected {expected}, found {found}")]
    FieldCount {
        /// Fields in the header / first row
        expected: usize,
        /// Fields in the offending row
        found: usize,
    },

    /// The file has a header but no data rows
    #[error("No data records")]
    NoRecords,

    /// The parser configuration cannot describe any file
    #[error("Invalid parser configuration: {0}")]
    InvalidConfig(String),

    /// Other delimited-text decoding error
    #[error("CSV error: {0}")]
    Csv(String),
}

/// Malformed raw content, localized to a line and byte offset.
///
/// `line` is 1-based; `offset` is the byte offset of the start of the
/// offending line. `content` holds the triggering text (possibly empty when
/// the stream ended).
#[derive(Debug, thiserror::Error)]
pub struct ParseError {
    /// 1-based line number
    pub line: u64,
    /// Byte offset of the line start
    pub offset: u64,
    /// Offending content
    pub content: String,
    /// Error category
    #[source]
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub(crate) fn new(
        line: u64,
        offset: u64,
        content: impl Into<String>,
        kind: ParseErrorKind,
    ) -> Self {
        Self {
            line,
            offset,
            content: content.into(),
            kind,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at line {} (byte {})", self.kind, self.line, self.offset)?;
        if !self.content.is_empty() {
            write!(f, ": {:?}", self.content)?;
        }
        Ok(())
    }
}
