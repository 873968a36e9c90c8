/// One decoded data row of a raw scan file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// 0-based position within the scan (acquisition order)
    pub index: usize,
    /// 1-based line in the source file
    pub line: u64,
    /// Independent (swept) variable
    pub independent: f64,
    /// Dependent values, ordered like [`ColumnLayout::dependent`]
    pub dependent: Vec<f64>,
    /// Acquisition time in seconds since the Unix epoch (or the file's own epoch)
    pub timestamp: Option<f64>,
    /// Acquisition channel
    pub channel: Option<String>,
}

impl RawRecord {
    /// Create a record without per-record metadata
    pub fn new(index: usize, independent: f64, dependent: Vec<f64>) -> Self {
        Self {
            index,
            line: 0,
            independent,
            dependent,
            timestamp: None,
            channel: None,
        }
    }

    /// Dependent value at `column`, if present
    pub fn value(&self, column: usize) -> Option<f64> {
        self.dependent.get(column).copied()
    }
}

/// Names of the columns a scan's records were decoded from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnLayout {
    /// Independent column name
    pub independent: String,
    /// Dependent column names
    pub dependent: Vec<String>,
}

impl ColumnLayout {
    /// Create a layout
    pub fn new(independent: impl Into<String>, dependent: Vec<String>) -> Self {
        Self {
            independent: independent.into(),
            dependent,
        }
    }

    /// Position of a dependent column by name
    pub fn dependent_index(&self, name: &str) -> Option<usize> {
        self.dependent.iter().position(|n| n == name)
    }
}

/// File-level header block of a raw scan file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanHeader {
    /// Header lines without trailing newlines
    pub lines: Vec<String>,
    /// Column names (empty for files without a column-name line)
    pub column_names: Vec<String>,
}
