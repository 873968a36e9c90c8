//! # Record Parser
//!
//! Pull-based parser for delimited-text raw scan files, designed to handle
//! arbitrarily large files with minimal memory usage.
//!
//! Nothing is read when a [`RecordParser`] is created. The header block is
//! consumed on the first call to [`RecordParser::read_header`] (or implicitly
//! by the first record request), and every data row is decoded only when the
//! consumer asks for it. A consumer can therefore inspect the header and stop
//! without touching the rest of the file.
//!
//! The first malformed row ends the sequence with a [`ParseError`]; the
//! parser never skips bad rows.
//!
//! ```rust,no_run
//! use edascan::record::{ParserConfig, RecordParser};
//!
//! let parser = RecordParser::open("scan_30K.dat", ParserConfig::default())?;
//! for record in parser.records() {
//!     let record = record?;
//!     println!("{} -> {:?}", record.independent, record.dependent);
//! }
//! # Ok::<(), edascan::record::ParseError>(())
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::DateTime;
use csv::{ByteRecord, StringRecord};

pub use config::{ColumnSelector, ParserConfig, DEFAULT_INPUT_BUFFER_SIZE};
pub use error::{ParseError, ParseErrorKind};
pub use iterators::RecordIterator;
pub use models::{ColumnLayout, RawRecord, ScanHeader};
pub use writer::write_scan;

mod config;
mod error;
mod iterators;
mod models;
mod writer;


enum ParserState<R: BufRead> {
    Pending(R),
    Body(csv::Reader<R>),
    Done,
}

/// Column positions resolved against a file's column names
#[derive(Debug, Clone)]
struct ResolvedColumns {
    layout: ColumnLayout,
    independent: usize,
    dependent: Vec<usize>,
    timestamp: Option<(usize, String)>,
    channel: Option<usize>,
}

/// Streaming parser for one raw scan file or stream
pub struct RecordParser<R: BufRead> {
    config: ParserConfig,
    state: ParserState<R>,
    header: Option<ScanHeader>,
    columns: Option<ResolvedColumns>,
    header_line_count: u64,
    header_bytes: u64,
    records_read: usize,
    finished: bool,
}

impl RecordParser<BufReader<File>> {
    /// Open a raw scan file using the configured buffer size
    pub fn open<P: AsRef<Path>>(path: P, config: ParserConfig) -> Result<Self, ParseError> {
        let file = File::open(path.as_ref())
            .map_err(|e| ParseError::new(0, 0, String::new(), ParseErrorKind::Io(e)))?;
        let capacity = config.buffer_size.max(1);
        Ok(Self::new(BufReader::with_capacity(capacity, file), config))
    }
}

impl<R: BufRead> RecordParser<R> {
    /// Create a parser over a buffered source; performs no I/O
    pub fn new(reader: R, config: ParserConfig) -> Self {
        Self {
            config,
            state: ParserState::Pending(reader),
            header: None,
            columns: None,
            header_line_count: 0,
            header_bytes: 0,
            records_read: 0,
            finished: false,
        }
    }

    /// Parser configuration
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Header block, if it has been read
    pub fn header(&self) -> Option<&ScanHeader> {
        self.header.as_ref()
    }

    /// Column layout, once known (after the header for named files,
    /// after the first record for files without a column-name line)
    pub fn layout(&self) -> Option<&ColumnLayout> {
        self.columns.as_ref().map(|c| &c.layout)
    }

    /// Number of records decoded so far
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    /// Consume the header block if that has not happened yet
    pub fn read_header(&mut self) -> Result<&ScanHeader, ParseError> {
        if self.header.is_none() {
            if let Err(e) = self.consume_header() {
                self.finished = true;
                self.state = ParserState::Done;
                return Err(e);
            }
        }
        match &self.header {
            Some(header) => Ok(header),
            None => Err(self.error_here(String::new(), ParseErrorKind::MissingColumnHeader)),
        }
    }

    /// Decode the next record, or `Ok(None)` at the end of the file
    pub fn next_record(&mut self) -> Result<Option<RawRecord>, ParseError> {
        if self.finished {
            return Ok(None);
        }
        self.read_header()?;

        let result = self.read_body_record();
        match &result {
            Ok(Some(_)) => self.records_read += 1,
            Ok(None) | Err(_) => {
                self.finished = true;
                self.state = ParserState::Done;
            }
        }
        result
    }

    /// Turn the parser into a lazy record iterator
    pub fn records(self) -> RecordIterator<R> {
        RecordIterator { parser: self }
    }

    fn consume_header(&mut self) -> Result<(), ParseError> {
        let delimiter = self.config.delimiter_byte().ok_or_else(|| {
            ParseError::new(
                0,
                0,
                self.config.delimiter.to_string(),
                ParseErrorKind::InvalidConfig("delimiter must be ASCII".to_string()),
            )
        })?;

        let mut reader = match std::mem::replace(&mut self.state, ParserState::Done) {
            ParserState::Pending(reader) => reader,
            other => {
                self.state = other;
                return Ok(());
            }
        };

        let mut lines = Vec::with_capacity(self.config.header_lines);
        for found in 0..self.config.header_lines {
            match self.read_header_line(&mut reader)? {
                Some(line) => lines.push(line),
                None => {
                    return Err(self.error_here(
                        String::new(),
                        ParseErrorKind::TruncatedHeader {
                            expected: self.config.header_lines,
                            found,
                        },
                    ))
                }
            }
        }

        if let Some(prefix) = self.config.comment_prefix.clone().filter(|p| !p.is_empty()) {
            loop {
                let starts_with_prefix = reader
                    .fill_buf()
                    .map_err(|e| self.error_here(String::new(), ParseErrorKind::Io(e)))?
                    .starts_with(prefix.as_bytes());
                if !starts_with_prefix {
                    break;
                }
                match self.read_header_line(&mut reader)? {
                    Some(line) => lines.push(line),
                    None => break,
                }
            }
        }

        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(self.config.column_header)
            .trim(csv::Trim::All)
            .flexible(false)
            .from_reader(reader);

        let mut column_names = Vec::new();
        if self.config.column_header {
            let names = csv_reader.headers().map_err(|e| self.csv_error(e, String::new()))?;
            column_names = names.iter().map(str::to_string).collect();
            if column_names.iter().all(|n| n.is_empty()) {
                return Err(self.error_here(String::new(), ParseErrorKind::MissingColumnHeader));
            }
            let content = column_names.join(&self.config.delimiter.to_string());
            self.columns = Some(self.resolve_columns(&column_names, content)?);
        }

        self.header = Some(ScanHeader {
            lines,
            column_names,
        });
        self.state = ParserState::Body(csv_reader);
        Ok(())
    }

    fn read_header_line(&mut self, reader: &mut R) -> Result<Option<String>, ParseError> {
        let mut buf = String::new();
        let n = reader
            .read_line(&mut buf)
            .map_err(|e| self.error_here(String::new(), ParseErrorKind::Io(e)))?;
        if n == 0 {
            return Ok(None);
        }
        self.header_line_count += 1;
        self.header_bytes += n as u64;
        Ok(Some(buf.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn read_body_record(&mut self) -> Result<Option<RawRecord>, ParseError> {
        let ParserState::Body(csv_reader) = &mut self.state else {
            return Ok(None);
        };

        let mut raw = ByteRecord::new();
        let more = csv_reader.read_byte_record(&mut raw);
        let end_position = csv_reader.position().clone();

        match more {
            Ok(true) => {}
            Ok(false) => {
                if self.records_read == 0 && self.config.require_records {
                    return Err(ParseError::new(
                        self.header_line_count + end_position.line(),
                        self.header_bytes + end_position.byte(),
                        String::new(),
                        ParseErrorKind::NoRecords,
                    ));
                }
                return Ok(None);
            }
            Err(e) => {
                let content = self.lossy_content(&raw);
                return Err(self.csv_error(e, content));
            }
        }

        let row = match StringRecord::from_byte_record(raw) {
            Ok(row) => row,
            Err(e) => {
                let kind = ParseErrorKind::Csv(e.utf8_error().to_string());
                let raw = e.into_byte_record();
                let (line, offset) = match raw.position() {
                    Some(pos) => (
                        self.header_line_count + pos.line(),
                        self.header_bytes + pos.byte(),
                    ),
                    None => (self.header_line_count, self.header_bytes),
                };
                return Err(ParseError::new(
                    line,
                    offset,
                    self.lossy_content(&raw),
                    kind,
                ));
            }
        };

        let (line, offset) = match row.position() {
            Some(pos) => (
                self.header_line_count + pos.line(),
                self.header_bytes + pos.byte(),
            ),
            None => (self.header_line_count, self.header_bytes),
        };
        let content = row
            .iter()
            .collect::<Vec<_>>()
            .join(&self.config.delimiter.to_string());

        if self.columns.is_none() {
            let names: Vec<String> = (0..row.len()).map(|i| format!("column_{i}")).collect();
            let resolved = self
                .resolve_columns(&names, content.clone())
                .map_err(|e| ParseError { line, offset, ..e })?;
            self.columns = Some(resolved);
        }
        let Some(columns) = &self.columns else {
            return Ok(None);
        };

        let numeric = |idx: usize, name: &str| -> Result<f64, ParseError> {
            let field = row.get(idx).ok_or_else(|| {
                ParseError::new(
                    line,
                    offset,
                    content.clone(),
                    ParseErrorKind::FieldCount {
                        expected: idx + 1,
                        found: row.len(),
                    },
                )
            })?;
            field.parse::<f64>().map_err(|_| {
                ParseError::new(
                    line,
                    offset,
                    content.clone(),
                    ParseErrorKind::InvalidNumber {
                        column: name.to_string(),
                    },
                )
            })
        };

        let independent = numeric(columns.independent, &columns.layout.independent)?;
        let mut dependent = Vec::with_capacity(columns.dependent.len());
        for (idx, name) in columns.dependent.iter().zip(&columns.layout.dependent) {
            dependent.push(numeric(*idx, name)?);
        }

        let timestamp = match &columns.timestamp {
            Some((idx, name)) => {
                let field = row.get(*idx).unwrap_or_default();
                Some(parse_timestamp(field).ok_or_else(|| {
                    ParseError::new(
                        line,
                        offset,
                        content.clone(),
                        ParseErrorKind::InvalidTimestamp {
                            column: name.clone(),
                        },
                    )
                })?)
            }
            None => None,
        };

        let channel = columns
            .channel
            .and_then(|idx| row.get(idx))
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Some(RawRecord {
            index: self.records_read,
            line,
            independent,
            dependent,
            timestamp,
            channel,
        }))
    }

    fn resolve_columns(
        &self,
        names: &[String],
        content: String,
    ) -> Result<ResolvedColumns, ParseError> {
        let unknown = |selector: &ColumnSelector| {
            self.error_here(
                content.clone(),
                ParseErrorKind::UnknownColumn(selector.to_string()),
            )
        };

        let independent = self
            .config
            .independent_column
            .resolve(names)
            .ok_or_else(|| unknown(&self.config.independent_column))?;
        let timestamp = match &self.config.timestamp_column {
            Some(sel) => Some(sel.resolve(names).ok_or_else(|| unknown(sel))?),
            None => None,
        };
        let channel = match &self.config.channel_column {
            Some(sel) => Some(sel.resolve(names).ok_or_else(|| unknown(sel))?),
            None => None,
        };

        let dependent: Vec<usize> = if self.config.dependent_columns.is_empty() {
            (0..names.len())
                .filter(|i| *i != independent && Some(*i) != timestamp && Some(*i) != channel)
                .collect()
        } else {
            self.config
                .dependent_columns
                .iter()
                .map(|sel| sel.resolve(names).ok_or_else(|| unknown(sel)))
                .collect::<Result<_, _>>()?
        };
        if dependent.is_empty() {
            return Err(self.error_here(content, ParseErrorKind::NoDependentColumns));
        }

        Ok(ResolvedColumns {
            layout: ColumnLayout {
                independent: names[independent].clone(),
                dependent: dependent.iter().map(|i| names[*i].clone()).collect(),
            },
            independent,
            dependent,
            timestamp: timestamp.map(|i| (i, names[i].clone())),
            channel,
        })
    }

    fn error_here(&self, content: String, kind: ParseErrorKind) -> ParseError {
        ParseError::new(self.header_line_count + 1, self.header_bytes, content, kind)
    }

    /// Fields of a row that failed to decode, rejoined with the delimiter
    fn lossy_content(&self, raw: &ByteRecord) -> String {
        raw.iter()
            .map(String::from_utf8_lossy)
            .collect::<Vec<_>>()
            .join(&self.config.delimiter.to_string())
    }

    fn csv_error(&self, err: csv::Error, content: String) -> ParseError {
        let (line, offset) = match err.position() {
            Some(pos) => (
                self.header_line_count + pos.line(),
                self.header_bytes + pos.byte(),
            ),
            None => (self.header_line_count + 1, self.header_bytes),
        };
        let kind = match err.into_kind() {
            csv::ErrorKind::Io(e) => ParseErrorKind::Io(e),
            csv::ErrorKind::UnequalLengths {
                expected_len, len, ..
            } => ParseErrorKind::FieldCount {
                expected: expected_len as usize,
                found: len as usize,
            },
            other => ParseErrorKind::Csv(format!("{other:?}")),
        };
        ParseError::new(line, offset, content, kind)
    }
}

/// Seconds as a plain number, or an RFC 3339 timestamp converted to Unix seconds
fn parse_timestamp(field: &str) -> Option<f64> {
    if let Ok(seconds) = field.parse::<f64>() {
        return seconds.is_finite().then_some(seconds);
    }
    DateTime::parse_from_rfc3339(field)
        .ok()
        .map(|ts| ts.timestamp() as f64 + f64::from(ts.timestamp_subsec_nanos()) * 1e-9)
}
