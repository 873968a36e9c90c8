use std::fmt;
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::debug;

use super::{IncompleteScanError, ScanDataset};
use crate::metadata::{
    parse_header_pairs, KeywordRules, MetadataValue, ScanMetadata, FILEPATH_KEY,
    LAST_MODIFIED_KEY,
};
use crate::record::{ParserConfig, RecordParser};

/// Predicate deciding whether a scan is kept, evaluated on its metadata
/// before any data row is read
pub type MetadataFilter = Arc<dyn Fn(&ScanMetadata) -> bool + Send + Sync>;

/// Turns one record stream into one complete [`ScanDataset`].
///
/// Metadata is layered in this order, later layers overwriting earlier ones:
/// file-path keyword tags, `Filepath` / `File Last Modified`, the caller's
/// context (e.g. `Run ID`), then header `key: value` pairs.
#[derive(Clone, Default)]
pub struct ScanAssembler {
    parser_config: ParserConfig,
    keywords: KeywordRules,
    filters: Vec<MetadataFilter>,
}

impl fmt::Debug for ScanAssembler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanAssembler")
            .field("parser_config", &self.parser_config)
            .field("keywords", &self.keywords)
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl ScanAssembler {
    /// Create an assembler for files in the given layout
    pub fn new(parser_config: ParserConfig) -> Self {
        Self {
            parser_config,
            ..Default::default()
        }
    }

    /// Derive metadata tags from file paths with these rules
    pub fn with_keywords(mut self, keywords: KeywordRules) -> Self {
        self.keywords = keywords;
        self
    }

    pub(crate) fn set_keyword_extension(&mut self, extension: &str) {
        self.keywords.extension = extension.to_string();
    }

    /// Add a metadata filter; all filters must accept a scan
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&ScanMetadata) -> bool + Send + Sync + 'static,
    {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Parser configuration used by [`assemble_path`](Self::assemble_path)
    pub fn parser_config(&self) -> &ParserConfig {
        &self.parser_config
    }

    /// Open `path` and assemble it.
    ///
    /// Returns `Ok(None)` when a metadata filter rejected the scan.
    pub fn assemble_path(
        &self,
        path: &Path,
        context: &ScanMetadata,
    ) -> Result<Option<ScanDataset>, IncompleteScanError> {
        let parser = RecordParser::open(path, self.parser_config.clone()).map_err(|cause| {
            IncompleteScanError {
                path: path.to_path_buf(),
                records_discarded: 0,
                cause,
            }
        })?;
        self.assemble(parser, path, context)
    }

    /// Drain `parser` into a scan labelled `source`.
    ///
    /// Any parse failure discards everything read so far. Returns `Ok(None)`
    /// when a metadata filter rejected the scan; in that case the body is
    /// never read.
    pub fn assemble<R: BufRead>(
        &self,
        mut parser: RecordParser<R>,
        source: &Path,
        context: &ScanMetadata,
    ) -> Result<Option<ScanDataset>, IncompleteScanError> {
        let incomplete = |records_discarded, cause| IncompleteScanError {
            path: source.to_path_buf(),
            records_discarded,
            cause,
        };

        let header_lines = parser
            .read_header()
            .map_err(|cause| incomplete(0, cause))?
            .lines
            .clone();

        let mut metadata = ScanMetadata::new();
        self.keywords.apply(source, &mut metadata);
        metadata.insert(FILEPATH_KEY, source.to_string_lossy().into_owned());
        if let Some(modified) = last_modified(source) {
            metadata.insert(LAST_MODIFIED_KEY, MetadataValue::Timestamp(modified));
        }
        metadata.extend_from(context);
        parse_header_pairs(
            &header_lines,
            self.parser_config.comment_prefix.as_deref(),
            self.parser_config.header_split,
            &mut metadata,
        );

        if !self.filters.iter().all(|accept| accept(&metadata)) {
            debug!("Scan {} rejected by metadata filter", source.display());
            return Ok(None);
        }

        let mut records = Vec::new();
        loop {
            match parser.next_record() {
                Ok(Some(record)) => records.push(record),
                Ok(None) => break,
                Err(cause) => return Err(incomplete(records.len(), cause)),
            }
        }

        let layout = parser.layout().cloned().unwrap_or_default();
        debug!(
            "Assembled {} ({} records, {} metadata entries)",
            source.display(),
            records.len(),
            metadata.len()
        );
        Ok(Some(ScanDataset::from_records(
            source, layout, records, metadata,
        )))
    }
}

fn last_modified(path: &Path) -> Option<DateTime<Utc>> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    Some(DateTime::<Utc>::from(modified))
}
