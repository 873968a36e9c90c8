use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::fit::FitResult;
use crate::metadata::{MetadataValue, ScanMetadata};
use crate::record::{ColumnLayout, RawRecord};

/// One complete scan: a sweep of the independent variable with its
/// dependent measurements, acquisition metadata and fit results.
///
/// Records and metadata are fixed at construction. Fit results are the only
/// mutable part and hold at most one entry per model name.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanDataset {
    source: PathBuf,
    layout: ColumnLayout,
    records: Vec<RawRecord>,
    metadata: ScanMetadata,
    fits: BTreeMap<String, FitResult>,
}

impl ScanDataset {
    /// Build a scan from fully decoded records (kept in the given order)
    pub(crate) fn from_records(
        source: impl Into<PathBuf>,
        layout: ColumnLayout,
        records: Vec<RawRecord>,
        metadata: ScanMetadata,
    ) -> Self {
        Self {
            source: source.into(),
            layout,
            records,
            metadata,
            fits: BTreeMap::new(),
        }
    }

    /// Source path, the scan's identity within a run
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Column names the records were decoded from
    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    /// Records in acquisition order
    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the scan has no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Acquisition metadata
    pub fn metadata(&self) -> &ScanMetadata {
        &self.metadata
    }

    /// Shortcut for a metadata lookup
    pub fn metadata_value(&self, key: &str) -> Option<&MetadataValue> {
        self.metadata.get(key)
    }

    /// All fit results keyed by model name
    pub fn fits(&self) -> &BTreeMap<String, FitResult> {
        &self.fits
    }

    /// Fit result of one model
    pub fn fit(&self, model: &str) -> Option<&FitResult> {
        self.fits.get(model)
    }

    /// Store a fit result, replacing any earlier result of the same model
    pub fn insert_fit(&mut self, result: FitResult) -> Option<FitResult> {
        self.fits.insert(result.model.clone(), result)
    }

    /// Independent values in acquisition order
    pub fn independent_values(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.independent).collect()
    }

    /// Values of one dependent column in acquisition order
    pub fn dependent_values(&self, column: usize) -> Option<Vec<f64>> {
        if column >= self.layout.dependent.len() {
            return None;
        }
        self.records.iter().map(|r| r.value(column)).collect()
    }

    /// Values of the independent or a dependent column, by header name
    pub fn column_values(&self, name: &str) -> Option<Vec<f64>> {
        if name == self.layout.independent {
            return Some(self.independent_values());
        }
        self.dependent_values(self.layout.dependent_index(name)?)
    }

    /// `(x, y)` samples for a dependent column chosen by name, or the first
    /// dependent column when `column` is `None`
    pub fn samples(&self, column: Option<&str>) -> Option<(Vec<f64>, Vec<f64>)> {
        let index = match column {
            Some(name) => self.layout.dependent_index(name)?,
            None => 0,
        };
        let ys = self.dependent_values(index)?;
        Some((self.independent_values(), ys))
    }
}
