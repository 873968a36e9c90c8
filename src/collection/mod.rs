//! # Processed Dataset Collection
//!
//! Owns every scan of a completed pass together with its fit results.
//! Lookups by metadata value use an index when one was built with
//! [`ProcessedDatasetCollection::index_by`] and fall back to a linear scan
//! otherwise. Read-only views are provided by [`DataBrowser`].

mod browser;
mod table;


pub use browser::{DataBrowser, SortKey, SortOrder};
pub use table::{Aggregation, ColumnAggregate, FitTable, FitTableRow, ERROR_SUFFIX};

use std::collections::{BTreeMap, BTreeSet};
use std::ops::ControlFlow;
use std::path::Path;

use crate::metadata::MetadataValue;
use crate::processor::ScanSink;
use crate::scan::ScanDataset;

type ValueIndex = BTreeMap<MetadataValue, Vec<usize>>;

/// Scans of a completed pass, in the order they were delivered
#[derive(Debug, Clone, Default)]
pub struct ProcessedDatasetCollection {
    scans: Vec<ScanDataset>,
    indexes: BTreeMap<String, ValueIndex>,
}

impl ProcessedDatasetCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap already processed scans
    pub fn from_scans(scans: Vec<ScanDataset>) -> Self {
        Self {
            scans,
            indexes: BTreeMap::new(),
        }
    }

    /// Append a scan, keeping existing indexes current
    pub fn push(&mut self, scan: ScanDataset) {
        let position = self.scans.len();
        for (key, index) in &mut self.indexes {
            if let Some(value) = scan.metadata_value(key) {
                index.entry(value.clone()).or_default().push(position);
            }
        }
        self.scans.push(scan);
    }

    /// Number of scans
    pub fn len(&self) -> usize {
        self.scans.len()
    }

    /// Whether the collection is empty
    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }

    /// Scan at `position`
    pub fn get(&self, position: usize) -> Option<&ScanDataset> {
        self.scans.get(position)
    }

    /// Scan read from `path`
    pub fn get_by_source(&self, path: &Path) -> Option<&ScanDataset> {
        self.scans.iter().find(|s| s.source() == path)
    }

    /// All scans
    pub fn scans(&self) -> &[ScanDataset] {
        &self.scans
    }

    /// Iterate over scans in delivery order
    pub fn iter(&self) -> std::slice::Iter<'_, ScanDataset> {
        self.scans.iter()
    }

    /// Mutable access for refitting; metadata (and so every index) is
    /// immutable through `ScanDataset`
    pub(crate) fn scans_mut(&mut self) -> &mut [ScanDataset] {
        &mut self.scans
    }

    /// Take the scans out
    pub fn into_scans(self) -> Vec<ScanDataset> {
        self.scans
    }

    /// Build (or rebuild) a value index for a metadata key
    pub fn index_by(&mut self, key: &str) -> &mut Self {
        let mut index = ValueIndex::new();
        for (position, scan) in self.scans.iter().enumerate() {
            if let Some(value) = scan.metadata_value(key) {
                index.entry(value.clone()).or_default().push(position);
            }
        }
        self.indexes.insert(key.to_string(), index);
        self
    }

    /// Whether `key` has a value index
    pub fn is_indexed(&self, key: &str) -> bool {
        self.indexes.contains_key(key)
    }

    /// Positions of scans whose `key` equals `value`, in delivery order
    pub fn positions_of(&self, key: &str, value: &MetadataValue) -> Vec<usize> {
        match self.indexes.get(key) {
            Some(index) => index.get(value).cloned().unwrap_or_default(),
            None => self
                .scans
                .iter()
                .enumerate()
                .filter(|(_, s)| s.metadata_value(key) == Some(value))
                .map(|(i, _)| i)
                .collect(),
        }
    }

    /// Scans whose `key` equals `value`
    pub fn lookup(&self, key: &str, value: &MetadataValue) -> Vec<&ScanDataset> {
        self.positions_of(key, value)
            .into_iter()
            .map(|i| &self.scans[i])
            .collect()
    }

    /// Distinct values of `key` across the collection
    pub fn unique_values(&self, key: &str) -> BTreeSet<MetadataValue> {
        match self.indexes.get(key) {
            Some(index) => index.keys().cloned().collect(),
            None => self
                .scans
                .iter()
                .filter_map(|s| s.metadata_value(key).cloned())
                .collect(),
        }
    }

    /// View over every scan
    pub fn browser(&self) -> DataBrowser<'_> {
        DataBrowser::new(self)
    }

    /// Tabulate one model's fitted parameters against scan metadata
    pub fn fit_table(&self, model: &str) -> FitTable {
        FitTable::build(self.scans.iter(), model, &[])
    }

    /// [`fit_table`](Self::fit_table) with per-scan data column summaries
    pub fn fit_table_with(&self, model: &str, aggregates: &[ColumnAggregate]) -> FitTable {
        FitTable::build(self.scans.iter(), model, aggregates)
    }
}

impl ScanSink for ProcessedDatasetCollection {
    fn accept(&mut self, scan: ScanDataset) -> ControlFlow<()> {
        self.push(scan);
        ControlFlow::Continue(())
    }
}

impl<'a> IntoIterator for &'a ProcessedDatasetCollection {
    type Item = &'a ScanDataset;
    type IntoIter = std::slice::Iter<'a, ScanDataset>;

    fn into_iter(self) -> Self::IntoIter {
        self.scans.iter()
    }
}

impl FromIterator<ScanDataset> for ProcessedDatasetCollection {
    fn from_iter<I: IntoIterator<Item = ScanDataset>>(iter: I) -> Self {
        Self::from_scans(iter.into_iter().collect())
    }
}
