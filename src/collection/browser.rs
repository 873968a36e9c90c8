use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ProcessedDatasetCollection;
use crate::fit::FitStatus;
use crate::metadata::MetadataValue;
use crate::scan::ScanDataset;

/// Value a view is sorted by
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// A metadata key
    Metadata(String),
    /// A fitted parameter value of a model
    FitParameter {
        /// Model name
        model: String,
        /// Parameter name
        parameter: String,
    },
}

impl SortKey {
    /// Sort by a metadata key
    pub fn metadata(key: &str) -> Self {
        SortKey::Metadata(key.to_string())
    }

    /// Sort by a fitted parameter
    pub fn fit_parameter(model: &str, parameter: &str) -> Self {
        SortKey::FitParameter {
            model: model.to_string(),
            parameter: parameter.to_string(),
        }
    }

    fn value_of(&self, scan: &ScanDataset) -> Option<MetadataValue> {
        match self {
            SortKey::Metadata(key) => scan
                .metadata_value(key)
                .filter(|v| !v.is_null())
                .cloned(),
            SortKey::FitParameter { model, parameter } => scan
                .fit(model)
                .and_then(|fit| fit.value(parameter))
                .map(MetadataValue::Float),
        }
    }
}

/// Parses `fit:<model>.<parameter>` as a fit parameter and anything else as
/// a metadata key
impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix("fit:") {
            Some(rest) => match rest.split_once('.') {
                Some((model, parameter)) if !model.is_empty() && !parameter.is_empty() => {
                    Ok(SortKey::fit_parameter(model, parameter))
                }
                _ => Err(format!("Expected fit:<model>.<parameter>, got '{s}'")),
            },
            None if s.is_empty() => Err("Empty sort key".to_string()),
            None => Ok(SortKey::metadata(s)),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Metadata(key) => write!(f, "{key}"),
            SortKey::FitParameter { model, parameter } => write!(f, "fit:{model}.{parameter}"),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Smallest first
    #[default]
    Ascending,
    /// Largest first
    Descending,
}

/// A filtered, ordered, read-only view over a collection.
///
/// Every operation returns a new view; the collection is never modified.
/// An empty result is an empty view, not an error.
#[derive(Debug, Clone)]
pub struct DataBrowser<'a> {
    collection: &'a ProcessedDatasetCollection,
    indices: Vec<usize>,
}

impl<'a> DataBrowser<'a> {
    /// View every scan of `collection` in delivery order
    pub fn new(collection: &'a ProcessedDatasetCollection) -> Self {
        Self {
            collection,
            indices: (0..collection.len()).collect(),
        }
    }

    /// Keep scans matching `predicate`
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ScanDataset) -> bool,
    {
        let collection = self.collection;
        self.indices.retain(|&i| predicate(&collection.scans[i]));
        self
    }

    /// Keep scans whose `key` is present and satisfies `predicate`
    pub fn where_metadata<F>(self, key: &str, predicate: F) -> Self
    where
        F: Fn(&MetadataValue) -> bool,
    {
        self.filter(|scan| scan.metadata_value(key).is_some_and(&predicate))
    }

    /// Keep scans whose `key` equals `value`, using the collection's index
    /// when one exists
    pub fn where_eq(mut self, key: &str, value: impl Into<MetadataValue>) -> Self {
        let value = value.into();
        if self.collection.is_indexed(key) {
            let hits: HashSet<usize> = self
                .collection
                .positions_of(key, &value)
                .into_iter()
                .collect();
            self.indices.retain(|i| hits.contains(i));
            self
        } else {
            self.filter(|scan| scan.metadata_value(key) == Some(&value))
        }
    }

    /// Keep scans whose fit of `model` has `status`
    pub fn with_fit_status(self, model: &str, status: FitStatus) -> Self {
        self.filter(|scan| scan.fit(model).is_some_and(|fit| fit.status == status))
    }

    /// Order the view by `key`.
    ///
    /// The sort is stable, and scans without a value for `key` go last in
    /// either direction.
    pub fn sort_by(mut self, key: &SortKey, order: SortOrder) -> Self {
        let collection = self.collection;
        let mut keyed: Vec<(usize, Option<MetadataValue>)> = self
            .indices
            .iter()
            .map(|&i| (i, key.value_of(&collection.scans[i])))
            .collect();

        keyed.sort_by(|(_, a), (_, b)| match (a, b) {
            (Some(a), Some(b)) => match order {
                SortOrder::Ascending => a.cmp(b),
                SortOrder::Descending => b.cmp(a),
            },
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });

        self.indices = keyed.into_iter().map(|(i, _)| i).collect();
        self
    }

    /// Keep at most the first `n` scans
    pub fn take(mut self, n: usize) -> Self {
        self.indices.truncate(n);
        self
    }

    /// Scans in view order
    pub fn iter(&self) -> impl Iterator<Item = &'a ScanDataset> + '_ {
        let collection = self.collection;
        self.indices.iter().map(move |&i| &collection.scans[i])
    }

    /// Scan at `position` within the view
    pub fn get(&self, position: usize) -> Option<&'a ScanDataset> {
        let collection = self.collection;
        self.indices.get(position).map(|&i| &collection.scans[i])
    }

    /// Number of scans in view
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether the view is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Collection positions of the scans in view
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Values of `key` in view order (`None` where absent)
    pub fn values(&self, key: &str) -> Vec<Option<&'a MetadataValue>> {
        self.iter().map(|scan| scan.metadata_value(key)).collect()
    }

    /// Tabulate one model's results for the scans in view
    pub fn fit_table(&self, model: &str) -> super::FitTable {
        super::FitTable::build(self.iter(), model, &[])
    }

    /// Tabulate one model's results with per-scan data column summaries
    pub fn fit_table_with(
        &self,
        model: &str,
        aggregates: &[super::ColumnAggregate],
    ) -> super::FitTable {
        super::FitTable::build(self.iter(), model, aggregates)
    }
}
