use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::fit::FitStatus;
use crate::metadata::{MetadataValue, FILEPATH_KEY};
use crate::scan::ScanDataset;

/// Suffix of the uncertainty column that follows each parameter column
pub const ERROR_SUFFIX: &str = "_error";

/// Reduction of one data column of a scan to a single value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Arithmetic mean
    Mean,
    /// Smallest value
    Min,
    /// Largest value
    Max,
    /// First value in acquisition order
    First,
    /// Last value in acquisition order
    Last,
}

impl Aggregation {
    fn apply(self, values: &[f64]) -> Option<f64> {
        match self {
            Aggregation::Mean if values.is_empty() => None,
            Aggregation::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
            Aggregation::Min => values.iter().copied().reduce(f64::min),
            Aggregation::Max => values.iter().copied().reduce(f64::max),
            Aggregation::First => values.first().copied(),
            Aggregation::Last => values.last().copied(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Aggregation::Mean => "mean",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
            Aggregation::First => "first",
            Aggregation::Last => "last",
        }
    }
}

/// A data column summarized once per scan, e.g. the mean of a monitor
/// channel that drifts during the sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnAggregate {
    /// Independent or dependent column name
    pub column: String,
    /// Reduction applied to the column
    pub aggregation: Aggregation,
}

impl ColumnAggregate {
    /// Summarize `column` with `aggregation`
    pub fn new(column: &str, aggregation: Aggregation) -> Self {
        Self {
            column: column.to_string(),
            aggregation,
        }
    }

    /// Table header, `<column>_<aggregation>`
    pub fn header(&self) -> String {
        format!("{}_{}", self.column, self.aggregation.name())
    }

    fn evaluate(&self, scan: &ScanDataset) -> Option<f64> {
        self.aggregation.apply(&scan.column_values(&self.column)?)
    }
}

/// One row of a [`FitTable`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitTableRow {
    /// Scan source path
    pub source: PathBuf,
    /// Values of [`FitTable::metadata_columns`]
    pub metadata: Vec<Option<MetadataValue>>,
    /// Values of [`FitTable::aggregate_columns`]
    pub aggregates: Vec<Option<f64>>,
    /// Fit status, `None` when the model was never applied
    pub status: Option<FitStatus>,
    /// Value and uncertainty for each of [`FitTable::parameters`], interleaved
    pub values: Vec<Option<f64>>,
    /// Reduced chi-square
    pub goodness_of_fit: Option<f64>,
}

/// One model's fitted parameters tabulated against scan metadata.
///
/// Metadata columns are the keys every scan carries (except `Filepath`,
/// which is the `source` column). Aggregate columns summarize data columns
/// per scan. Each parameter contributes a value column, followed by a
/// `<name>_error` column unless no row has a nonzero uncertainty for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitTable {
    /// Model name
    pub model: String,
    /// Metadata keys, sorted
    pub metadata_columns: Vec<String>,
    /// Headers of the requested column aggregates
    pub aggregate_columns: Vec<String>,
    /// Parameter names, sorted
    pub parameters: Vec<String>,
    /// Whether each parameter has an uncertainty column
    pub error_columns: Vec<bool>,
    /// One row per scan
    pub rows: Vec<FitTableRow>,
}

impl FitTable {
    pub(crate) fn build<'a, I>(scans: I, model: &str, aggregates: &[ColumnAggregate]) -> Self
    where
        I: IntoIterator<Item = &'a ScanDataset>,
    {
        let scans: Vec<&ScanDataset> = scans.into_iter().collect();

        let metadata_columns: Vec<String> = match scans.split_first() {
            Some((first, rest)) => first
                .metadata()
                .keys()
                .filter(|key| *key != FILEPATH_KEY)
                .filter(|key| rest.iter().all(|s| s.metadata().contains_key(key)))
                .map(str::to_string)
                .collect(),
            None => Vec::new(),
        };

        let parameters: Vec<String> = scans
            .iter()
            .filter_map(|s| s.fit(model))
            .flat_map(|fit| fit.parameters.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let rows: Vec<FitTableRow> = scans
            .iter()
            .map(|scan| {
                let fit = scan.fit(model);
                let values = parameters
                    .iter()
                    .flat_map(|p| {
                        let fitted = fit.and_then(|f| f.parameters.get(p));
                        [
                            fitted.map(|f| f.value),
                            fitted.and_then(|f| f.uncertainty),
                        ]
                    })
                    .collect();
                FitTableRow {
                    source: scan.source().to_path_buf(),
                    metadata: metadata_columns
                        .iter()
                        .map(|key| scan.metadata_value(key).cloned())
                        .collect(),
                    aggregates: aggregates.iter().map(|a| a.evaluate(scan)).collect(),
                    status: fit.map(|f| f.status),
                    values,
                    goodness_of_fit: fit.and_then(|f| f.goodness_of_fit),
                }
            })
            .collect();

        let error_columns = (0..parameters.len())
            .map(|i| {
                rows.iter()
                    .any(|row| row.values[2 * i + 1].is_some_and(|e| e != 0.0))
            })
            .collect();

        Self {
            model: model.to_string(),
            metadata_columns,
            aggregate_columns: aggregates.iter().map(ColumnAggregate::header).collect(),
            parameters,
            error_columns,
            rows,
        }
    }

    /// Column names in output order
    pub fn headers(&self) -> Vec<String> {
        let mut headers = vec!["source".to_string()];
        headers.extend(self.metadata_columns.iter().cloned());
        headers.extend(self.aggregate_columns.iter().cloned());
        headers.push("status".to_string());
        for (p, &has_error) in self.parameters.iter().zip(&self.error_columns) {
            headers.push(p.clone());
            if has_error {
                headers.push(format!("{p}{ERROR_SUFFIX}"));
            }
        }
        headers.push("goodness_of_fit".to_string());
        headers
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value column of one parameter
    pub fn column(&self, parameter: &str) -> Option<Vec<Option<f64>>> {
        let position = self.parameters.iter().position(|p| p == parameter)?;
        Some(self.rows.iter().map(|r| r.values[2 * position]).collect())
    }

    /// Write the table as CSV; missing cells are empty
    pub fn write_csv<W: Write>(&self, out: W) -> csv::Result<()> {
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(self.headers())?;

        let cell = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
        for row in &self.rows {
            let mut record = vec![row.source.display().to_string()];
            record.extend(
                row.metadata
                    .iter()
                    .map(|v| v.as_ref().map(ToString::to_string).unwrap_or_default()),
            );
            record.extend(row.aggregates.iter().copied().map(cell));
            record.push(row.status.map(|s| s.to_string()).unwrap_or_default());
            for (pair, &has_error) in row.values.chunks(2).zip(&self.error_columns) {
                record.push(cell(pair[0]));
                if has_error {
                    record.push(cell(pair[1]));
                }
            }
            record.push(cell(row.goodness_of_fit));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}
