use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[cfg(feature = "colorized_output")]
use console::style;

use crate::collection::ProcessedDatasetCollection;
use crate::fit::FitStatus;
use crate::scan::{IncompleteScanError, ScanDataset};

/// Something that went wrong for one file during a pass
#[derive(Debug)]
pub enum ProcessingFailure {
    /// The file could not be assembled into a scan
    Assembly(IncompleteScanError),
    /// A fit on an assembled scan failed; the failed result is also stored
    /// in the scan
    Fit {
        /// Scan source path
        source: PathBuf,
        /// Model name
        model: String,
        /// Diagnostic
        message: String,
    },
}

impl ProcessingFailure {
    /// File the failure belongs to
    pub fn source(&self) -> &Path {
        match self {
            ProcessingFailure::Assembly(e) => &e.path,
            ProcessingFailure::Fit { source, .. } => source,
        }
    }

    /// Whether the scan itself was lost
    pub fn is_assembly(&self) -> bool {
        matches!(self, ProcessingFailure::Assembly(_))
    }
}

impl fmt::Display for ProcessingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingFailure::Assembly(e) => write!(f, "{e}"),
            ProcessingFailure::Fit {
                source,
                model,
                message,
            } => write!(f, "Fit '{model}' failed for {}: {message}", source.display()),
        }
    }
}

/// Counters and failures of one processing pass
#[derive(Debug, Default)]
pub struct ProcessingSummary {
    /// Scans delivered to the sink
    pub scans_processed: usize,
    /// Files that could not be assembled
    pub scans_failed: usize,
    /// Records across delivered scans
    pub records: usize,
    /// Converged fits
    pub fits_converged: usize,
    /// Failed fits
    pub fits_failed: usize,
    /// Fits skipped for missing metadata
    pub fits_skipped: usize,
    /// Per-file failures in the order they were met
    pub failures: Vec<ProcessingFailure>,
    /// The pass stopped before the source was exhausted
    pub stopped_early: bool,
    /// Wall time of the pass
    pub elapsed: Duration,
}

impl ProcessingSummary {
    pub(crate) fn record_incomplete(&mut self, error: IncompleteScanError) {
        self.scans_failed += 1;
        self.failures.push(ProcessingFailure::Assembly(error));
    }

    pub(crate) fn record_scan<'a>(
        &mut self,
        scan: &ScanDataset,
        models: impl IntoIterator<Item = &'a str>,
    ) {
        self.scans_processed += 1;
        self.records += scan.len();
        for model in models {
            let Some(fit) = scan.fit(model) else {
                continue;
            };
            match fit.status {
                FitStatus::Converged => self.fits_converged += 1,
                FitStatus::Skipped => self.fits_skipped += 1,
                FitStatus::Failed => {
                    self.fits_failed += 1;
                    self.failures.push(ProcessingFailure::Fit {
                        source: scan.source().to_path_buf(),
                        model: model.to_string(),
                        message: fit.message.clone().unwrap_or_default(),
                    });
                }
            }
        }
    }

    /// Assembly failures only
    pub fn assembly_failures(&self) -> impl Iterator<Item = &ProcessingFailure> {
        self.failures.iter().filter(|f| f.is_assembly())
    }

    /// Fit failures only
    pub fn fit_failures(&self) -> impl Iterator<Item = &ProcessingFailure> {
        self.failures.iter().filter(|f| !f.is_assembly())
    }

    /// Whether nothing failed
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Scans per second
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.scans_processed as f64 / secs
        } else {
            0.0
        }
    }

    /// Format the report with colors (requires console feature)
    pub fn format_colored(&self) -> String {
        #[cfg(feature = "colorized_output")]
        {
            let mut output = String::new();
            output.push_str(&format!("{}\n", style("Scan Processing Summary").bold().cyan()));
            output.push_str(&format!("{}\n", style("=======================").cyan()));
            output.push_str(&format!(
                "{}: {} processed, {} failed ({} records)\n",
                style("Scans").bold(),
                style(self.scans_processed).green(),
                style(self.scans_failed).red(),
                self.records
            ));
            output.push_str(&format!(
                "{}: {} converged, {} failed, {} skipped\n",
                style("Fits").bold(),
                style(self.fits_converged).green(),
                style(self.fits_failed).red(),
                style(self.fits_skipped).yellow()
            ));
            output.push_str(&format!(
                "{}: {:.2}s ({:.1} scans/s)\n",
                style("Time").bold(),
                self.elapsed.as_secs_f64(),
                self.throughput()
            ));

            if !self.failures.is_empty() {
                output.push('\n');
                for failure in &self.failures {
                    output.push_str(&format!("[{}] {}\n", style("FAIL").red().bold(), failure));
                }
            }
            if self.stopped_early {
                output.push_str(&format!("\n{}\n", style("Stopped before the end of the source").yellow().bold()));
            }
            output
        }

        #[cfg(not(feature = "colorized_output"))]
        {
            format!("{}", self)
        }
    }
}

impl fmt::Display for ProcessingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scan Processing Summary")?;
        writeln!(f, "=======================")?;
        writeln!(
            f,
            "Scans: {} processed, {} failed ({} records)",
            self.scans_processed, self.scans_failed, self.records
        )?;
        writeln!(
            f,
            "Fits: {} converged, {} failed, {} skipped",
            self.fits_converged, self.fits_failed, self.fits_skipped
        )?;
        writeln!(
            f,
            "Time: {:.2}s ({:.1} scans/s)",
            self.elapsed.as_secs_f64(),
            self.throughput()
        )?;

        if !self.failures.is_empty() {
            writeln!(f)?;
            for failure in &self.failures {
                writeln!(f, "[FAIL] {failure}")?;
            }
        }
        if self.stopped_early {
            writeln!(f)?;
            writeln!(f, "Stopped before the end of the source")?;
        }
        Ok(())
    }
}

/// Result of a materialized pass
#[derive(Debug)]
pub struct ProcessingRun {
    /// Every processed scan, in discovery order
    pub collection: ProcessedDatasetCollection,
    /// Counters and failures
    pub summary: ProcessingSummary,
}
