//! # Dataset Source
//!
//! A lazily evaluated collection of raw scan files.
//!
//! Discovery walks a root directory once, keeps files whose name contains
//! the configured pattern and sorts them by full path, so the order is
//! reproducible for a given directory state. Scans are only read when
//! [`DatasetSource::scans`] is iterated, and every call starts a fresh pass.
//!
//! ## Example
//!
//! ```rust,no_run
//! use edascan::scan::ScanAssembler;
//! use edascan::source::{DatasetSource, SourceConfig};
//!
//! let source = DatasetSource::from_directory(
//!     "data/2016-02-24",
//!     &SourceConfig::default(),
//!     ScanAssembler::default(),
//! )?;
//!
//! for scan in source.scans() {
//!     match scan {
//!         Ok(scan) => println!("{}: {} records", scan.source().display(), scan.len()),
//!         Err(e) => eprintln!("skipped: {e}"),
//!     }
//! }
//! # Ok::<(), edascan::source::SourceError>(())
//! ```

mod config;
mod error;
mod iterators;

#[cfg(test)]
mod tests;

pub use config::{RunGrouping, SourceConfig, DEFAULT_PATTERN};
pub use error::SourceError;
pub use iterators::ScanIter;

use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

use crate::metadata::{ScanMetadata, RUN_ID_KEY};
use crate::scan::{IncompleteScanError, ScanAssembler, ScanDataset};

/// An ordered set of raw scan files and the assembler that reads them
#[derive(Debug, Clone)]
pub struct DatasetSource {
    files: Vec<PathBuf>,
    run_ids: Vec<i64>,
    assembler: ScanAssembler,
}

impl DatasetSource {
    /// Discover scan files under `root`.
    ///
    /// Fails only when `root` is not a directory or the pattern is empty;
    /// unreadable entries below the root are logged and skipped. When the
    /// pattern is a file extension, keyword rules strip that extension.
    pub fn from_directory<P: AsRef<Path>>(
        root: P,
        config: &SourceConfig,
        mut assembler: ScanAssembler,
    ) -> Result<Self, SourceError> {
        let files = discover(root.as_ref(), config)?;
        if let Some(extension) = config.extension() {
            assembler.set_keyword_extension(extension);
        }
        debug!(
            "Discovered {} scan files under {}",
            files.len(),
            root.as_ref().display()
        );
        Ok(Self::from_paths(files, config.run_grouping, assembler))
    }

    /// Use an explicit file list, kept in the given order
    pub fn from_paths<I, P>(paths: I, run_grouping: RunGrouping, assembler: ScanAssembler) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let files: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        let run_ids = assign_runs(&files, run_grouping);
        Self {
            files,
            run_ids,
            assembler,
        }
    }

    /// Files in iteration order
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Number of files (scans rejected by a filter still count)
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no file was discovered
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Assembler used for every file
    pub fn assembler(&self) -> &ScanAssembler {
        &self.assembler
    }

    /// `Run ID` of the file at `index`
    pub fn run_id(&self, index: usize) -> Option<i64> {
        self.run_ids.get(index).copied()
    }

    /// Start a fresh lazy pass over the scans
    pub fn scans(&self) -> ScanIter<'_> {
        ScanIter {
            source: self,
            next: 0,
        }
    }

    /// Assemble the file at `index`; `Ok(None)` when it is out of range or
    /// filtered out
    pub fn assemble_at(&self, index: usize) -> Result<Option<ScanDataset>, IncompleteScanError> {
        let (Some(path), Some(&run_id)) = (self.files.get(index), self.run_ids.get(index)) else {
            return Ok(None);
        };
        let mut context = ScanMetadata::new();
        context.insert(RUN_ID_KEY, run_id);
        let result = self.assembler.assemble_path(path, &context);
        if let Err(e) = &result {
            warn!("{e}");
        }
        result
    }
}

/// List files under `root` whose name contains the configured pattern,
/// sorted by full path
pub fn discover(root: &Path, config: &SourceConfig) -> Result<Vec<PathBuf>, SourceError> {
    if !root.is_dir() {
        return Err(SourceError::InvalidRoot(root.to_path_buf()));
    }
    if config.pattern.is_empty() {
        return Err(SourceError::EmptyPattern);
    }

    let mut walker = WalkDir::new(root).follow_links(config.follow_links);
    if !config.recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {e}", root.display());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.contains(&config.pattern));
        if matches {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

fn assign_runs(files: &[PathBuf], grouping: RunGrouping) -> Vec<i64> {
    match grouping {
        RunGrouping::Single => vec![0; files.len()],
        RunGrouping::Directory => {
            let mut run_ids = Vec::with_capacity(files.len());
            let mut current: Option<&Path> = None;
            let mut run_id = -1;
            for file in files {
                let parent = file.parent();
                if run_id < 0 || parent != current {
                    run_id += 1;
                    current = parent;
                }
                run_ids.push(run_id);
            }
            run_ids
        }
    }
}
