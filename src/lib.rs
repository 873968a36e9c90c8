//! # edascan
//!
//! Streaming ingestion, aggregation and curve fitting for laboratory scan
//! data.
//!
//! A scan is one instrument sweep stored as a delimited-text file: a header
//! block of `key: value` lines followed by rows of an independent variable
//! (delay, field, wavelength, ...) and one or more measured channels.
//! edascan turns a directory of such files into a queryable collection of
//! fitted datasets without ever holding more than a batch of raw records in
//! memory.
//!
//! ## Pipeline
//!
//! ```text
//! files ──► RecordParser ──► ScanAssembler ──► DatasetSource
//!                                                   │
//!                 FitModelRegistry ──► ScanDatasetProcessor
//!                                                   │
//!                         ProcessedDatasetCollection ──► DataBrowser
//! ```
//!
//! - [`record`]: pull-based parser for raw scan files
//! - [`metadata`]: typed scan metadata from headers and file paths
//! - [`scan`]: all-or-nothing assembly of complete scans
//! - [`source`]: directory discovery and lazy scan iteration
//! - [`fit`]: fit model trait, built-in models and the bounded solver
//! - [`processor`]: streaming or materialized fitting runs
//! - [`collection`]: indexed results and read-only browsing views
//! - [`simulation`]: synthetic scans for testing and demos
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edascan::prelude::*;
//!
//! let registry = FitModelRegistry::with_builtin_models();
//! let processor = ScanDatasetProcessor::new(
//!     &registry,
//!     vec![FitRequest::new("exponential_decay")],
//!     ProcessorConfig::default(),
//! )?;
//!
//! let assembler = ScanAssembler::new(ParserConfig::default());
//! let source = DatasetSource::from_directory("measurements", &SourceConfig::default(), assembler)?;
//!
//! let mut collection = ProcessedDatasetCollection::new();
//! let summary = processor.process(&source, &mut collection);
//! println!("{summary}");
//!
//! let view = collection
//!     .browser()
//!     .with_fit_status("exponential_decay", FitStatus::Converged)
//!     .sort_by(&SortKey::metadata("Temperature"), SortOrder::Ascending);
//! for scan in view.iter() {
//!     println!("{}: {:?}", scan.source().display(), scan.fit("exponential_decay"));
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Features
//!
//! - `parallel` (default): fit scans of a batch in parallel with rayon
//! - `colorized_output` (default): colored summary reports

#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod collection;
pub mod fit;
pub mod metadata;
pub mod processor;
pub mod record;
pub mod scan;
pub mod simulation;
pub mod source;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::collection::{
        Aggregation, ColumnAggregate, DataBrowser, FitTable, FitTableRow,
        ProcessedDatasetCollection, SortKey, SortOrder,
    };
    pub use crate::fit::{
        fit_linked_samples, fit_samples, FitConfig, FitModel, FitModelRegistry, FitResult,
        FitStatus, FnModel, LinkedFit, ParameterBounds, UnknownModelError,
    };
    pub use crate::metadata::{HeaderSplit, KeywordRules, MetadataValue, ScanMetadata};
    pub use crate::processor::{
        CancelToken, FitRequest, LinkedFitRequest, ProcessingMode, ProcessingSummary,
        ProcessorConfig, ProcessorError, ScanDatasetProcessor, ScanSink,
    };
    pub use crate::record::{ColumnLayout, ParseError, ParserConfig, RawRecord, RecordParser};
    pub use crate::scan::{IncompleteScanError, ScanAssembler, ScanDataset};
    pub use crate::source::{DatasetSource, RunGrouping, SourceConfig, SourceError};
}
