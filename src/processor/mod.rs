//! # Scan Dataset Processor
//!
//! Drives a [`DatasetSource`] through the requested fit models and hands
//! every finished scan to a [`ScanSink`].
//!
//! Two modes are available, selected by [`ProcessorConfig::mode`]:
//!
//! - **Streaming** fits scans as they arrive, in batches of
//!   [`ProcessorConfig::batch_size`]. Only one batch is held in memory.
//! - **Materialized** reads the whole source first, then fits everything,
//!   then delivers the scans in discovery order.
//!
//! Both modes produce the same fit results. Per-file and per-fit failures are
//! collected in the [`ProcessingSummary`]; only configuration errors are
//! returned as `Err`.
//!
//! After a pass, [`ScanDatasetProcessor::fit_linked`] fits one requested
//! model jointly across chosen scans of a collection, sharing some
//! parameters between them ([`LinkedFitRequest`]).
//!
//! ## Example
//!
//! ```rust,no_run
//! use edascan::fit::FitModelRegistry;
//! use edascan::processor::{FitRequest, ProcessorConfig, ScanDatasetProcessor};
//! use edascan::scan::ScanAssembler;
//! use edascan::source::{DatasetSource, SourceConfig};
//!
//! let registry = FitModelRegistry::with_builtin_models();
//! let processor = ScanDatasetProcessor::new(
//!     &registry,
//!     vec![FitRequest::new("exponential_decay")],
//!     ProcessorConfig::materialized(),
//! )?;
//!
//! let source = DatasetSource::from_directory("data", &SourceConfig::default(), ScanAssembler::default())?;
//! let run = processor.materialize(&source);
//! println!("{}", run.summary);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod config;
mod error;
#[cfg(feature = "parallel")]
mod parallel;
mod sink;
mod summary;

#[cfg(test)]
mod tests;

pub use config::{
    FitRequest, LinkedFitRequest, ProcessingMode, ProcessorConfig, DEFAULT_BATCH_SIZE,
};
pub use error::ProcessorError;
pub use sink::{CancelToken, ScanSink};
pub use summary::{ProcessingFailure, ProcessingRun, ProcessingSummary};

use std::collections::HashSet;
use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};

use crate::collection::ProcessedDatasetCollection;
use crate::fit::{fit_linked_samples, FitModel, FitModelRegistry, FitResult, LinkedFit};
use crate::scan::{IncompleteScanError, ScanDataset};
use crate::source::DatasetSource;

/// A fit request with its model resolved
struct ResolvedRequest {
    request: FitRequest,
    model: Arc<dyn FitModel>,
}

/// Applies a fixed set of fit models to every scan of a source
pub struct ScanDatasetProcessor {
    requests: Vec<ResolvedRequest>,
    config: ProcessorConfig,
    cancel: CancelToken,
}

impl fmt::Debug for ScanDatasetProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanDatasetProcessor")
            .field("models", &self.model_names().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}

impl ScanDatasetProcessor {
    /// Resolve every request against `registry`.
    ///
    /// Fails before any scan is read if a model is unknown, requested twice,
    /// or the configuration is unusable.
    pub fn new(
        registry: &FitModelRegistry,
        requests: Vec<FitRequest>,
        config: ProcessorConfig,
    ) -> Result<Self, ProcessorError> {
        if config.batch_size == 0 {
            return Err(ProcessorError::InvalidConfig(
                "batch_size must be at least 1".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(requests.len());
        for request in requests {
            if !seen.insert(request.model.clone()) {
                return Err(ProcessorError::DuplicateModel(request.model));
            }
            let model = registry.get(&request.model)?;
            resolved.push(ResolvedRequest { request, model });
        }

        Ok(Self {
            requests: resolved,
            config,
            cancel: CancelToken::new(),
        })
    }

    /// Share an existing cancellation token
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops a running pass
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Processor settings
    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Requested models in application order
    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.requests.iter().map(|r| r.request.model.as_str())
    }

    /// Apply every requested model to one scan, replacing earlier results of
    /// the same models
    pub fn fit_scan(&self, scan: &mut ScanDataset) {
        for ResolvedRequest { request, model } in &self.requests {
            let result = match request
                .require_metadata
                .iter()
                .find(|key| !scan.metadata().contains_key(key))
            {
                Some(missing) => FitResult::skipped(
                    model.name(),
                    format!("Metadata '{missing}' not present"),
                ),
                None => model.fit(scan, &request.config),
            };
            debug!(
                "{}: {} {}",
                scan.source().display(),
                result.model,
                result.status
            );
            scan.insert_fit(result);
        }
    }

    /// Run one pass over `source`, delivering each processed scan to `sink`
    pub fn process<S: ScanSink + ?Sized>(
        &self,
        source: &DatasetSource,
        sink: &mut S,
    ) -> ProcessingSummary {
        self.run(source, sink, self.config.mode)
    }

    /// Run a materialized pass into a new collection, whatever the
    /// configured mode
    pub fn materialize(&self, source: &DatasetSource) -> ProcessingRun {
        let mut collection = ProcessedDatasetCollection::new();
        let summary = self.run(source, &mut collection, ProcessingMode::Materialized);
        ProcessingRun {
            collection,
            summary,
        }
    }

    /// Re-run every requested model on an existing collection, overwriting
    /// earlier results of the same models
    pub fn refit(&self, collection: &mut ProcessedDatasetCollection) -> ProcessingSummary {
        let start = Instant::now();
        let mut summary = ProcessingSummary::default();
        let scans = collection.scans_mut();
        info!("Refitting {} scans", scans.len());

        self.fit_all(scans);
        for scan in scans.iter() {
            summary.record_scan(scan, self.model_names());
        }
        summary.elapsed = start.elapsed();
        summary
    }

    /// Fit `request.model` jointly to the scans at `positions`, sharing
    /// `request.shared`, and record each scan's part of the result under
    /// [`LinkedFitRequest::result_name`]. `request.group_by` is not consulted.
    ///
    /// Scans missing required metadata or the dependent column are recorded
    /// as skipped and left out of the joint fit. Repeated positions count
    /// once.
    pub fn fit_linked(
        &self,
        collection: &mut ProcessedDatasetCollection,
        positions: &[usize],
        request: &LinkedFitRequest,
    ) -> Result<LinkedFit, ProcessorError> {
        let ResolvedRequest {
            request: fit_request,
            model,
        } = self
            .requests
            .iter()
            .find(|r| r.request.model == request.model)
            .ok_or_else(|| ProcessorError::NotRequested(request.model.clone()))?;

        let len = collection.len();
        if let Some(&position) = positions.iter().find(|&&p| p >= len) {
            return Err(ProcessorError::InvalidPosition { position, len });
        }

        let name = request.result_name();
        let column = fit_request.config.dependent_column.as_deref();
        let scans = collection.scans_mut();
        let mut seen = HashSet::new();
        let mut included = Vec::with_capacity(positions.len());
        let mut datasets = Vec::with_capacity(positions.len());

        for &position in positions.iter().filter(|&&p| seen.insert(p)) {
            let scan = &mut scans[position];
            if let Some(missing) = fit_request
                .require_metadata
                .iter()
                .find(|key| !scan.metadata().contains_key(key))
            {
                scan.insert_fit(FitResult::skipped(
                    &name,
                    format!("Metadata '{missing}' not present"),
                ));
                continue;
            }
            match scan.samples(column) {
                Some(samples) => {
                    included.push(position);
                    datasets.push(samples);
                }
                None => {
                    scan.insert_fit(FitResult::skipped(
                        &name,
                        format!(
                            "Dependent column '{}' not present",
                            column.unwrap_or("<first>")
                        ),
                    ));
                }
            }
        }

        let linked = fit_linked_samples(
            model.as_ref(),
            &name,
            &datasets,
            &request.shared,
            &fit_request.config,
        );
        for (&position, result) in included.iter().zip(&linked.results) {
            scans[position].insert_fit(result.clone());
        }
        info!(
            "{name}: linked {} scans sharing [{}], {}",
            included.len(),
            request.shared.join(", "),
            if linked.is_converged() { "converged" } else { "failed" }
        );
        Ok(linked)
    }

    /// Run `request` over a whole collection, once per `group_by` group
    pub fn fit_linked_groups(
        &self,
        collection: &mut ProcessedDatasetCollection,
        request: &LinkedFitRequest,
    ) -> Result<Vec<LinkedFit>, ProcessorError> {
        let groups: Vec<Vec<usize>> = match &request.group_by {
            None => vec![(0..collection.len()).collect()],
            Some(key) => collection
                .unique_values(key)
                .iter()
                .map(|value| collection.positions_of(key, value))
                .collect(),
        };
        groups
            .iter()
            .map(|positions| self.fit_linked(collection, positions, request))
            .collect()
    }

    fn run<S: ScanSink + ?Sized>(
        &self,
        source: &DatasetSource,
        sink: &mut S,
        mode: ProcessingMode,
    ) -> ProcessingSummary {
        let start = Instant::now();
        let mut summary = ProcessingSummary::default();
        info!(
            "Processing {} files ({:?} mode, {} models)",
            source.len(),
            mode,
            self.requests.len()
        );

        match mode {
            ProcessingMode::Streaming if self.config.prefetch > 0 => {
                self.stream_prefetched(source, sink, &mut summary);
            }
            ProcessingMode::Streaming => self.consume(source.scans(), sink, &mut summary),
            ProcessingMode::Materialized => {
                self.process_materialized(source, sink, &mut summary);
            }
        }

        summary.elapsed = start.elapsed();
        info!(
            "Processed {} scans ({} failed) in {:.2}s",
            summary.scans_processed,
            summary.scans_failed,
            summary.elapsed.as_secs_f64()
        );
        summary
    }

    fn stream_prefetched<S: ScanSink + ?Sized>(
        &self,
        source: &DatasetSource,
        sink: &mut S,
        summary: &mut ProcessingSummary,
    ) {
        let (tx, rx) = crossbeam_channel::bounded(self.config.prefetch);
        let cancel = &self.cancel;
        std::thread::scope(|scope| {
            scope.spawn(move || {
                for item in source.scans() {
                    if cancel.is_cancelled() || tx.send(item).is_err() {
                        break;
                    }
                }
            });
            // Dropping the receiver on early exit unblocks the reader
            self.consume(rx.into_iter(), sink, summary);
        });
    }

    fn consume<I, S>(&self, items: I, sink: &mut S, summary: &mut ProcessingSummary)
    where
        I: Iterator<Item = Result<ScanDataset, IncompleteScanError>>,
        S: ScanSink + ?Sized,
    {
        let batch_size = if self.parallel_enabled() {
            self.config.batch_size
        } else {
            1
        };
        let mut batch = Vec::with_capacity(batch_size);

        for item in items {
            if self.cancel.is_cancelled() {
                summary.stopped_early = true;
                return;
            }
            match item {
                Ok(scan) => {
                    batch.push(scan);
                    if batch.len() >= batch_size
                        && self.deliver(&mut batch, sink, summary).is_break()
                    {
                        return;
                    }
                }
                Err(e) => summary.record_incomplete(e),
            }
        }
        let _ = self.deliver(&mut batch, sink, summary);
    }

    fn process_materialized<S: ScanSink + ?Sized>(
        &self,
        source: &DatasetSource,
        sink: &mut S,
        summary: &mut ProcessingSummary,
    ) {
        let mut scans = Vec::with_capacity(source.len());
        for item in source.scans() {
            if self.cancel.is_cancelled() {
                summary.stopped_early = true;
                return;
            }
            match item {
                Ok(scan) => scans.push(scan),
                Err(e) => summary.record_incomplete(e),
            }
        }
        debug!("Materialized {} scans", scans.len());
        let _ = self.deliver(&mut scans, sink, summary);
    }

    /// Fit and hand on a batch in order; scans after a stop are dropped
    fn deliver<S: ScanSink + ?Sized>(
        &self,
        batch: &mut Vec<ScanDataset>,
        sink: &mut S,
        summary: &mut ProcessingSummary,
    ) -> ControlFlow<()> {
        if batch.is_empty() {
            return ControlFlow::Continue(());
        }
        if self.cancel.is_cancelled() {
            summary.stopped_early = true;
            batch.clear();
            return ControlFlow::Break(());
        }

        self.fit_all(batch);
        for scan in batch.drain(..) {
            summary.record_scan(&scan, self.model_names());
            if sink.accept(scan).is_break() {
                summary.stopped_early = true;
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn fit_all(&self, scans: &mut [ScanDataset]) {
        #[cfg(feature = "parallel")]
        if self.config.parallel && scans.len() > 1 {
            self.fit_parallel(scans);
            return;
        }
        for scan in scans.iter_mut() {
            self.fit_scan(scan);
        }
    }

    fn parallel_enabled(&self) -> bool {
        cfg!(feature = "parallel") && self.config.parallel
    }
}
