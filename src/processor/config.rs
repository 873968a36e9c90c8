use serde::{Deserialize, Serialize};

use crate::fit::FitConfig;

/// Scans fitted together in one parallel batch
pub const DEFAULT_BATCH_SIZE: usize = 16;

/// How scans flow from the source to the sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    /// Fit each scan as it arrives and hand it on; memory stays bounded by
    /// the batch size
    #[default]
    Streaming,
    /// Load every scan first, then fit, then hand them on in discovery order
    Materialized,
}

/// Processor settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Streaming or materialized pass
    pub mode: ProcessingMode,
    /// Fit scans of a batch on the rayon pool (needs the `parallel` feature)
    pub parallel: bool,
    /// Scans per fitting batch in streaming mode
    pub batch_size: usize,
    /// Depth of the background read-ahead queue; 0 reads on the calling
    /// thread
    pub prefetch: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            mode: ProcessingMode::default(),
            parallel: cfg!(feature = "parallel"),
            batch_size: DEFAULT_BATCH_SIZE,
            prefetch: 0,
        }
    }
}

impl ProcessorConfig {
    /// Sequential streaming, one scan at a time
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            batch_size: 1,
            ..Default::default()
        }
    }

    /// Materialized pass with default parallelism
    pub fn materialized() -> Self {
        Self {
            mode: ProcessingMode::Materialized,
            ..Default::default()
        }
    }

    /// Read scans on a background thread, `depth` scans ahead
    pub fn with_prefetch(mut self, depth: usize) -> Self {
        self.prefetch = depth;
        self
    }
}

/// One model to apply to every scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitRequest {
    /// Registered model name
    pub model: String,
    /// Fit settings
    #[serde(flatten)]
    pub config: FitConfig,
    /// Metadata keys a scan must carry; scans missing any are recorded as
    /// skipped
    #[serde(default)]
    pub require_metadata: Vec<String>,
}

impl FitRequest {
    /// Request a model with default settings
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            config: FitConfig::default(),
            require_metadata: Vec::new(),
        }
    }

    /// Use these fit settings
    pub fn with_config(mut self, config: FitConfig) -> Self {
        self.config = config;
        self
    }

    /// Only fit scans carrying `key`
    pub fn requiring(mut self, key: &str) -> Self {
        self.require_metadata.push(key.to_string());
        self
    }
}

/// A joint fit across several scans sharing some parameters.
///
/// The model must also be one of the processor's [`FitRequest`]s; its fit
/// settings are reused. Results are recorded on each scan under
/// [`result_name`](LinkedFitRequest::result_name) so they sit next to the
/// independent fits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedFitRequest {
    /// Registered model name
    pub model: String,
    /// Parameters common to every scan of a group
    pub shared: Vec<String>,
    /// Fit each group of scans with equal values of this metadata key
    /// separately; scans without the key are left out. Unset links every
    /// scan.
    #[serde(default)]
    pub group_by: Option<String>,
}

impl LinkedFitRequest {
    /// Link `model` across scans, sharing `shared`
    pub fn new(model: &str, shared: &[&str]) -> Self {
        Self {
            model: model.to_string(),
            shared: shared.iter().map(|p| p.to_string()).collect(),
            group_by: None,
        }
    }

    /// Fit groups of scans with equal `key` separately
    pub fn grouped_by(mut self, key: &str) -> Self {
        self.group_by = Some(key.to_string());
        self
    }

    /// Name the per-scan results are recorded under
    pub fn result_name(&self) -> String {
        format!("{}_linked", self.model)
    }
}
