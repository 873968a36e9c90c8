//! TOML pipeline configuration.
//!
//! Every section is optional; anything left out keeps the library default:
//!
//! ```toml
//! # edascan.toml
//! [parser]
//! delimiter = ","
//! independent_column = "delay"
//! dependent_columns = ["kerr"]
//!
//! [source]
//! pattern = ".csv"
//! run_grouping = "directory"
//!
//! [[source.keywords.suffixes]]
//! suffix = "K"
//! key = "SetTemperature"
//!
//! [processor]
//! mode = "streaming"
//! batch_size = 32
//!
//! [[fit]]
//! model = "exponential_decay"
//! require_metadata = ["SetTemperature"]
//!
//! [fit.bounds.lifetime]
//! min = 0.0
//!
//! [[linked]]
//! model = "exponential_decay"
//! shared = ["lifetime"]
//! group_by = "Sample"
//!
//! [[aggregate]]
//! column = "reflectivity"
//! aggregation = "mean"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use edascan::collection::ColumnAggregate;
use edascan::metadata::KeywordRules;
use edascan::processor::{FitRequest, LinkedFitRequest, ProcessorConfig};
use edascan::record::ParserConfig;
use edascan::scan::ScanAssembler;
use edascan::source::SourceConfig;

/// Root configuration structure for edascan.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct PipelineConfig {
    /// Raw file layout.
    #[serde(default)]
    pub parser: ParserConfig,

    /// File discovery and path tagging.
    #[serde(default)]
    pub source: SourceSection,

    /// Processing mode and batching.
    #[serde(default)]
    pub processor: ProcessorConfig,

    /// Fit models to apply, in order.
    #[serde(default)]
    pub fit: Vec<FitRequest>,

    /// Joint fits run on the collection after the pass.
    #[serde(default)]
    pub linked: Vec<LinkedFitRequest>,

    /// Per-scan data column summaries added to every fit table.
    #[serde(default)]
    pub aggregate: Vec<ColumnAggregate>,
}

/// The `[source]` table: discovery settings plus keyword rules.
#[derive(Debug, Default, Deserialize)]
pub struct SourceSection {
    #[serde(flatten)]
    pub discovery: SourceConfig,

    #[serde(default)]
    pub keywords: KeywordRules,
}

impl PipelineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Load from `path` when given, otherwise use defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Assembler for the configured layout and keyword rules.
    pub fn assembler(&self) -> Result<ScanAssembler> {
        self.source
            .keywords
            .validate()
            .context("Invalid keyword rules")?;
        Ok(ScanAssembler::new(self.parser.clone()).with_keywords(self.source.keywords.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edascan::processor::ProcessingMode;
    use edascan::source::RunGrouping;

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [parser]
            delimiter = ","
            header_lines = 2

            [source]
            pattern = ".csv"
            recursive = false
            run_grouping = "single"

            [[source.keywords.suffixes]]
            suffix = "K"
            key = "SetTemperature"

            [processor]
            mode = "materialized"
            batch_size = 4

            [[fit]]
            model = "exponential_decay"
            require_metadata = ["SetTemperature"]

            [fit.bounds.lifetime]
            min = 0.0

            [[fit]]
            model = "linear"

            [[linked]]
            model = "exponential_decay"
            shared = ["lifetime"]

            [[aggregate]]
            column = "reflectivity"
            aggregation = "max"
        "#;

        let config = PipelineConfig::from_str(toml).unwrap();
        assert_eq!(config.parser.delimiter, ',');
        assert_eq!(config.parser.header_lines, 2);
        assert_eq!(config.source.discovery.pattern, ".csv");
        assert!(!config.source.discovery.recursive);
        assert_eq!(config.source.discovery.run_grouping, RunGrouping::Single);
        assert_eq!(config.source.keywords.suffixes[0].key, "SetTemperature");
        assert_eq!(config.processor.mode, ProcessingMode::Materialized);
        assert_eq!(config.processor.batch_size, 4);
        assert_eq!(config.fit.len(), 2);
        assert_eq!(config.fit[0].config.bounds["lifetime"].min, 0.0);
        assert_eq!(config.fit[1].model, "linear");
        assert_eq!(config.linked[0].shared, vec!["lifetime"]);
        assert_eq!(config.linked[0].group_by, None);
        assert_eq!(config.aggregate[0].header(), "reflectivity_max");
        assert!(config.assembler().is_ok());
    }

    #[test]
    fn test_partial_config() {
        let toml = r#"
            [source]
            pattern = ".txt"
        "#;

        let config = PipelineConfig::from_str(toml).unwrap();
        assert_eq!(config.source.discovery.pattern, ".txt");
        assert!(config.source.discovery.recursive);
        assert_eq!(config.parser, ParserConfig::default());
        assert!(config.fit.is_empty());
        assert!(config.linked.is_empty());
    }

    #[test]
    fn test_empty_config() {
        let config = PipelineConfig::from_str("").unwrap();
        assert_eq!(config.source.discovery, SourceConfig::default());
        assert!(config.source.keywords.is_empty());
    }

    #[test]
    fn test_invalid_keyword_rule() {
        let toml = r#"
            [[source.keywords.flags]]
            token = ""
            key = "Warmup?"
            value = "Yes"
        "#;

        let config = PipelineConfig::from_str(toml).unwrap();
        assert!(config.assembler().is_err());
    }

    #[test]
    fn test_malformed_config() {
        assert!(PipelineConfig::from_str("[processor]\nmode = 3").is_err());
    }
}
