use serde::{Deserialize, Serialize};

/// Default filename pattern for raw scan files
pub const DEFAULT_PATTERN: &str = ".dat";

/// How `Run ID` metadata is assigned to discovered files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunGrouping {
    /// A new run starts whenever the parent directory changes in discovery
    /// order
    #[default]
    Directory,
    /// Every file belongs to run 0
    Single,
}

/// File discovery settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Substring a file name must contain
    pub pattern: String,
    /// Descend into subdirectories
    pub recursive: bool,
    /// Follow symbolic links while walking
    pub follow_links: bool,
    /// `Run ID` assignment
    pub run_grouping: RunGrouping,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.to_string(),
            recursive: true,
            follow_links: false,
            run_grouping: RunGrouping::default(),
        }
    }
}

impl SourceConfig {
    /// Match files containing `pattern` instead of `.dat`
    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.pattern = pattern.to_string();
        self
    }

    /// The pattern, when it is a file extension such as `.csv`
    pub fn extension(&self) -> Option<&str> {
        let rest = self.pattern.strip_prefix('.')?;
        (!rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric()))
            .then_some(self.pattern.as_str())
    }

    /// Only look at the root directory itself
    pub fn non_recursive(mut self) -> Self {
        self.recursive = false;
        self
    }

    /// Use a different run grouping
    pub fn with_run_grouping(mut self, run_grouping: RunGrouping) -> Self {
        self.run_grouping = run_grouping;
        self
    }
}
