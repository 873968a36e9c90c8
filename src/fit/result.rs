use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of a fit attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitStatus {
    /// The optimizer converged
    Converged,
    /// The fit was attempted and failed
    Failed,
    /// The fit was deliberately not attempted
    Skipped,
}

impl fmt::Display for FitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitStatus::Converged => write!(f, "converged"),
            FitStatus::Failed => write!(f, "failed"),
            FitStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// A fitted parameter value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FittedParameter {
    /// Best-fit value
    pub value: f64,
    /// One-sigma standard error, when it could be estimated
    pub uncertainty: Option<f64>,
}

/// Result of applying one fit model to one scan.
///
/// Failures are results too: a failed or skipped fit is recorded with its
/// diagnostic so "not attempted" and "attempted and failed" stay distinct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    /// Model name
    pub model: String,
    /// Outcome
    pub status: FitStatus,
    /// Fitted parameters (empty unless converged)
    pub parameters: BTreeMap<String, FittedParameter>,
    /// Reduced chi-square of the final residuals
    pub goodness_of_fit: Option<f64>,
    /// Optimizer iterations used
    pub iterations: usize,
    /// Diagnostic for failed or skipped fits
    pub message: Option<String>,
}

impl FitResult {
    /// A converged fit
    pub fn converged(
        model: impl Into<String>,
        parameters: BTreeMap<String, FittedParameter>,
        goodness_of_fit: f64,
        iterations: usize,
    ) -> Self {
        Self {
            model: model.into(),
            status: FitStatus::Converged,
            parameters,
            goodness_of_fit: Some(goodness_of_fit),
            iterations,
            message: None,
        }
    }

    /// A failed fit with its diagnostic
    pub fn failed(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            status: FitStatus::Failed,
            parameters: BTreeMap::new(),
            goodness_of_fit: None,
            iterations: 0,
            message: Some(message.into()),
        }
    }

    /// A fit that was not attempted
    pub fn skipped(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            status: FitStatus::Skipped,
            parameters: BTreeMap::new(),
            goodness_of_fit: None,
            iterations: 0,
            message: Some(reason.into()),
        }
    }

    /// Whether the fit converged
    pub fn is_converged(&self) -> bool {
        self.status == FitStatus::Converged
    }

    /// Fitted value of one parameter
    pub fn value(&self, parameter: &str) -> Option<f64> {
        self.parameters.get(parameter).map(|p| p.value)
    }

    /// Standard error of one parameter
    pub fn uncertainty(&self, parameter: &str) -> Option<f64> {
        self.parameters.get(parameter).and_then(|p| p.uncertainty)
    }
}
