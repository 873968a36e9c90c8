use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default optimizer step cap
pub const DEFAULT_MAX_ITERATIONS: usize = 200;

/// Default relative convergence tolerance
pub const DEFAULT_TOLERANCE: f64 = 1e-10;

/// Permissible range of one parameter (inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterBounds {
    /// Lower bound
    pub min: f64,
    /// Upper bound
    pub max: f64,
}

impl ParameterBounds {
    /// Create bounds
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether the range is non-empty
    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }

    /// Project a value into the range
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }
}

impl Default for ParameterBounds {
    fn default() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }
    }
}

/// Per-request fitting configuration.
///
/// Parameters are addressed by name. Names missing from `initial_guess` use
/// the model's own estimate; names missing from `bounds` are unbounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Starting parameter values
    pub initial_guess: BTreeMap<String, f64>,
    /// Permissible parameter ranges
    pub bounds: BTreeMap<String, ParameterBounds>,
    /// Optimizer step cap
    pub max_iterations: usize,
    /// Relative tolerance on cost reduction, step size and gradient
    pub tolerance: f64,
    /// Dependent column to fit (first dependent column when unset)
    pub dependent_column: Option<String>,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            initial_guess: BTreeMap::new(),
            bounds: BTreeMap::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            dependent_column: None,
        }
    }
}

impl FitConfig {
    /// Set a starting value
    pub fn with_guess(mut self, parameter: &str, value: f64) -> Self {
        self.initial_guess.insert(parameter.to_string(), value);
        self
    }

    /// Set a parameter range
    pub fn with_bounds(mut self, parameter: &str, min: f64, max: f64) -> Self {
        self.bounds
            .insert(parameter.to_string(), ParameterBounds::new(min, max));
        self
    }

    /// Set the optimizer step cap
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Fit a dependent column other than the first
    pub fn with_dependent_column(mut self, column: &str) -> Self {
        self.dependent_column = Some(column.to_string());
        self
    }
}
