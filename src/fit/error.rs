/// A fit model name that is not registered
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown fit model '{name}' (available: {})", available.join(", "))]
pub struct UnknownModelError {
    /// Requested name
    pub name: String,
    /// Registered names
    pub available: Vec<String>,
}

/// Why the least-squares optimizer stopped without a solution
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolverError {
    /// Fewer data points than free parameters
    #[error("Underdetermined: {points} data points for {parameters} parameters")]
    Underdetermined {
        /// Data points
        points: usize,
        /// Parameters
        parameters: usize,
    },

    /// Iteration cap reached before convergence
    #[error("No convergence after {iterations} iterations")]
    IterationLimit {
        /// Iterations performed
        iterations: usize,
    },

    /// Normal matrix could not be inverted (parameters not identifiable)
    #[error("Singular Jacobian: parameters are not identifiable from the data")]
    SingularJacobian,

    /// Residuals or Jacobian contained NaN or infinity
    #[error("Non-finite residuals at parameters {0:?}")]
    NonFinite(Vec<f64>),

    /// Initial guess has the wrong number of parameters
    #[error("Initial guess has {found} values, model has {expected} parameters")]
    GuessLength {
        /// Model parameter count
        expected: usize,
        /// Values supplied
        found: usize,
    },
}
