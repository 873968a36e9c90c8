//! # Fit Model Registry
//!
//! Named parametric models applied to scans by nonlinear least squares.
//!
//! A [`FitModel`] supplies its parameter names, model function and a
//! data-driven initial guess. Fitting never raises: convergence failures,
//! unidentifiable parameters and non-finite residuals come back as a
//! [`FitResult`] with [`FitStatus::Failed`] and a diagnostic message.
//!
//! [`fit_linked_samples`] fits one model to several datasets at once, with
//! chosen parameters shared by all of them.
//!
//! ## Example
//!
//! ```rust
//! use edascan::fit::{FitConfig, FitModelRegistry, fit_samples};
//!
//! let registry = FitModelRegistry::with_builtin_models();
//! let linear = registry.get("linear").unwrap();
//!
//! let xs = [0.0, 1.0, 2.0, 3.0];
//! let ys = [1.0, 3.0, 5.0, 7.0];
//! let result = fit_samples(linear.as_ref(), &xs, &ys, &FitConfig::default());
//! assert!(result.is_converged());
//! assert!((result.value("slope").unwrap() - 2.0).abs() < 1e-6);
//! ```

mod config;
mod error;
mod linked;
mod model;
mod models;
mod registry;
mod result;
pub mod solver;


pub use config::{FitConfig, ParameterBounds, DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE};
pub use error::{SolverError, UnknownModelError};
pub use linked::{fit_linked_samples, LinkedFit};
pub use model::{fit_samples, FitModel, FnModel};
pub use models::{
    builtin_models, DecayingCosine, ExponentialDecay, Gaussian, Linear, Lorentzian, Quadratic,
};
pub use registry::FitModelRegistry;
pub use result::{FitResult, FitStatus, FittedParameter};
