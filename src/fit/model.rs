use std::collections::BTreeMap;
use std::fmt;

use log::trace;

use super::solver::{minimize, SolverOptions};
use super::{FitConfig, FitResult, FittedParameter, ParameterBounds};
use crate::scan::ScanDataset;

/// A named parametric model that can be fitted to a scan.
///
/// Implementors provide the model function and optionally a data-driven
/// initial guess; [`fit`](FitModel::fit) runs bounded Levenberg–Marquardt
/// least squares by default.
pub trait FitModel: Send + Sync {
    /// Registry name
    fn name(&self) -> &str;

    /// Ordered parameter names, matching the `params` slice of
    /// [`evaluate`](FitModel::evaluate)
    fn parameter_names(&self) -> Vec<String>;

    /// Model value at `x`
    fn evaluate(&self, x: f64, params: &[f64]) -> f64;

    /// Starting parameters estimated from the data
    fn initial_guess(&self, xs: &[f64], ys: &[f64]) -> Vec<f64> {
        let _ = (xs, ys);
        vec![1.0; self.parameter_names().len()]
    }

    /// Fit the model to one scan.
    ///
    /// Never fails: problems are reported as a [`FitStatus::Failed`]
    /// result.
    ///
    /// [`FitStatus::Failed`]: super::FitStatus::Failed
    fn fit(&self, scan: &ScanDataset, config: &FitConfig) -> FitResult {
        match scan.samples(config.dependent_column.as_deref()) {
            Some((xs, ys)) => fit_samples(self, &xs, &ys, config),
            None => FitResult::failed(
                self.name(),
                format!(
                    "Dependent column '{}' not present",
                    config.dependent_column.as_deref().unwrap_or("<first>")
                ),
            ),
        }
    }
}

/// Fit `model` to paired samples
pub fn fit_samples<M: FitModel + ?Sized>(
    model: &M,
    xs: &[f64],
    ys: &[f64],
    config: &FitConfig,
) -> FitResult {
    let name = model.name();
    let names = model.parameter_names();

    if xs.len() != ys.len() {
        return FitResult::failed(
            name,
            format!("{} x values but {} y values", xs.len(), ys.len()),
        );
    }
    let (guess, bounds) = match starting_point(model, &names, xs, ys, config) {
        Ok(start) => start,
        Err(message) => return FitResult::failed(name, message),
    };

    let options = SolverOptions {
        max_iterations: config.max_iterations,
        tolerance: config.tolerance,
    };
    let residuals = |params: &[f64], out: &mut [f64]| {
        for ((r, &x), &y) in out.iter_mut().zip(xs).zip(ys) {
            *r = y - model.evaluate(x, params);
        }
    };

    match minimize(residuals, xs.len(), &guess, &bounds, &options) {
        Ok(solution) => {
            trace!(
                "{name}: converged in {} iterations, chi2_red = {:e}",
                solution.iterations,
                solution.reduced_chi_square()
            );
            let parameters: BTreeMap<String, FittedParameter> = names
                .into_iter()
                .enumerate()
                .map(|(j, param)| {
                    let fitted = FittedParameter {
                        value: solution.parameters[j],
                        uncertainty: solution.uncertainties.as_ref().map(|u| u[j]),
                    };
                    (param, fitted)
                })
                .collect();
            FitResult::converged(
                name,
                parameters,
                solution.reduced_chi_square(),
                solution.iterations,
            )
        }
        Err(e) => FitResult::failed(name, e.to_string()),
    }
}

/// Initial parameters (model estimate overridden by `config`) and bounds
/// for one dataset, in parameter order
pub(super) fn starting_point<M: FitModel + ?Sized>(
    model: &M,
    names: &[String],
    xs: &[f64],
    ys: &[f64],
    config: &FitConfig,
) -> Result<(Vec<f64>, Vec<ParameterBounds>), String> {
    if let Some(unknown) = config
        .initial_guess
        .keys()
        .chain(config.bounds.keys())
        .find(|key| !names.contains(*key))
    {
        return Err(format!("Unknown parameter '{unknown}'"));
    }

    let mut guess = model.initial_guess(xs, ys);
    if guess.len() != names.len() {
        return Err(format!(
            "Initial guess has {} values, model has {} parameters",
            guess.len(),
            names.len()
        ));
    }
    for (value, param) in guess.iter_mut().zip(names) {
        if let Some(v) = config.initial_guess.get(param) {
            *value = *v;
        }
    }

    let mut bounds = Vec::with_capacity(names.len());
    for param in names {
        let b = config.bounds.get(param).copied().unwrap_or_default();
        if !b.is_valid() {
            return Err(format!("Empty bounds for '{param}': [{}, {}]", b.min, b.max));
        }
        bounds.push(b);
    }
    Ok((guess, bounds))
}

type ModelFn = dyn Fn(f64, &[f64]) -> f64 + Send + Sync;
type GuessFn = dyn Fn(&[f64], &[f64]) -> Vec<f64> + Send + Sync;

/// A fit model built from closures
pub struct FnModel {
    name: String,
    parameters: Vec<String>,
    function: Box<ModelFn>,
    guess: Option<Box<GuessFn>>,
}

impl FnModel {
    /// Create a model from a name, parameter names and model function
    pub fn new<F>(name: &str, parameters: &[&str], function: F) -> Self
    where
        F: Fn(f64, &[f64]) -> f64 + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
            function: Box::new(function),
            guess: None,
        }
    }

    /// Estimate starting parameters with `guess` instead of all ones
    pub fn with_initial_guess<G>(mut self, guess: G) -> Self
    where
        G: Fn(&[f64], &[f64]) -> Vec<f64> + Send + Sync + 'static,
    {
        self.guess = Some(Box::new(guess));
        self
    }
}

impl fmt::Debug for FnModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnModel")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish()
    }
}

impl FitModel for FnModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameter_names(&self) -> Vec<String> {
        self.parameters.clone()
    }

    fn evaluate(&self, x: f64, params: &[f64]) -> f64 {
        (self.function)(x, params)
    }

    fn initial_guess(&self, xs: &[f64], ys: &[f64]) -> Vec<f64> {
        match &self.guess {
            Some(guess) => guess(xs, ys),
            None => vec![1.0; self.parameters.len()],
        }
    }
}
