use std::collections::BTreeMap;

use log::trace;
use serde::{Deserialize, Serialize};

use super::model::starting_point;
use super::solver::{minimize, SolverOptions};
use super::{FitConfig, FitModel, FitResult, FittedParameter, ParameterBounds};

/// One model fitted to several datasets at once, with some parameters
/// shared by all of them.
///
/// `results` holds one entry per dataset, in input order. Shared parameters
/// carry the same value and uncertainty in every entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedFit {
    /// Name the per-dataset results are recorded under
    pub model: String,
    /// Parameters common to every dataset
    pub shared: Vec<String>,
    /// Per-dataset results
    pub results: Vec<FitResult>,
}

impl LinkedFit {
    /// Whether the joint fit converged
    pub fn is_converged(&self) -> bool {
        !self.results.is_empty() && self.results.iter().all(FitResult::is_converged)
    }

    /// Fitted value of a shared parameter
    pub fn shared_value(&self, parameter: &str) -> Option<f64> {
        if !self.shared.iter().any(|p| p == parameter) {
            return None;
        }
        self.results.first().and_then(|r| r.value(parameter))
    }

    fn failed(name: &str, shared: &[String], datasets: usize, message: String) -> Self {
        Self {
            model: name.to_string(),
            shared: shared.to_vec(),
            results: (0..datasets)
                .map(|_| FitResult::failed(name, message.clone()))
                .collect(),
        }
    }
}

/// Where each model parameter lives in the joint parameter vector
struct Packing {
    shared: Vec<usize>,
    local: Vec<usize>,
}

impl Packing {
    fn width(&self, datasets: usize) -> usize {
        self.shared.len() + datasets * self.local.len()
    }

    /// Model parameters of dataset `k` taken from the joint vector
    fn unpack(&self, joint: &[f64], k: usize, out: &mut [f64]) {
        for (i, &j) in self.shared.iter().enumerate() {
            out[j] = joint[i];
        }
        let base = self.shared.len() + k * self.local.len();
        for (i, &j) in self.local.iter().enumerate() {
            out[j] = joint[base + i];
        }
    }
}

/// Fit `model` jointly to `datasets`, sharing the parameters named in
/// `shared` and fitting every other parameter per dataset.
///
/// Each dataset starts from the model's own estimate with `config`
/// overrides; shared parameters start at the mean of those estimates.
/// Bounds apply to every copy of a parameter. Like [`fit_samples`], this
/// never fails: problems are reported as failed results for every dataset.
///
/// [`fit_samples`]: super::fit_samples
pub fn fit_linked_samples<M: FitModel + ?Sized>(
    model: &M,
    name: &str,
    datasets: &[(Vec<f64>, Vec<f64>)],
    shared: &[String],
    config: &FitConfig,
) -> LinkedFit {
    let names = model.parameter_names();
    let fail = |message: String| LinkedFit::failed(name, shared, datasets.len(), message);

    if let Some(unknown) = shared.iter().find(|p| !names.contains(*p)) {
        return fail(format!("Unknown shared parameter '{unknown}'"));
    }
    if datasets.is_empty() {
        return LinkedFit::failed(name, shared, 0, String::new());
    }

    let packing = Packing {
        shared: (0..names.len()).filter(|&j| shared.contains(&names[j])).collect(),
        local: (0..names.len()).filter(|&j| !shared.contains(&names[j])).collect(),
    };

    let mut starts = Vec::with_capacity(datasets.len());
    for (k, (xs, ys)) in datasets.iter().enumerate() {
        if xs.len() != ys.len() {
            return fail(format!(
                "Dataset {k}: {} x values but {} y values",
                xs.len(),
                ys.len()
            ));
        }
        match starting_point(model, &names, xs, ys, config) {
            Ok(start) => starts.push(start),
            Err(message) => return fail(format!("Dataset {k}: {message}")),
        }
    }
    let bounds_of = |j: usize| -> ParameterBounds { starts[0].1[j] };

    let mut guess = Vec::with_capacity(packing.width(datasets.len()));
    let mut bounds = Vec::with_capacity(guess.capacity());
    for &j in &packing.shared {
        let mean = starts.iter().map(|(g, _)| g[j]).sum::<f64>() / starts.len() as f64;
        guess.push(bounds_of(j).clamp(mean));
        bounds.push(bounds_of(j));
    }
    for (g, _) in &starts {
        for &j in &packing.local {
            guess.push(g[j]);
            bounds.push(bounds_of(j));
        }
    }

    let offsets: Vec<usize> = datasets
        .iter()
        .scan(0, |end, (xs, _)| {
            let start = *end;
            *end += xs.len();
            Some(start)
        })
        .collect();
    let n_residuals: usize = datasets.iter().map(|(xs, _)| xs.len()).sum();

    let residuals = |joint: &[f64], out: &mut [f64]| {
        let mut params = vec![0.0; names.len()];
        for (k, (xs, ys)) in datasets.iter().enumerate() {
            packing.unpack(joint, k, &mut params);
            let block = &mut out[offsets[k]..offsets[k] + xs.len()];
            for ((r, &x), &y) in block.iter_mut().zip(xs).zip(ys) {
                *r = y - model.evaluate(x, &params);
            }
        }
    };

    let options = SolverOptions {
        max_iterations: config.max_iterations,
        tolerance: config.tolerance,
    };
    let solution = match minimize(residuals, n_residuals, &guess, &bounds, &options) {
        Ok(solution) => solution,
        Err(e) => return fail(e.to_string()),
    };
    trace!(
        "{name}: linked fit of {} datasets converged in {} iterations, chi2_red = {:e}",
        datasets.len(),
        solution.iterations,
        solution.reduced_chi_square()
    );

    let mut values = vec![0.0; names.len()];
    let mut errors = vec![0.0; names.len()];
    let results = (0..datasets.len())
        .map(|k| {
            packing.unpack(&solution.parameters, k, &mut values);
            if let Some(u) = &solution.uncertainties {
                packing.unpack(u, k, &mut errors);
            }
            let parameters: BTreeMap<String, FittedParameter> = names
                .iter()
                .enumerate()
                .map(|(j, param)| {
                    let fitted = FittedParameter {
                        value: values[j],
                        uncertainty: solution.uncertainties.as_ref().map(|_| errors[j]),
                    };
                    (param.clone(), fitted)
                })
                .collect();
            FitResult::converged(
                name,
                parameters,
                solution.reduced_chi_square(),
                solution.iterations,
            )
        })
        .collect();

    LinkedFit {
        model: name.to_string(),
        shared: shared.to_vec(),
        results,
    }
}
