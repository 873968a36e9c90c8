//! Bounded Levenberg–Marquardt least squares.
//!
//! Minimizes `sum(r_i(p)^2)` for a residual function `r` with a
//! forward-difference Jacobian. Bounds are enforced by projecting every
//! trial step back into the box.

use nalgebra::{DMatrix, DVector};

use super::{ParameterBounds, SolverError};

const INITIAL_DAMPING: f64 = 1e-3;
const MIN_DAMPING: f64 = 1e-12;
const MAX_DAMPING: f64 = 1e16;
/// Smallest eigenvalue of the unit-diagonal normal matrix still treated as identifiable
const EIGENVALUE_THRESHOLD: f64 = 1e-12;

/// Optimizer stopping criteria
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOptions {
    /// Outer iteration cap
    pub max_iterations: usize,
    /// Relative tolerance on cost reduction, step size and gradient
    pub tolerance: f64,
}

/// A converged least-squares solution
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Best-fit parameters
    pub parameters: Vec<f64>,
    /// One-sigma standard errors; `None` with zero degrees of freedom
    pub uncertainties: Option<Vec<f64>>,
    /// Sum of squared residuals at the solution
    pub sum_squares: f64,
    /// Residual count minus parameter count
    pub degrees_of_freedom: usize,
    /// Outer iterations used
    pub iterations: usize,
}

impl Solution {
    /// Sum of squares per degree of freedom
    pub fn reduced_chi_square(&self) -> f64 {
        self.sum_squares / self.degrees_of_freedom.max(1) as f64
    }
}

/// Minimize the squared residuals computed by `residuals`.
///
/// `residuals(params, out)` fills `out` (length `n_residuals`). `bounds`
/// must be empty or have one entry per parameter.
pub fn minimize<F>(
    residuals: F,
    n_residuals: usize,
    initial: &[f64],
    bounds: &[ParameterBounds],
    options: &SolverOptions,
) -> Result<Solution, SolverError>
where
    F: Fn(&[f64], &mut [f64]),
{
    let m = initial.len();
    let n = n_residuals;
    if n < m {
        return Err(SolverError::Underdetermined {
            points: n,
            parameters: m,
        });
    }

    let project = |p: &mut [f64]| {
        for (value, b) in p.iter_mut().zip(bounds) {
            *value = b.clamp(*value);
        }
    };

    let mut params = initial.to_vec();
    project(&mut params);

    let mut r = vec![0.0; n];
    residuals(&params, &mut r);
    if !all_finite(&r) {
        return Err(SolverError::NonFinite(params));
    }
    let mut cost = sum_squares(&r);

    if m == 0 {
        return Ok(Solution {
            parameters: params,
            uncertainties: None,
            sum_squares: cost,
            degrees_of_freedom: n,
            iterations: 0,
        });
    }

    let tol = options.tolerance;
    let mut damping = INITIAL_DAMPING;
    let mut trial = vec![0.0; m];
    let mut r_trial = vec![0.0; n];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < options.max_iterations {
        iterations += 1;

        let jac = jacobian(&residuals, &params, &r, bounds)?;
        let normal = jac.tr_mul(&jac);
        let gradient = jac.tr_mul(&DVector::from_column_slice(&r));

        // Gradient orthogonal to every Jacobian column
        let residual_norm = cost.sqrt();
        if residual_norm == 0.0 {
            converged = true;
            break;
        }
        let gradient_cos = (0..m)
            .filter(|&j| normal[(j, j)] > 0.0)
            .map(|j| gradient[j].abs() / (normal[(j, j)].sqrt() * residual_norm))
            .fold(0.0, f64::max);
        if gradient_cos <= tol {
            converged = true;
            break;
        }

        let mut improved = false;
        while damping <= MAX_DAMPING {
            let Some(step) = damped_step(&normal, &gradient, damping) else {
                damping *= 10.0;
                continue;
            };

            for j in 0..m {
                trial[j] = params[j] + step[j];
            }
            project(&mut trial);
            residuals(&trial, &mut r_trial);
            let trial_cost = sum_squares(&r_trial);
            if !trial_cost.is_finite() || trial_cost >= cost {
                damping *= 10.0;
                continue;
            }

            let reduction = (cost - trial_cost) / cost.max(f64::MIN_POSITIVE);
            let step_small = params
                .iter()
                .zip(&trial)
                .all(|(old, new)| (new - old).abs() <= tol * (old.abs() + tol));

            params.copy_from_slice(&trial);
            std::mem::swap(&mut r, &mut r_trial);
            cost = trial_cost;
            damping = (damping / 10.0).max(MIN_DAMPING);
            improved = true;

            if reduction <= tol || step_small {
                converged = true;
            }
            break;
        }

        // No downhill step at any damping: numerically at a minimum
        if !improved {
            converged = true;
        }
        if converged {
            break;
        }
    }

    if !converged {
        return Err(SolverError::IterationLimit { iterations });
    }

    let jac = jacobian(&residuals, &params, &r, bounds)?;
    let covariance = inverse_normal(&jac.tr_mul(&jac)).ok_or(SolverError::SingularJacobian)?;

    let dof = n - m;
    let uncertainties = (dof > 0).then(|| {
        let scale = cost / dof as f64;
        covariance
            .diagonal()
            .iter()
            .map(|v| (v * scale).max(0.0).sqrt())
            .collect()
    });

    Ok(Solution {
        parameters: params,
        uncertainties,
        sum_squares: cost,
        degrees_of_freedom: dof,
        iterations,
    })
}

fn sum_squares(r: &[f64]) -> f64 {
    r.iter().map(|v| v * v).sum()
}

fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

/// Forward-difference Jacobian, stepping backwards at an upper bound
fn jacobian<F>(
    residuals: &F,
    params: &[f64],
    r: &[f64],
    bounds: &[ParameterBounds],
) -> Result<DMatrix<f64>, SolverError>
where
    F: Fn(&[f64], &mut [f64]),
{
    let n = r.len();
    let m = params.len();
    let mut jac = DMatrix::<f64>::zeros(n, m);
    let mut shifted = params.to_vec();
    let mut r_shifted = vec![0.0; n];

    for j in 0..m {
        let mut h = f64::EPSILON.sqrt() * params[j].abs().max(1.0);
        if let Some(b) = bounds.get(j) {
            if params[j] + h > b.max {
                h = -h;
            }
        }
        shifted[j] = params[j] + h;
        residuals(&shifted, &mut r_shifted);
        shifted[j] = params[j];

        if !all_finite(&r_shifted) {
            return Err(SolverError::NonFinite(params.to_vec()));
        }
        for (i, (moved, base)) in r_shifted.iter().zip(r).enumerate() {
            jac[(i, j)] = (moved - base) / h;
        }
    }
    Ok(jac)
}

/// Solve `(J^T J + damping * diag) step = -J^T r` by Cholesky factorization
fn damped_step(normal: &DMatrix<f64>, gradient: &DVector<f64>, damping: f64) -> Option<DVector<f64>> {
    let mut augmented = normal.clone();
    for j in 0..augmented.nrows() {
        augmented[(j, j)] += damping * normal[(j, j)].max(MIN_DAMPING);
    }
    let step = augmented.cholesky()?.solve(&(-gradient));
    step.iter().all(|v| v.is_finite()).then_some(step)
}

/// Invert `J^T J` after scaling it to unit diagonal, so identifiability does
/// not depend on parameter units
fn inverse_normal(normal: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let d = normal.diagonal().map(f64::sqrt);
    if d.iter().any(|&v| !(v > 0.0) || !v.is_finite()) {
        return None;
    }

    let scaled = DMatrix::from_fn(normal.nrows(), normal.ncols(), |i, j| {
        normal[(i, j)] / (d[i] * d[j])
    });
    let smallest = scaled
        .symmetric_eigenvalues()
        .iter()
        .fold(f64::INFINITY, |acc, &v| acc.min(v));
    if !(smallest > EIGENVALUE_THRESHOLD) {
        return None;
    }

    let inverse = scaled.try_inverse()?;
    Some(DMatrix::from_fn(inverse.nrows(), inverse.ncols(), |i, j| {
        inverse[(i, j)] / (d[i] * d[j])
    }))
}
