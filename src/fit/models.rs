//! Built-in fit models.
//!
//! Each model estimates its starting parameters from the data, which is
//! usually close enough for the optimizer on clean single-feature scans.

use std::f64::consts::{PI, TAU};

use super::FitModel;

/// FWHM of a unit-sigma Gaussian
const GAUSSIAN_FWHM: f64 = 2.354_820_045;

/// Samples ordered by x, with a few summary statistics
struct Profile {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl Profile {
    fn new(xs: &[f64], ys: &[f64]) -> Self {
        let mut order: Vec<usize> = (0..xs.len().min(ys.len())).collect();
        order.sort_by(|&a, &b| xs[a].total_cmp(&xs[b]));
        Self {
            xs: order.iter().map(|&i| xs[i]).collect(),
            ys: order.iter().map(|&i| ys[i]).collect(),
        }
    }

    fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    fn span(&self) -> f64 {
        match (self.xs.first(), self.xs.last()) {
            (Some(first), Some(last)) if last > first => last - first,
            _ => 1.0,
        }
    }

    fn mean_y(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.ys.iter().sum::<f64>() / self.ys.len() as f64
    }

    /// Ordinary least-squares line through the data
    fn line(&self) -> (f64, f64) {
        if self.is_empty() {
            return (0.0, 0.0);
        }
        let n = self.xs.len() as f64;
        let mean_x = self.xs.iter().sum::<f64>() / n;
        let mean_y = self.mean_y();
        let (sxy, sxx) = self
            .xs
            .iter()
            .zip(&self.ys)
            .fold((0.0, 0.0), |(sxy, sxx), (x, y)| {
                (sxy + (x - mean_x) * (y - mean_y), sxx + (x - mean_x).powi(2))
            });
        let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
        (slope, mean_y - slope * mean_x)
    }

    /// Baseline from the two ends, then the sample furthest from it
    fn peak(&self) -> Option<(f64, f64, f64)> {
        let baseline = (self.ys.first()? + self.ys.last()?) / 2.0;
        let (i, _) = self
            .ys
            .iter()
            .enumerate()
            .max_by(|a, b| (a.1 - baseline).abs().total_cmp(&(b.1 - baseline).abs()))?;
        Some((self.xs[i], self.ys[i] - baseline, baseline))
    }

    /// Full width at half maximum of the peak, from sample counting
    fn half_max_width(&self, baseline: f64, amplitude: f64) -> f64 {
        let spacing = self.span() / (self.xs.len().max(2) - 1) as f64;
        let above = self
            .ys
            .iter()
            .filter(|y| ((*y - baseline) / amplitude) >= 0.5)
            .count();
        if above == 0 || amplitude == 0.0 {
            self.span() / 5.0
        } else {
            above as f64 * spacing
        }
    }
}

/// `slope * x + offset`
#[derive(Debug, Clone, Copy, Default)]
pub struct Linear;

impl FitModel for Linear {
    fn name(&self) -> &str {
        "linear"
    }

    fn parameter_names(&self) -> Vec<String> {
        vec!["slope".into(), "offset".into()]
    }

    fn evaluate(&self, x: f64, p: &[f64]) -> f64 {
        p[0] * x + p[1]
    }

    fn initial_guess(&self, xs: &[f64], ys: &[f64]) -> Vec<f64> {
        let (slope, offset) = Profile::new(xs, ys).line();
        vec![slope, offset]
    }
}

/// `curvature * x^2 + slope * x + offset`
#[derive(Debug, Clone, Copy, Default)]
pub struct Quadratic;

impl FitModel for Quadratic {
    fn name(&self) -> &str {
        "quadratic"
    }

    fn parameter_names(&self) -> Vec<String> {
        vec!["curvature".into(), "slope".into(), "offset".into()]
    }

    fn evaluate(&self, x: f64, p: &[f64]) -> f64 {
        (p[0] * x + p[1]) * x + p[2]
    }

    fn initial_guess(&self, xs: &[f64], ys: &[f64]) -> Vec<f64> {
        let (slope, offset) = Profile::new(xs, ys).line();
        vec![0.0, slope, offset]
    }
}

/// `amplitude * exp(-x / lifetime) + offset`
#[derive(Debug, Clone, Copy, Default)]
pub struct ExponentialDecay;

impl FitModel for ExponentialDecay {
    fn name(&self) -> &str {
        "exponential_decay"
    }

    fn parameter_names(&self) -> Vec<String> {
        vec!["amplitude".into(), "lifetime".into(), "offset".into()]
    }

    fn evaluate(&self, x: f64, p: &[f64]) -> f64 {
        p[0] * (-x / p[1]).exp() + p[2]
    }

    fn initial_guess(&self, xs: &[f64], ys: &[f64]) -> Vec<f64> {
        let profile = Profile::new(xs, ys);
        let (Some(&x0), Some(&y0), Some(&y_end)) =
            (profile.xs.first(), profile.ys.first(), profile.ys.last())
        else {
            return vec![1.0, 1.0, 0.0];
        };
        let lifetime = profile.span() / 3.0;
        let amplitude = (y0 - y_end) * (x0 / lifetime).exp();
        let amplitude = if amplitude.is_finite() {
            amplitude
        } else {
            y0 - y_end
        };
        vec![amplitude, lifetime, y_end]
    }
}

/// `amplitude * exp(-(x - center)^2 / (2 sigma^2)) + offset`
#[derive(Debug, Clone, Copy, Default)]
pub struct Gaussian;

impl FitModel for Gaussian {
    fn name(&self) -> &str {
        "gaussian"
    }

    fn parameter_names(&self) -> Vec<String> {
        vec![
            "amplitude".into(),
            "center".into(),
            "sigma".into(),
            "offset".into(),
        ]
    }

    fn evaluate(&self, x: f64, p: &[f64]) -> f64 {
        let z = (x - p[1]) / p[2];
        p[0] * (-0.5 * z * z).exp() + p[3]
    }

    fn initial_guess(&self, xs: &[f64], ys: &[f64]) -> Vec<f64> {
        let profile = Profile::new(xs, ys);
        match profile.peak() {
            Some((center, amplitude, baseline)) => {
                let sigma = profile.half_max_width(baseline, amplitude) / GAUSSIAN_FWHM;
                vec![amplitude, center, sigma, baseline]
            }
            None => vec![1.0, 0.0, 1.0, 0.0],
        }
    }
}

/// `amplitude * gamma^2 / ((x - center)^2 + gamma^2) + offset`
#[derive(Debug, Clone, Copy, Default)]
pub struct Lorentzian;

impl FitModel for Lorentzian {
    fn name(&self) -> &str {
        "lorentzian"
    }

    fn parameter_names(&self) -> Vec<String> {
        vec![
            "amplitude".into(),
            "center".into(),
            "gamma".into(),
            "offset".into(),
        ]
    }

    fn evaluate(&self, x: f64, p: &[f64]) -> f64 {
        let g2 = p[2] * p[2];
        p[0] * g2 / ((x - p[1]).powi(2) + g2) + p[3]
    }

    fn initial_guess(&self, xs: &[f64], ys: &[f64]) -> Vec<f64> {
        let profile = Profile::new(xs, ys);
        match profile.peak() {
            Some((center, amplitude, baseline)) => {
                let gamma = profile.half_max_width(baseline, amplitude) / 2.0;
                vec![amplitude, center, gamma, baseline]
            }
            None => vec![1.0, 0.0, 1.0, 0.0],
        }
    }
}

/// Exponentially damped cosine on a linear background, the usual
/// time-resolved Kerr rotation precession signal:
///
/// `amplitude * exp(-x / lifetime) * cos(2 pi frequency x + phase) + slope * x + offset`
#[derive(Debug, Clone, Copy, Default)]
pub struct DecayingCosine;

impl FitModel for DecayingCosine {
    fn name(&self) -> &str {
        "decaying_cosine"
    }

    fn parameter_names(&self) -> Vec<String> {
        vec![
            "amplitude".into(),
            "lifetime".into(),
            "frequency".into(),
            "phase".into(),
            "slope".into(),
            "offset".into(),
        ]
    }

    fn evaluate(&self, x: f64, p: &[f64]) -> f64 {
        p[0] * (-x / p[1]).exp() * (TAU * p[2] * x + p[3]).cos() + p[4] * x + p[5]
    }

    fn initial_guess(&self, xs: &[f64], ys: &[f64]) -> Vec<f64> {
        let profile = Profile::new(xs, ys);
        let offset = profile.mean_y();
        let span = profile.span();
        let centered: Vec<f64> = profile.ys.iter().map(|y| y - offset).collect();

        let amplitude = centered.iter().fold(0.0_f64, |acc, y| acc.max(y.abs()));
        let crossings = centered
            .windows(2)
            .filter(|w| (w[0] < 0.0) != (w[1] < 0.0))
            .count();
        let frequency = crossings.max(1) as f64 / (2.0 * span);
        let phase = match centered.first() {
            Some(first) if *first < 0.0 => PI,
            _ => 0.0,
        };
        vec![amplitude.max(f64::EPSILON), span, frequency, phase, 0.0, offset]
    }
}

/// Every built-in model
pub fn builtin_models() -> Vec<Box<dyn FitModel>> {
    vec![
        Box::new(Linear),
        Box::new(Quadratic),
        Box::new(ExponentialDecay),
        Box::new(Gaussian),
        Box::new(Lorentzian),
        Box::new(DecayingCosine),
    ]
}
