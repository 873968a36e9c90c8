//! Synthetic scan generation.
//!
//! A [`ScanSimulator`] evaluates any [`FitModel`] on a fixed sweep, adds
//! seeded Gaussian noise and writes the result as raw scan files that the
//! record parser reads back. [`TrkrSweep`] produces the parameter sets for a
//! time-resolved Kerr rotation magnetic field sweep.

use std::f64::consts::TAU;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::fit::{DecayingCosine, FitModel};
use crate::metadata::ScanMetadata;
use crate::record::{write_scan, ColumnLayout, RawRecord};

/// Larmor frequency per unit g-factor and field: Bohr magneton / h, in
/// 1/(ps mT)
pub const GFACTOR_CONSTANT: f64 = 1.3996e-5;

/// Metadata key prefix for the parameters a scan was simulated with
pub const TRUTH_PREFIX: &str = "Simulated ";

/// `n` evenly spaced values from `start` to `stop` inclusive
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// One normally distributed sample (Box–Muller)
pub fn gaussian_noise<R: Rng + ?Sized>(rng: &mut R, sigma: f64) -> f64 {
    if sigma == 0.0 {
        return 0.0;
    }
    // gen::<f64>() is in [0, 1); keep u1 away from zero for the logarithm
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    sigma * (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

/// Description of one scan to simulate
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedScan {
    /// File name, e.g. `trkr_200mT.dat`
    pub name: String,
    /// Model parameters in model order
    pub parameters: Vec<f64>,
    /// Extra header metadata
    pub metadata: ScanMetadata,
}

/// Generates noisy scans from a model on a fixed sweep
pub struct ScanSimulator {
    model: Arc<dyn FitModel>,
    xs: Vec<f64>,
    noise: f64,
    layout: ColumnLayout,
    rng: StdRng,
}

impl ScanSimulator {
    /// Simulate `model` at sweep points `xs`, seeding the noise generator
    pub fn new(model: Arc<dyn FitModel>, xs: Vec<f64>, seed: u64) -> Self {
        Self {
            model,
            xs,
            noise: 0.0,
            layout: ColumnLayout::new("x", vec!["y".to_string()]),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Standard deviation of the additive noise
    pub fn with_noise(mut self, sigma: f64) -> Self {
        self.noise = sigma;
        self
    }

    /// Column names written to the files (only the first dependent column
    /// is filled)
    pub fn with_columns(mut self, independent: &str, dependent: &str) -> Self {
        self.layout = ColumnLayout::new(independent, vec![dependent.to_string()]);
        self
    }

    /// Sweep points
    pub fn sweep(&self) -> &[f64] {
        &self.xs
    }

    /// Evaluate the model with noise at every sweep point
    pub fn records(&mut self, parameters: &[f64]) -> Vec<RawRecord> {
        let mut records = Vec::with_capacity(self.xs.len());
        for (index, &x) in self.xs.iter().enumerate() {
            let y = self.model.evaluate(x, parameters) + gaussian_noise(&mut self.rng, self.noise);
            records.push(RawRecord::new(index, x, vec![y]));
        }
        records
    }

    /// Write one scan into `dir`, returning its path.
    ///
    /// The header carries the scan's metadata and the true parameters under
    /// `Simulated <name>` keys.
    pub fn write(&mut self, dir: &Path, scan: &SimulatedScan) -> io::Result<PathBuf> {
        let names = self.model.parameter_names();
        if names.len() != scan.parameters.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "{} parameters given, model '{}' has {}",
                    scan.parameters.len(),
                    self.model.name(),
                    names.len()
                ),
            ));
        }

        let mut metadata = scan.metadata.clone();
        for (name, value) in names.iter().zip(&scan.parameters) {
            metadata.insert(format!("{TRUTH_PREFIX}{name}"), *value);
        }
        let records = self.records(&scan.parameters);

        let path = dir.join(&scan.name);
        let mut out = BufWriter::new(File::create(&path)?);
        write_scan(&mut out, &metadata, &self.layout, &records, b'\t')?;
        debug!("Wrote simulated scan {}", path.display());
        Ok(path)
    }

    /// Write every scan into `dir` (created if missing)
    pub fn write_all(&mut self, dir: &Path, scans: &[SimulatedScan]) -> io::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        scans.iter().map(|scan| self.write(dir, scan)).collect()
    }
}

/// Parameter distribution of a time-resolved Kerr rotation field sweep.
///
/// Every scan is a damped spin precession at `g * B * GFACTOR_CONSTANT`
/// with amplitude and lifetime drawn around their means, plus a small
/// random linear background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrkrSweep {
    /// Mean precession amplitude
    pub amplitude_mean: f64,
    /// Amplitude spread between scans
    pub amplitude_std: f64,
    /// Electron g-factor
    pub gfactor: f64,
    /// Mean spin lifetime in ps
    pub lifetime_mean: f64,
    /// Lifetime spread between scans in ps
    pub lifetime_std: f64,
    /// Precession phase at zero delay
    pub phase: f64,
    /// Spread of the background slope
    pub slope_scale: f64,
    /// Spread of the background offset
    pub offset_scale: f64,
}

impl Default for TrkrSweep {
    fn default() -> Self {
        Self {
            amplitude_mean: 1.0,
            amplitude_std: 0.05,
            gfactor: 0.44,
            lifetime_mean: 5000.0,
            lifetime_std: 200.0,
            phase: 0.0,
            slope_scale: 1e-6,
            offset_scale: 0.01,
        }
    }
}

impl TrkrSweep {
    /// The model the sweep parameters are meant for
    pub fn model() -> Arc<dyn FitModel> {
        Arc::new(DecayingCosine)
    }

    /// Precession frequency in 1/ps at field `field_mt`
    pub fn frequency(&self, field_mt: f64) -> f64 {
        GFACTOR_CONSTANT * self.gfactor * field_mt
    }

    /// One scan per field value (mT), named `trkr_<index>_<field>mT.dat`
    pub fn scans(&self, fields_mt: &[f64], seed: u64) -> Vec<SimulatedScan> {
        let mut rng = StdRng::seed_from_u64(seed);
        fields_mt
            .iter()
            .enumerate()
            .map(|(index, &field)| {
                let parameters = vec![
                    self.amplitude_mean + gaussian_noise(&mut rng, self.amplitude_std),
                    self.lifetime_mean + gaussian_noise(&mut rng, self.lifetime_std),
                    self.frequency(field),
                    self.phase,
                    gaussian_noise(&mut rng, self.slope_scale),
                    gaussian_noise(&mut rng, self.offset_scale),
                ];
                let mut metadata = ScanMetadata::new();
                metadata.insert("Magnetic Field (mT)", field);
                metadata.insert("FastScanIndex", index as i64);
                SimulatedScan {
                    name: format!("trkr_{index:03}_{field:.0}mT.dat"),
                    parameters,
                    metadata,
                }
            })
            .collect()
    }
}
