use anyhow::{bail, Context, Result};
use log::info;
use std::path::PathBuf;

use edascan::simulation::{linspace, ScanSimulator, TrkrSweep};

/// Highest field of the demo sweep in mT
const MAX_FIELD_MT: f64 = 600.0;

/// Longest pump-probe delay of the demo sweep in ps
const MAX_DELAY_PS: f64 = 7000.0;

/// Generate a simulated magnetic field sweep of TRKR scans
pub fn run(dir: PathBuf, scans: usize, points: usize, seed: u64, noise: f64) -> Result<()> {
    if scans == 0 || points < 2 {
        bail!("Need at least one scan and two points per scan");
    }
    if !(noise >= 0.0 && noise.is_finite()) {
        bail!("Noise must be a finite, non-negative number, got {noise}");
    }

    info!("edascan demo - TRKR magnetic field sweep");
    info!("========================================");

    let sweep = TrkrSweep::default();
    let fields = linspace(MAX_FIELD_MT / scans as f64, MAX_FIELD_MT, scans);
    let parameters = sweep.scans(&fields, seed);

    let mut simulator = ScanSimulator::new(TrkrSweep::model(), linspace(0.0, MAX_DELAY_PS, points), seed)
        .with_noise(noise)
        .with_columns("Delay (ps)", "Kerr Rotation");

    let paths = simulator
        .write_all(&dir, &parameters)
        .with_context(|| format!("Failed to write demo scans to {}", dir.display()))?;

    println!("Wrote {} scans to {}", paths.len(), dir.display());
    println!();
    println!("Fit them with:");
    println!(
        "  edascan process {} --model decaying_cosine --sort-by \"Magnetic Field (mT)\"",
        dir.display()
    );

    Ok(())
}
