//! # edascan
//!
//! Command-line front end for the edascan scan processing pipeline.
//!
//! ## Usage
//!
//! ```bash
//! # Write a simulated field sweep
//! edascan demo demo_scans --scans 20
//!
//! # Fit every scan and print a CSV table sorted by field
//! edascan process demo_scans --model decaying_cosine --sort-by "Magnetic Field (mT)"
//!
//! # Use a pipeline config file and emit JSON
//! edascan process data/ --config edascan.toml --json
//!
//! # Show one file's metadata
//! edascan inspect data/sample_30K_Ind_3.dat
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
