use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use edascan::collection::{SortKey, SortOrder};
use edascan::processor::ProcessingMode;

mod config;
mod demo;
mod inspect;
mod models;
mod process;

pub use config::PipelineConfig;

/// edascan - streaming ingestion and curve fitting for laboratory scan data
#[derive(Parser)]
#[command(name = "edascan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Processing mode override.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ModeArg {
    /// Fit scans batch by batch as they are read
    Streaming,
    /// Read every scan first, then fit
    Materialized,
}

impl From<ModeArg> for ProcessingMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Streaming => ProcessingMode::Streaming,
            ModeArg::Materialized => ProcessingMode::Materialized,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fit every scan file under a directory and print a summary table
    Process {
        /// Directory to search for scan files
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Load pipeline settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Fit model to apply (repeatable, added to the config's [[fit]] list)
        #[arg(short = 'm', long = "model", value_name = "NAME")]
        models: Vec<String>,

        /// Processing mode (streaming, materialized)
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Substring scan file names must contain
        #[arg(short = 'p', long)]
        pattern: Option<String>,

        /// Sort rows by a metadata key or `fit:<model>.<parameter>`
        #[arg(short = 's', long, value_name = "KEY")]
        sort_by: Option<SortKey>,

        /// Sort in descending order
        #[arg(long, requires = "sort_by")]
        descending: bool,

        /// Print tables as JSON instead of CSV
        #[arg(long)]
        json: bool,
    },

    /// Parse one scan file and show its metadata
    Inspect {
        /// Scan file path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Load parser and keyword settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// List the built-in fit models
    Models,

    /// Write a simulated TRKR magnetic field sweep
    Demo {
        /// Output directory
        #[arg(value_name = "DIR", default_value = "demo_scans")]
        dir: PathBuf,

        /// Number of scans (field values)
        #[arg(short = 'n', long, default_value = "10")]
        scans: usize,

        /// Points per scan
        #[arg(long, default_value = "500")]
        points: usize,

        /// Random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Standard deviation of the added noise
        #[arg(long, default_value = "0.01")]
        noise: f64,
    },
}

/// Options of the `process` command
pub struct ProcessOptions {
    pub dir: PathBuf,
    pub config: Option<PathBuf>,
    pub models: Vec<String>,
    pub mode: Option<ProcessingMode>,
    pub pattern: Option<String>,
    pub sort: Option<(SortKey, SortOrder)>,
    pub json: bool,
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Process {
            dir,
            config,
            models,
            mode,
            pattern,
            sort_by,
            descending,
            json,
        } => {
            let order = if descending {
                SortOrder::Descending
            } else {
                SortOrder::Ascending
            };
            process::run(ProcessOptions {
                dir,
                config,
                models,
                mode: mode.map(ProcessingMode::from),
                pattern,
                sort: sort_by.map(|key| (key, order)),
                json,
            })
        }
        Commands::Inspect { file, config } => inspect::run(file, config),
        Commands::Models => models::run(),
        Commands::Demo {
            dir,
            scans,
            points,
            seed,
            noise,
        } => demo::run(dir, scans, points, seed, noise),
    }
}
