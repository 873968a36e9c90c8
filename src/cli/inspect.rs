use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use edascan::metadata::ScanMetadata;

use super::PipelineConfig;

/// Display the metadata and layout of one scan file
pub fn run(file: PathBuf, config: Option<PathBuf>) -> Result<()> {
    if !file.exists() {
        bail!("File does not exist: {}", file.display());
    }

    let pipeline = PipelineConfig::load(config.as_deref())?;
    let scan = pipeline
        .assembler()?
        .assemble_path(&file, &ScanMetadata::new())
        .with_context(|| format!("Failed to read scan: {}", file.display()))?
        .with_context(|| format!("Scan was rejected by a metadata filter: {}", file.display()))?;

    println!("Scan File Information");
    println!("=====================");
    println!("File: {}", file.display());
    println!();

    let layout = scan.layout();
    println!("Columns:");
    println!("  independent: {}", layout.independent);
    for name in &layout.dependent {
        println!("  dependent:   {name}");
    }
    println!();

    println!("Records: {}", scan.len());
    let xs = scan.independent_values();
    if let (Some(first), Some(last)) = (xs.first(), xs.last()) {
        println!("  {} range: {first} .. {last}", layout.independent);
    }
    println!();

    println!("Metadata:");
    for (key, value) in scan.metadata().iter() {
        println!("  {key}: {value}");
    }

    Ok(())
}
