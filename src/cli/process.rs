use anyhow::{bail, Context, Result};
use log::info;
use std::io::{self, Write};

use edascan::collection::{FitTable, ProcessedDatasetCollection};
use edascan::fit::FitModelRegistry;
use edascan::processor::{FitRequest, ScanDatasetProcessor};
use edascan::source::DatasetSource;

use super::{PipelineConfig, ProcessOptions};

/// Fit every scan under a directory and print one table per model
pub fn run(options: ProcessOptions) -> Result<()> {
    let mut pipeline = PipelineConfig::load(options.config.as_deref())?;

    if let Some(pattern) = options.pattern {
        pipeline.source.discovery.pattern = pattern;
    }
    if let Some(mode) = options.mode {
        pipeline.processor.mode = mode;
    }
    let linked_models: Vec<String> = pipeline.linked.iter().map(|l| l.model.clone()).collect();
    for model in options.models.iter().chain(&linked_models) {
        if !pipeline.fit.iter().any(|request| &request.model == model) {
            pipeline.fit.push(FitRequest::new(model));
        }
    }
    if pipeline.fit.is_empty() {
        bail!("No fit models requested (use --model or a [[fit]] table in the config file)");
    }

    let registry = FitModelRegistry::with_builtin_models();
    let processor = ScanDatasetProcessor::new(&registry, pipeline.fit.clone(), pipeline.processor.clone())
        .context("Invalid processing configuration")?;

    let source = DatasetSource::from_directory(
        &options.dir,
        &pipeline.source.discovery,
        pipeline.assembler()?,
    )
    .with_context(|| format!("Failed to open scan directory: {}", options.dir.display()))?;

    info!(
        "Processing {} files from {} ({:?} mode)",
        source.len(),
        options.dir.display(),
        pipeline.processor.mode
    );

    let mut collection = ProcessedDatasetCollection::new();
    let summary = processor.process(&source, &mut collection);

    let mut table_models: Vec<String> = processor.model_names().map(str::to_string).collect();
    for request in &pipeline.linked {
        let fits = processor
            .fit_linked_groups(&mut collection, request)
            .context("Invalid linked fit")?;
        let converged = fits.iter().filter(|fit| fit.is_converged()).count();
        info!(
            "{}: {converged} of {} linked groups converged",
            request.result_name(),
            fits.len()
        );
        table_models.push(request.result_name());
    }

    let mut view = collection.browser();
    if let Some((key, order)) = &options.sort {
        view = view.sort_by(key, *order);
    }
    let tables: Vec<FitTable> = table_models
        .iter()
        .map(|model| view.fit_table_with(model, &pipeline.aggregate))
        .collect();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if options.json {
        serde_json::to_writer_pretty(&mut out, &tables).context("Failed to write JSON")?;
        writeln!(out)?;
    } else {
        for (i, table) in tables.iter().enumerate() {
            if i > 0 {
                writeln!(out)?;
            }
            writeln!(out, "# {}", table.model)?;
            table.write_csv(&mut out).context("Failed to write CSV")?;
        }
    }
    out.flush()?;

    eprintln!("{}", summary.format_colored());

    if collection.is_empty() && !source.is_empty() {
        bail!("No scan in {} could be processed", options.dir.display());
    }
    Ok(())
}
