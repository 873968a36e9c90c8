use super::*;
use crate::fit::{FitConfig, FitStatus};
use crate::scan::ScanAssembler;
use crate::source::SourceConfig;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

fn write_linear(dir: &Path, name: &str, slope: f64, rows: usize) {
    let mut text = format!("# Slope: {slope}\nx\ty\n");
    for i in 0..rows {
        text.push_str(&format!("{i}\t{}\n", slope * i as f64 + 1.0));
    }
    fs::write(dir.join(name), text).unwrap();
}

/// Five good scans and one with a truncated body
fn fixture() -> (TempDir, DatasetSource) {
    let dir = tempdir().unwrap();
    for i in 0..5 {
        write_linear(dir.path(), &format!("scan_{i}.dat"), i as f64, 8);
    }
    fs::write(dir.path().join("scan_9.dat"), "# Slope: 9\nx\ty\n0\t1\n1\n").unwrap();
    let source =
        DatasetSource::from_directory(dir.path(), &SourceConfig::default(), ScanAssembler::default())
            .unwrap();
    (dir, source)
}

fn processor(config: ProcessorConfig) -> ScanDatasetProcessor {
    let registry = FitModelRegistry::with_builtin_models();
    ScanDatasetProcessor::new(&registry, vec![FitRequest::new("linear")], config).unwrap()
}

fn fits_by_source(scans: &[ScanDataset]) -> BTreeMap<PathBuf, BTreeMap<String, FitResult>> {
    scans
        .iter()
        .map(|s| (s.source().to_path_buf(), s.fits().clone()))
        .collect()
}

#[test]
fn test_unknown_model_fails_construction() {
    let registry = FitModelRegistry::with_builtin_models();
    let err = ScanDatasetProcessor::new(
        &registry,
        vec![FitRequest::new("linear"), FitRequest::new("voigt")],
        ProcessorConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ProcessorError::UnknownModel(ref e) if e.name == "voigt"));
}

#[test]
fn test_invalid_configuration() {
    let registry = FitModelRegistry::with_builtin_models();
    let duplicate = ScanDatasetProcessor::new(
        &registry,
        vec![FitRequest::new("linear"), FitRequest::new("linear")],
        ProcessorConfig::default(),
    );
    assert!(matches!(duplicate, Err(ProcessorError::DuplicateModel(_))));

    let zero_batch = ScanDatasetProcessor::new(
        &registry,
        Vec::new(),
        ProcessorConfig {
            batch_size: 0,
            ..Default::default()
        },
    );
    assert!(matches!(zero_batch, Err(ProcessorError::InvalidConfig(_))));
}

#[test]
fn test_streaming_collects_successes_and_failures() {
    let (_dir, source) = fixture();
    let mut scans: Vec<ScanDataset> = Vec::new();
    let summary = processor(ProcessorConfig::sequential()).process(&source, &mut scans);

    assert_eq!(scans.len(), 5);
    assert_eq!(summary.scans_processed, 5);
    assert_eq!(summary.scans_failed, 1);
    assert_eq!(summary.fits_converged, 5);
    assert_eq!(summary.assembly_failures().count(), 1);
    assert!(summary.failures[0].source().ends_with("scan_9.dat"));
    assert!(!summary.stopped_early);

    for scan in &scans {
        let fit = scan.fit("linear").unwrap();
        let slope = scan.metadata_value("Slope").unwrap().as_f64().unwrap();
        assert!((fit.value("slope").unwrap() - slope).abs() < 1e-8);
    }
}

#[test]
fn test_modes_agree() {
    let (_dir, source) = fixture();

    let mut streamed: Vec<ScanDataset> = Vec::new();
    processor(ProcessorConfig::default()).process(&source, &mut streamed);

    let mut prefetched: Vec<ScanDataset> = Vec::new();
    processor(ProcessorConfig::sequential().with_prefetch(2)).process(&source, &mut prefetched);

    let run = processor(ProcessorConfig::default()).materialize(&source);

    assert_eq!(fits_by_source(&streamed), fits_by_source(run.collection.scans()));
    assert_eq!(fits_by_source(&prefetched), fits_by_source(&streamed));
    assert_eq!(run.summary.scans_failed, 1);
}

#[test]
fn test_rerun_is_identical() {
    let (_dir, source) = fixture();
    let processor = processor(ProcessorConfig::materialized());
    let first = processor.materialize(&source);
    let second = processor.materialize(&source);
    assert_eq!(first.collection.scans(), second.collection.scans());
}

#[test]
fn test_sink_break_stops_pass() {
    let (_dir, source) = fixture();
    let mut delivered = 0;
    let mut sink = |_scan: ScanDataset| {
        delivered += 1;
        if delivered == 2 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    };
    let summary = processor(ProcessorConfig::sequential()).process(&source, &mut sink);
    assert_eq!(delivered, 2);
    assert_eq!(summary.scans_processed, 2);
    assert!(summary.stopped_early);
}

#[test]
fn test_cancelled_before_start() {
    let (_dir, source) = fixture();
    let token = CancelToken::new();
    let processor = processor(ProcessorConfig::default()).with_cancel_token(token.clone());
    token.cancel();

    let mut scans: Vec<ScanDataset> = Vec::new();
    let summary = processor.process(&source, &mut scans);
    assert!(scans.is_empty());
    assert!(summary.stopped_early);

    token.reset();
    let summary = processor.process(&source, &mut scans);
    assert_eq!(summary.scans_processed, 5);
}

#[test]
fn test_missing_metadata_skips_fit() {
    let (_dir, source) = fixture();
    let registry = FitModelRegistry::with_builtin_models();
    let processor = ScanDatasetProcessor::new(
        &registry,
        vec![
            FitRequest::new("linear"),
            FitRequest::new("quadratic").requiring("Operator"),
        ],
        ProcessorConfig::sequential(),
    )
    .unwrap();

    let run = processor.materialize(&source);
    assert_eq!(run.summary.fits_skipped, 5);
    let scan = run.collection.get(0).unwrap();
    assert_eq!(scan.fit("quadratic").unwrap().status, FitStatus::Skipped);
    assert!(scan.fit("linear").unwrap().is_converged());
}

#[test]
fn test_failed_fits_are_reported() {
    let dir = tempdir().unwrap();
    write_linear(dir.path(), "short.dat", 1.0, 3);
    let source =
        DatasetSource::from_directory(dir.path(), &SourceConfig::default(), ScanAssembler::default())
            .unwrap();
    let registry = FitModelRegistry::with_builtin_models();
    let processor = ScanDatasetProcessor::new(
        &registry,
        vec![FitRequest::new("gaussian")],
        ProcessorConfig::default(),
    )
    .unwrap();

    let run = processor.materialize(&source);
    assert_eq!(run.collection.len(), 1);
    assert_eq!(run.summary.fits_failed, 1);
    assert_eq!(run.summary.fit_failures().count(), 1);
    let fit = run.collection.get(0).unwrap().fit("gaussian").unwrap();
    assert_eq!(fit.status, FitStatus::Failed);
}

#[test]
fn test_refit_overwrites_results() {
    let (_dir, source) = fixture();
    let registry = FitModelRegistry::with_builtin_models();
    let mut run = processor(ProcessorConfig::default()).materialize(&source);

    let bounded = ScanDatasetProcessor::new(
        &registry,
        vec![FitRequest::new("linear").with_config(FitConfig::default().with_bounds("slope", 0.0, 0.5))],
        ProcessorConfig::default(),
    )
    .unwrap();
    let summary = bounded.refit(&mut run.collection);
    assert_eq!(summary.scans_processed, 5);

    for scan in run.collection.iter() {
        assert_eq!(scan.fits().len(), 1);
        assert!(scan.fit("linear").unwrap().value("slope").unwrap() <= 0.5);
    }
}

#[test]
fn test_linked_fit_shares_offset() {
    let (_dir, source) = fixture();
    let processor = processor(ProcessorConfig::default());
    let mut run = processor.materialize(&source);
    let request = LinkedFitRequest::new("linear", &["offset"]);

    let positions: Vec<usize> = (0..run.collection.len()).chain([0, 2]).collect();
    let linked = processor
        .fit_linked(&mut run.collection, &positions, &request)
        .unwrap();

    assert!(linked.is_converged());
    assert_eq!(linked.model, "linear_linked");
    assert_eq!(linked.results.len(), 5);
    assert!((linked.shared_value("offset").unwrap() - 1.0).abs() < 1e-8);

    for scan in run.collection.iter() {
        assert_eq!(scan.fits().len(), 2);
        let independent = scan.fit("linear").unwrap().value("slope").unwrap();
        let joint = scan.fit("linear_linked").unwrap().value("slope").unwrap();
        assert!((independent - joint).abs() < 1e-8);
    }
}

#[test]
fn test_linked_fit_groups() {
    let (_dir, source) = fixture();
    let processor = processor(ProcessorConfig::default());
    let mut run = processor.materialize(&source);

    let every = processor
        .fit_linked_groups(&mut run.collection, &LinkedFitRequest::new("linear", &["offset"]))
        .unwrap();
    assert_eq!(every.len(), 1);
    assert_eq!(every[0].results.len(), 5);

    let request = LinkedFitRequest::new("linear", &["offset"]).grouped_by("Slope");
    let groups = processor
        .fit_linked_groups(&mut run.collection, &request)
        .unwrap();
    assert_eq!(groups.len(), 5);
    assert!(groups.iter().all(|g| g.results.len() == 1 && g.is_converged()));
}

#[test]
fn test_linked_fit_rejects_bad_requests() {
    let (_dir, source) = fixture();
    let processor = processor(ProcessorConfig::default());
    let mut run = processor.materialize(&source);

    let err = processor
        .fit_linked(&mut run.collection, &[0], &LinkedFitRequest::new("gaussian", &["center"]))
        .unwrap_err();
    assert!(matches!(err, ProcessorError::NotRequested(ref m) if m == "gaussian"));

    let err = processor
        .fit_linked(&mut run.collection, &[1, 7], &LinkedFitRequest::new("linear", &["offset"]))
        .unwrap_err();
    assert!(matches!(err, ProcessorError::InvalidPosition { position: 7, len: 5 }));
    assert!(run.collection.iter().all(|s| s.fit("linear_linked").is_none()));
}

#[test]
fn test_linked_fit_skips_scans_missing_metadata() {
    let dir = tempdir().unwrap();
    write_linear(dir.path(), "a.dat", 1.0, 8);
    write_linear(dir.path(), "b.dat", 2.0, 8);
    fs::write(dir.path().join("c.dat"), "x\ty\n0\t1\n1\t4\n2\t7\n").unwrap();
    let source =
        DatasetSource::from_directory(dir.path(), &SourceConfig::default(), ScanAssembler::default())
            .unwrap();

    let registry = FitModelRegistry::with_builtin_models();
    let processor = ScanDatasetProcessor::new(
        &registry,
        vec![FitRequest::new("linear").requiring("Slope")],
        ProcessorConfig::sequential(),
    )
    .unwrap();
    let mut run = processor.materialize(&source);
    let linked = processor
        .fit_linked(&mut run.collection, &[0, 1, 2], &LinkedFitRequest::new("linear", &["offset"]))
        .unwrap();

    assert_eq!(linked.results.len(), 2);
    let skipped = run
        .collection
        .iter()
        .find(|scan| scan.source().ends_with("c.dat"))
        .unwrap()
        .fit("linear_linked")
        .unwrap();
    assert_eq!(skipped.status, FitStatus::Skipped);
}

#[test]
fn test_linked_request_from_toml() {
    let request: LinkedFitRequest = toml::from_str(
        r#"
            model = "exponential_decay"
            shared = ["lifetime"]
            group_by = "Sample"
        "#,
    )
    .unwrap();
    assert_eq!(request, LinkedFitRequest::new("exponential_decay", &["lifetime"]).grouped_by("Sample"));
    assert_eq!(request.result_name(), "exponential_decay_linked");
}

#[test]
fn test_summary_report() {
    let (_dir, source) = fixture();
    let summary = processor(ProcessorConfig::default()).materialize(&source).summary;
    let text = summary.to_string();
    assert!(text.contains("5 processed, 1 failed"));
    assert!(text.contains("[FAIL]"));
    assert!(text.contains("scan_9.dat"));
}

#[test]
fn test_processor_config_from_toml() {
    let config: ProcessorConfig = toml::from_str(
        r#"
            mode = "materialized"
            batch_size = 4
        "#,
    )
    .unwrap();
    assert_eq!(config.mode, ProcessingMode::Materialized);
    assert_eq!(config.batch_size, 4);
    assert_eq!(config.prefetch, 0);

    let request: FitRequest = toml::from_str(
        r#"
            model = "exponential_decay"
            max_iterations = 20
            require_metadata = ["Temperature"]

            [bounds.lifetime]
            min = 0.0
        "#,
    )
    .unwrap();
    assert_eq!(request.model, "exponential_decay");
    assert_eq!(request.config.max_iterations, 20);
    assert_eq!(request.require_metadata, vec!["Temperature"]);
    assert_eq!(request.config.bounds["lifetime"].min, 0.0);
}
