//! End-to-end tests of the scan pipeline: discovery, assembly, fitting and
//! browsing over real files in a temporary directory.

use edascan::prelude::*;
use edascan::record::ParseErrorKind;
use edascan::simulation::{linspace, ScanSimulator, TrkrSweep};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

/// Three fixed header lines, then a tab-separated exponential decay
fn write_decay(dir: &Path, name: &str, temperature: i64, lifetime: f64) {
    let mut text = format!("Sample: GaAs\nTemperature: {temperature}\nOperator: jdoe\ndelay\tsignal\n");
    for i in 0..40 {
        let t = i as f64 * 25.0;
        text.push_str(&format!("{t}\t{}\n", 2.0 * (-t / lifetime).exp() + 0.1));
    }
    fs::write(dir.join(name), text).unwrap();
}

fn parser_config() -> ParserConfig {
    ParserConfig::default().with_header_lines(3)
}

/// Three valid scans and one whose header stops after the first line
fn scenario() -> (TempDir, DatasetSource) {
    let dir = tempdir().unwrap();
    write_decay(dir.path(), "run_10K.dat", 10, 300.0);
    write_decay(dir.path(), "run_20K.dat", 20, 200.0);
    write_decay(dir.path(), "run_30K.dat", 30, 100.0);
    fs::write(dir.path().join("run_40K.dat"), "Sample: GaAs\n").unwrap();

    let source = DatasetSource::from_directory(
        dir.path(),
        &SourceConfig::default(),
        ScanAssembler::new(parser_config()),
    )
    .unwrap();
    (dir, source)
}

fn decay_processor(config: ProcessorConfig) -> ScanDatasetProcessor {
    let registry = FitModelRegistry::with_builtin_models();
    let request = FitRequest::new("exponential_decay")
        .with_config(FitConfig::default().with_bounds("lifetime", 1.0, 1e4));
    ScanDatasetProcessor::new(&registry, vec![request], config).unwrap()
}

fn fit_pairs(scans: &[ScanDataset]) -> Vec<(PathBuf, FitResult)> {
    let mut pairs: Vec<_> = scans
        .iter()
        .flat_map(|scan| {
            scan.fits()
                .values()
                .map(|fit| (scan.source().to_path_buf(), fit.clone()))
        })
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    pairs
}

#[test]
fn test_truncated_header_scenario() {
    let (_dir, source) = scenario();
    assert_eq!(source.len(), 4);

    let run = decay_processor(ProcessorConfig::default()).materialize(&source);
    assert_eq!(run.collection.len(), 3);
    assert_eq!(run.summary.scans_failed, 1);

    let failure = run.summary.assembly_failures().next().unwrap();
    assert!(failure.source().ends_with("run_40K.dat"));
    match failure {
        edascan::processor::ProcessingFailure::Assembly(error) => {
            assert_eq!(error.records_discarded, 0);
            assert!(matches!(
                error.cause.kind,
                ParseErrorKind::TruncatedHeader {
                    expected: 3,
                    found: 1
                }
            ));
        }
        other => panic!("expected an assembly failure, got {other}"),
    }

    let operated = run
        .collection
        .lookup("Operator", &MetadataValue::from("jdoe"));
    assert_eq!(operated.len(), 3);
    assert_eq!(
        run.collection.browser().where_eq("Operator", "jdoe").len(),
        3
    );
}

#[test]
fn test_fitted_lifetimes_follow_temperature() {
    let (_dir, source) = scenario();
    let run = decay_processor(ProcessorConfig::default()).materialize(&source);

    let view = run
        .collection
        .browser()
        .with_fit_status("exponential_decay", FitStatus::Converged)
        .sort_by(&SortKey::metadata("Temperature"), SortOrder::Ascending);
    let lifetimes: Vec<f64> = view
        .iter()
        .map(|scan| scan.fit("exponential_decay").unwrap().value("lifetime").unwrap())
        .collect();

    assert_eq!(lifetimes.len(), 3);
    for (fitted, expected) in lifetimes.iter().zip([300.0, 200.0, 100.0]) {
        assert!((fitted - expected).abs() < 1e-3, "{fitted} vs {expected}");
    }
}

#[test]
fn test_rerun_is_identical() {
    let (_dir, source) = scenario();
    let processor = decay_processor(ProcessorConfig::default());
    let first = processor.materialize(&source);
    let second = processor.materialize(&source);

    assert_eq!(first.collection.scans(), second.collection.scans());
    assert_eq!(first.summary.scans_failed, second.summary.scans_failed);
}

#[test]
fn test_streaming_and_materialized_agree() {
    let (_dir, source) = scenario();

    let mut streamed = ProcessedDatasetCollection::new();
    let summary =
        decay_processor(ProcessorConfig::sequential().with_prefetch(1)).process(&source, &mut streamed);
    assert_eq!(summary.scans_processed, 3);

    let materialized = decay_processor(ProcessorConfig::materialized()).materialize(&source);
    assert_eq!(
        fit_pairs(streamed.scans()),
        fit_pairs(materialized.collection.scans())
    );
}

#[test]
fn test_refit_never_duplicates_model() {
    let (_dir, source) = scenario();
    let processor = decay_processor(ProcessorConfig::default());
    let mut run = processor.materialize(&source);
    let before = fit_pairs(run.collection.scans());

    processor.refit(&mut run.collection);
    for scan in run.collection.iter() {
        assert_eq!(scan.fits().len(), 1);
    }
    assert_eq!(fit_pairs(run.collection.scans()), before);
}

#[test]
fn test_too_few_points_fails_without_panic() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("tiny.dat"), "x\ty\n0\t1\n1\t2\n").unwrap();
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

    let fit = run.collection.get(0).unwrap().fit("gaussian").unwrap();
    assert_eq!(fit.status, FitStatus::Failed);
    assert!(fit.message.is_some());
    assert_eq!(run.summary.fits_failed, 1);
}

#[test]
fn test_keyword_rules_tag_scans() {
    let (dir, _) = scenario();
    let keywords: KeywordRules = toml::from_str(
        r#"
            [[suffixes]]
            suffix = "K"
            key = "SetTemperature"
        "#,
    )
    .unwrap();
    let assembler = ScanAssembler::new(parser_config()).with_keywords(keywords);
    let source =
        DatasetSource::from_directory(dir.path(), &SourceConfig::default(), assembler).unwrap();

    let mut collection: ProcessedDatasetCollection =
        source.scans().filter_map(Result::ok).collect();
    collection.index_by("SetTemperature");
    let values: BTreeSet<_> = collection.unique_values("SetTemperature");
    assert_eq!(
        values.into_iter().collect::<Vec<_>>(),
        vec![
            MetadataValue::Integer(10),
            MetadataValue::Integer(20),
            MetadataValue::Integer(30)
        ]
    );
    assert_eq!(
        collection
            .lookup("SetTemperature", &MetadataValue::Integer(20))
            .len(),
        1
    );
}

#[test]
fn test_simulated_sweep_round_trip() {
    let dir = tempdir().unwrap();
    let sweep = TrkrSweep {
        amplitude_std: 0.0,
        lifetime_std: 0.0,
        slope_scale: 0.0,
        offset_scale: 0.0,
        ..Default::default()
    };
    let fields = [150.0, 300.0, 450.0];
    let mut simulator = ScanSimulator::new(TrkrSweep::model(), linspace(0.0, 6000.0, 300), 11)
        .with_noise(0.002)
        .with_columns("delay", "kerr");
    simulator
        .write_all(dir.path(), &sweep.scans(&fields, 11))
        .unwrap();

    let source =
        DatasetSource::from_directory(dir.path(), &SourceConfig::default(), ScanAssembler::default())
            .unwrap();
    let collection: ProcessedDatasetCollection = source.scans().map(Result::unwrap).collect();
    assert_eq!(collection.len(), 3);

    let key = "Magnetic Field (mT)";
    for &field in &fields {
        let scan = collection.lookup(key, &MetadataValue::Float(field))[0];
        let frequency = sweep.frequency(field);
        let config = FitConfig::default().with_guess("frequency", frequency * 1.01);
        let (xs, ys) = scan.samples(None).unwrap();
        let result = fit_samples(TrkrSweep::model().as_ref(), &xs, &ys, &config);
        assert!(result.is_converged(), "{:?}", result.message);
        assert!((result.value("frequency").unwrap() - frequency).abs() < frequency * 1e-2);
    }
}

#[test]
fn test_fit_table_csv_output() {
    let (_dir, source) = scenario();
    let run = decay_processor(ProcessorConfig::default()).materialize(&source);

    let table = run
        .collection
        .browser()
        .sort_by(&SortKey::metadata("Temperature"), SortOrder::Descending)
        .fit_table("exponential_decay");
    assert_eq!(table.len(), 3);
    assert!(table.metadata_columns.contains(&"Operator".to_string()));
    assert!(table.metadata_columns.contains(&"Temperature".to_string()));

    let mut out = Vec::new();
    table.write_csv(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let mut lines = text.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("source,"));
    assert!(header.contains("lifetime,lifetime_error"));
    assert!(lines.next().unwrap().contains("run_30K.dat"));
}

/// Decays of one sample: a shared lifetime, per-scan amplitude and offset
fn write_sample_decay(dir: &Path, name: &str, sample: &str, amplitude: f64, offset: f64) {
    let mut text = format!("# Sample: {sample}\ndelay\tsignal\n");
    for i in 0..60 {
        let t = i as f64 * 20.0;
        let wobble = 0.002 * ((i * 37 % 11) as f64 / 5.0 - 1.0);
        text.push_str(&format!(
            "{t}\t{}\n",
            amplitude * (-t / 250.0).exp() + offset + wobble
        ));
    }
    fs::write(dir.join(name), text).unwrap();
}

#[test]
fn test_linked_fit_shares_lifetime_across_scans() {
    let dir = tempdir().unwrap();
    write_sample_decay(dir.path(), "a_1.dat", "GaAs", 1.0, 0.05);
    write_sample_decay(dir.path(), "a_2.dat", "GaAs", 2.0, 0.10);
    write_sample_decay(dir.path(), "a_3.dat", "GaAs", 3.5, 0.00);
    write_sample_decay(dir.path(), "b_1.dat", "InP", 1.5, 0.02);

    let source =
        DatasetSource::from_directory(dir.path(), &SourceConfig::default(), ScanAssembler::default())
            .unwrap();
    let processor = decay_processor(ProcessorConfig::default());
    let mut run = processor.materialize(&source);

    let request = LinkedFitRequest::new("exponential_decay", &["lifetime"]).grouped_by("Sample");
    let linked = processor
        .fit_linked_groups(&mut run.collection, &request)
        .unwrap();
    assert_eq!(linked.len(), 2);
    assert!(linked.iter().all(LinkedFit::is_converged));

    let gaas = linked.iter().find(|fit| fit.results.len() == 3).unwrap();
    assert!((gaas.shared_value("lifetime").unwrap() - 250.0).abs() < 2.0);

    let table = run
        .collection
        .browser()
        .where_eq("Sample", "GaAs")
        .fit_table(&request.result_name());
    assert_eq!(table.len(), 3);
    let lifetimes = table.column("lifetime").unwrap();
    assert!(lifetimes.iter().all(|l| l.is_some() && *l == lifetimes[0]));
    let amplitudes: Vec<f64> = table
        .column("amplitude")
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    for (fitted, expected) in amplitudes.iter().zip([1.0, 2.0, 3.5]) {
        assert!((fitted - expected).abs() < 0.02, "{fitted} vs {expected}");
    }

    for scan in run.collection.iter() {
        assert!(scan.fit("exponential_decay").unwrap().is_converged());
    }
}
