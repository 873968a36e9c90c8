use super::*;
use crate::metadata::{KeywordRules, MetadataValue, SuffixRule, FILEPATH_KEY};
use crate::record::ParseErrorKind;
use std::fs;
use tempfile::tempdir;

const GOOD: &str = "# Sample: A\nx\ty\n0\t1\n1\t2\n";

fn write(path: &Path, text: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, text).unwrap();
}

#[test]
fn test_discovery_is_sorted_and_filtered() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(&root.join("b/scan_2.dat"), GOOD);
    write(&root.join("a/scan_1.dat"), GOOD);
    write(&root.join("a/notes.txt"), "ignore me");
    write(&root.join("c.dat"), GOOD);

    let files = discover(root, &SourceConfig::default()).unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
        .collect();
    assert_eq!(
        names,
        vec![
            PathBuf::from("a/scan_1.dat"),
            PathBuf::from("b/scan_2.dat"),
            PathBuf::from("c.dat"),
        ]
    );
}

#[test]
fn test_non_recursive_discovery() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("top.dat"), GOOD);
    write(&dir.path().join("nested/deep.dat"), GOOD);

    let files = discover(dir.path(), &SourceConfig::default().non_recursive()).unwrap();
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("top.dat"));
}

#[test]
fn test_custom_pattern() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("scan.csv"), GOOD);
    write(&dir.path().join("scan.dat"), GOOD);

    let files = discover(dir.path(), &SourceConfig::default().with_pattern(".csv")).unwrap();
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("scan.csv"));

    let err = discover(dir.path(), &SourceConfig::default().with_pattern("")).unwrap_err();
    assert!(matches!(err, SourceError::EmptyPattern));
}

#[test]
fn test_pattern_extension() {
    assert_eq!(SourceConfig::default().extension(), Some(".dat"));
    assert_eq!(SourceConfig::default().with_pattern(".csv").extension(), Some(".csv"));
    assert_eq!(SourceConfig::default().with_pattern("scan_").extension(), None);
    assert_eq!(SourceConfig::default().with_pattern(".").extension(), None);
    assert_eq!(SourceConfig::default().with_pattern("a.dat").extension(), None);
}

#[test]
fn test_keyword_tags_follow_pattern_extension() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("sample_30K.csv"), GOOD);
    write(&dir.path().join("scan_1.5K"), GOOD);

    let rules = KeywordRules {
        suffixes: vec![SuffixRule {
            suffix: "K".to_string(),
            key: "SetTemperature".to_string(),
        }],
        ..Default::default()
    };
    let tagged = |pattern: &str| -> Vec<Option<MetadataValue>> {
        let assembler = ScanAssembler::default().with_keywords(rules.clone());
        let config = SourceConfig::default().with_pattern(pattern);
        DatasetSource::from_directory(dir.path(), &config, assembler)
            .unwrap()
            .scans()
            .map(|scan| scan.unwrap().metadata_value("SetTemperature").cloned())
            .collect()
    };

    assert_eq!(tagged(".csv"), vec![Some(MetadataValue::Integer(30))]);
    assert_eq!(tagged("scan_"), vec![Some(MetadataValue::Float(1.5))]);
}

#[test]
fn test_invalid_root() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing");
    let err = DatasetSource::from_directory(&missing, &SourceConfig::default(), ScanAssembler::default())
        .unwrap_err();
    assert!(matches!(err, SourceError::InvalidRoot(ref p) if *p == missing));

    let file = dir.path().join("file.dat");
    write(&file, GOOD);
    assert!(DatasetSource::from_directory(&file, &SourceConfig::default(), ScanAssembler::default()).is_err());
}

#[test]
fn test_scans_continue_after_failure() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("1.dat"), GOOD);
    write(&dir.path().join("2.dat"), "# Sample: B\nx\ty\n0\tbroken\n");
    write(&dir.path().join("3.dat"), GOOD);

    let source =
        DatasetSource::from_directory(dir.path(), &SourceConfig::default(), ScanAssembler::default())
            .unwrap();
    let results: Vec<_> = source.scans().collect();
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    let err = results[1].as_ref().unwrap_err();
    assert!(err.path.ends_with("2.dat"));
    assert!(matches!(err.cause.kind, ParseErrorKind::InvalidNumber { .. }));
    assert!(results[2].is_ok());
}

#[test]
fn test_every_pass_starts_fresh() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("1.dat"), GOOD);
    write(&dir.path().join("2.dat"), GOOD);
    let source =
        DatasetSource::from_directory(dir.path(), &SourceConfig::default(), ScanAssembler::default())
            .unwrap();

    let mut first = source.scans();
    first.next();
    assert_eq!(first.remaining_files(), 1);

    let second: Vec<_> = source.scans().collect();
    assert_eq!(second.len(), 2);
}

#[test]
fn test_filtered_files_yield_nothing() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("1.dat"), GOOD);
    write(&dir.path().join("2.dat"), "# Sample: B\nx\ty\n0\t1\n");
    let assembler = ScanAssembler::default()
        .with_filter(|m| m.get("Sample") == Some(&MetadataValue::from("B")));

    let source = DatasetSource::from_directory(dir.path(), &SourceConfig::default(), assembler).unwrap();
    let scans: Vec<_> = source.scans().collect::<Result<_, _>>().unwrap();
    assert_eq!(scans.len(), 1);
    assert!(scans[0].source().ends_with("2.dat"));
}

#[test]
fn test_run_ids_follow_directories() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("run_a/1.dat"), GOOD);
    write(&dir.path().join("run_a/2.dat"), GOOD);
    write(&dir.path().join("run_b/1.dat"), GOOD);

    let source =
        DatasetSource::from_directory(dir.path(), &SourceConfig::default(), ScanAssembler::default())
            .unwrap();
    let runs: Vec<_> = source
        .scans()
        .map(|s| s.unwrap().metadata_value(RUN_ID_KEY).cloned())
        .collect();
    assert_eq!(
        runs,
        vec![
            Some(MetadataValue::Integer(0)),
            Some(MetadataValue::Integer(0)),
            Some(MetadataValue::Integer(1)),
        ]
    );

    let single = SourceConfig::default().with_run_grouping(RunGrouping::Single);
    let source = DatasetSource::from_directory(dir.path(), &single, ScanAssembler::default()).unwrap();
    assert_eq!(source.run_id(2), Some(0));
}

#[test]
fn test_from_paths_keeps_given_order() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.dat");
    let b = dir.path().join("b.dat");
    write(&a, GOOD);
    write(&b, GOOD);

    let source = DatasetSource::from_paths([&b, &a], RunGrouping::Directory, ScanAssembler::default());
    let paths: Vec<_> = source
        .scans()
        .map(|s| s.unwrap().metadata_value(FILEPATH_KEY).cloned().unwrap())
        .collect();
    assert_eq!(paths[0], MetadataValue::from(b.to_string_lossy().into_owned()));
    assert_eq!(paths[1], MetadataValue::from(a.to_string_lossy().into_owned()));
}

#[test]
fn test_source_config_from_toml() {
    let config: SourceConfig = toml::from_str(
        r#"
            pattern = ".txt"
            run_grouping = "single"
        "#,
    )
    .unwrap();
    assert_eq!(config.pattern, ".txt");
    assert!(config.recursive);
    assert_eq!(config.run_grouping, RunGrouping::Single);
}
