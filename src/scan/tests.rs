use super::*;
use crate::fit::FitResult;
use crate::metadata::{KeywordRules, MetadataValue, ScanMetadata, SuffixRule, FILEPATH_KEY, RUN_ID_KEY};
use crate::record::{ParseErrorKind, ParserConfig, RecordParser};
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;

fn parser(text: &str) -> RecordParser<Cursor<Vec<u8>>> {
    RecordParser::new(Cursor::new(text.as_bytes().to_vec()), ParserConfig::default())
}

fn body(rows: usize) -> String {
    let mut text = String::from("# Temperature: 30\ndelay\tkerr\n");
    for i in 0..rows {
        text.push_str(&format!("{}\t{}\n", i * 10, i as f64 * 0.5));
    }
    text
}

#[test]
fn test_assemble_keeps_all_records_in_order() {
    let scan = ScanAssembler::default()
        .assemble(parser(&body(5)), Path::new("mem/scan.dat"), &ScanMetadata::new())
        .unwrap()
        .unwrap();

    assert_eq!(scan.len(), 5);
    assert_eq!(scan.independent_values(), vec![0.0, 10.0, 20.0, 30.0, 40.0]);
    assert_eq!(scan.dependent_values(0).unwrap()[4], 2.0);
    assert_eq!(scan.layout().dependent, vec!["kerr"]);
    assert_eq!(scan.source(), Path::new("mem/scan.dat"));
    assert!(scan.fits().is_empty());
}

#[test]
fn test_malformed_record_discards_scan() {
    // Row 4 (0-based record 3) is malformed
    let mut text = body(3);
    text.push_str("30\tgarbage\n40\t2.0\n");

    let err = ScanAssembler::default()
        .assemble(parser(&text), Path::new("bad.dat"), &ScanMetadata::new())
        .unwrap_err();

    assert_eq!(err.records_discarded, 3);
    assert_eq!(err.path, Path::new("bad.dat"));
    assert_eq!(err.cause.line, 6);
    assert!(matches!(err.cause.kind, ParseErrorKind::InvalidNumber { .. }));
}

#[test]
fn test_header_failure_discards_nothing() {
    let config = ParserConfig::default().with_header_lines(4);
    let parser = RecordParser::new(Cursor::new(b"one\ntwo\n".to_vec()), config);
    let err = ScanAssembler::default()
        .assemble(parser, Path::new("short.dat"), &ScanMetadata::new())
        .unwrap_err();
    assert_eq!(err.records_discarded, 0);
    assert!(matches!(
        err.cause.kind,
        ParseErrorKind::TruncatedHeader { .. }
    ));
}

#[test]
fn test_missing_file_is_incomplete() {
    let err = ScanAssembler::default()
        .assemble_path(Path::new("/nonexistent/edascan/scan.dat"), &ScanMetadata::new())
        .unwrap_err();
    assert!(matches!(err.cause.kind, ParseErrorKind::Io(_)));
    assert!(err.to_string().contains("scan.dat"));
}

#[test]
fn test_metadata_layering() {
    let keywords = KeywordRules {
        suffixes: vec![SuffixRule {
            suffix: "K".to_string(),
            key: "Temperature".to_string(),
        }],
        ..Default::default()
    };
    let mut context = ScanMetadata::new();
    context.insert(RUN_ID_KEY, 2i64);

    let scan = ScanAssembler::default()
        .with_keywords(keywords)
        .assemble(parser(&body(2)), Path::new("runs/sample_10K.dat"), &context)
        .unwrap()
        .unwrap();

    // Header pair overrides the path-derived value
    assert_eq!(
        scan.metadata_value("Temperature"),
        Some(&MetadataValue::Integer(30))
    );
    assert_eq!(scan.metadata_value(RUN_ID_KEY), Some(&MetadataValue::Integer(2)));
    assert_eq!(
        scan.metadata_value(FILEPATH_KEY),
        Some(&MetadataValue::from("runs/sample_10K.dat"))
    );
}

#[test]
fn test_filter_rejects_before_body() {
    // The body is malformed, but the filter rejects the scan first
    let text = "# Temperature: 30\nx\ty\n1\tbad\n";
    let assembler = ScanAssembler::default().with_filter(|m| {
        m.get("Temperature").and_then(MetadataValue::as_f64) != Some(30.0)
    });
    let result = assembler
        .assemble(parser(text), Path::new("cold.dat"), &ScanMetadata::new())
        .unwrap();
    assert!(result.is_none());
}

#[test]
fn test_all_filters_must_accept() {
    let assembler = ScanAssembler::default()
        .with_filter(|_| true)
        .with_filter(|m| m.contains_key("Operator"));
    let result = assembler
        .assemble(parser(&body(1)), Path::new("a.dat"), &ScanMetadata::new())
        .unwrap();
    assert!(result.is_none());
}

#[test]
fn test_insert_fit_replaces_same_model() {
    let mut scan = ScanAssembler::default()
        .assemble(parser(&body(3)), Path::new("a.dat"), &ScanMetadata::new())
        .unwrap()
        .unwrap();

    assert!(scan.insert_fit(FitResult::failed("linear", "first")).is_none());
    let mut parameters = BTreeMap::new();
    parameters.insert(
        "slope".to_string(),
        crate::fit::FittedParameter {
            value: 1.0,
            uncertainty: None,
        },
    );
    let previous = scan.insert_fit(FitResult::converged("linear", parameters, 0.0, 3));
    assert_eq!(previous.unwrap().message.as_deref(), Some("first"));
    assert_eq!(scan.fits().len(), 1);
    assert!(scan.fit("linear").unwrap().is_converged());
}

#[test]
fn test_samples_by_column_name() {
    let text = "x\ta\tb\n0\t1\t2\n1\t3\t4\n";
    let scan = ScanAssembler::default()
        .assemble(parser(text), Path::new("ab.dat"), &ScanMetadata::new())
        .unwrap()
        .unwrap();
    let (xs, ys) = scan.samples(Some("b")).unwrap();
    assert_eq!(xs, vec![0.0, 1.0]);
    assert_eq!(ys, vec![2.0, 4.0]);
    assert!(scan.samples(Some("c")).is_none());
    assert!(scan.dependent_values(2).is_none());
}
