#![no_main]

use edascan::metadata::ScanMetadata;
use edascan::record::{ParserConfig, RecordParser};
use edascan::scan::ScanAssembler;
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;
use std::path::Path;

fuzz_target!(|data: &[u8]| {
    // Any input must end in records or a ParseError, never a panic
    let parser = RecordParser::new(Cursor::new(data), ParserConfig::default());
    for record in parser.records().take(10_000) {
        if record.is_err() {
            break;
        }
    }

    // Same for the comma-separated layout with a fixed header block
    let config = ParserConfig::csv().with_header_lines(2);
    let parser = RecordParser::new(Cursor::new(data), config.clone());
    let _ = ScanAssembler::new(config).assemble(parser, Path::new("fuzz.csv"), &ScanMetadata::new());
});
