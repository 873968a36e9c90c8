use std::io::{self, Write};

use super::{ColumnLayout, RawRecord};
use crate::metadata::ScanMetadata;

/// Write a raw scan file in the layout [`RecordParser`](super::RecordParser)
/// reads with the default configuration for `delimiter`.
///
/// Metadata becomes `# key: value` header lines, followed by the column-name
/// line and one row per record. Values containing a colon, timestamps
/// included, are only read back as pairs with
/// [`HeaderSplit::FirstColon`](crate::metadata::HeaderSplit::FirstColon).
pub fn write_scan<'a, W, I>(
    mut out: W,
    metadata: &ScanMetadata,
    layout: &ColumnLayout,
    records: I,
    delimiter: u8,
) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a RawRecord>,
{
    for (key, value) in metadata.iter() {
        writeln!(out, "# {key}: {value}")?;
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(out);

    let mut names = Vec::with_capacity(layout.dependent.len() + 1);
    names.push(layout.independent.as_str());
    names.extend(layout.dependent.iter().map(String::as_str));
    writer.write_record(&names)?;

    for record in records {
        let mut row = Vec::with_capacity(record.dependent.len() + 1);
        row.push(record.independent.to_string());
        row.extend(record.dependent.iter().map(f64::to_string));
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}
