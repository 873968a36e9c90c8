use std::path::PathBuf;

use crate::record::ParseError;

/// Assembly of one scan was aborted; nothing from the file is kept.
#[derive(Debug, thiserror::Error)]
#[error("Incomplete scan {}: {cause} ({records_discarded} records discarded)", path.display())]
pub struct IncompleteScanError {
    /// Source file (or stream label)
    pub path: PathBuf,
    /// Records decoded before the failure and then dropped
    pub records_discarded: usize,
    /// Underlying parse failure
    #[source]
    pub cause: ParseError,
}
