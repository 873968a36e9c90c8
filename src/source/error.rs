use std::path::PathBuf;

/// Errors opening a dataset collection
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Root is missing or not a directory
    #[error("Invalid dataset root {}: not a readable directory", .0.display())]
    InvalidRoot(PathBuf),

    /// Filename pattern is empty
    #[error("Empty filename pattern")]
    EmptyPattern,
}
