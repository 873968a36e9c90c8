use crate::fit::UnknownModelError;

/// Processor configuration errors, raised before any scan is read
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// A requested model is not registered
    #[error("{0}")]
    UnknownModel(#[from] UnknownModelError),

    /// The same model was requested twice
    #[error("Model '{0}' requested more than once")]
    DuplicateModel(String),

    /// A linked fit names a model the processor was not built with
    #[error("Model '{0}' is not one of the processor's fit requests")]
    NotRequested(String),

    /// A linked fit selects a scan that is not in the collection
    #[error("No scan at position {position} (collection holds {len})")]
    InvalidPosition {
        /// Requested position
        position: usize,
        /// Collection size
        len: usize,
    },

    /// Invalid processor settings
    #[error("Invalid processor configuration: {0}")]
    InvalidConfig(String),
}
