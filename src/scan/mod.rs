//! # Scan Assembly
//!
//! A [`ScanDataset`] is one complete instrument sweep. The
//! [`ScanAssembler`] is the only place scans are built from raw files: it
//! drains a [`RecordParser`](crate::record::RecordParser) to the end and
//! either returns the whole scan or an [`IncompleteScanError`]. Partially
//! read data is never handed out.

mod assembler;
mod dataset;
mod error;

#[cfg(test)]
mod tests;

pub use assembler::{MetadataFilter, ScanAssembler};
pub use dataset::ScanDataset;
pub use error::IncompleteScanError;
