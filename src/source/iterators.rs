use std::iter::FusedIterator;

use super::DatasetSource;
use crate::scan::{IncompleteScanError, ScanDataset};

/// Lazy pass over the scans of a [`DatasetSource`].
///
/// Each file is read only when the iterator reaches it. Files rejected by a
/// metadata filter yield nothing; failed files yield their error and the
/// pass continues with the next file.
pub struct ScanIter<'a> {
    pub(super) source: &'a DatasetSource,
    pub(super) next: usize,
}

impl ScanIter<'_> {
    /// Files not yet visited
    pub fn remaining_files(&self) -> usize {
        self.source.len().saturating_sub(self.next)
    }
}

impl Iterator for ScanIter<'_> {
    type Item = Result<ScanDataset, IncompleteScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.source.len() {
            let index = self.next;
            self.next += 1;
            match self.source.assemble_at(index) {
                Ok(Some(scan)) => return Some(Ok(scan)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining_files()))
    }
}

impl FusedIterator for ScanIter<'_> {}
