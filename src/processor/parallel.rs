use rayon::prelude::*;

use super::ScanDatasetProcessor;
use crate::scan::ScanDataset;

impl ScanDatasetProcessor {
    /// Fit a batch of scans on the rayon pool.
    ///
    /// Each task owns one scan's fit map, so no state is shared between
    /// tasks; scan order is unchanged.
    pub(super) fn fit_parallel(&self, scans: &mut [ScanDataset]) {
        scans.par_iter_mut().for_each(|scan| self.fit_scan(scan));
    }
}
