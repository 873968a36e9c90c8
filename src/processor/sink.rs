use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::scan::ScanDataset;

/// Receiver of processed scans.
///
/// Returning [`ControlFlow::Break`] stops the pass after the current scan.
pub trait ScanSink {
    /// Take ownership of one fully processed scan
    fn accept(&mut self, scan: ScanDataset) -> ControlFlow<()>;
}

impl<F> ScanSink for F
where
    F: FnMut(ScanDataset) -> ControlFlow<()>,
{
    fn accept(&mut self, scan: ScanDataset) -> ControlFlow<()> {
        self(scan)
    }
}

impl ScanSink for Vec<ScanDataset> {
    fn accept(&mut self, scan: ScanDataset) -> ControlFlow<()> {
        self.push(scan);
        ControlFlow::Continue(())
    }
}

/// Cooperative cancellation flag shared between a processor and its caller
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create an unset token
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the running pass to stop at the next scan boundary
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the flag so the processor can run again
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
