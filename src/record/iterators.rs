use std::io::BufRead;

use super::{ParseError, RawRecord, RecordParser};

/// Lazy iterator over the records of one raw scan file.
///
/// Each record is decoded only when requested. The first error is yielded
/// once and ends the sequence.
pub struct RecordIterator<R: BufRead> {
    pub(super) parser: RecordParser<R>,
}

impl<R: BufRead> RecordIterator<R> {
    /// Access the underlying parser (header, layout, progress)
    pub fn parser(&self) -> &RecordParser<R> {
        &self.parser
    }
}

impl<R: BufRead> Iterator for RecordIterator<R> {
    type Item = Result<RawRecord, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.parser.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl<R: BufRead> std::iter::FusedIterator for RecordIterator<R> {}
