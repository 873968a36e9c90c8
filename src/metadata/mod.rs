//! # Scan Metadata
//!
//! Acquisition context attached to every scan at assembly time.
//!
//! Metadata comes from three places:
//!
//! 1. **Header lines**: `key: value` pairs at the top of a raw scan file
//!    ([`parse_header_pairs`]).
//! 2. **File path**: tags encoded in directory and file names, extracted
//!    with configurable [`KeywordRules`] (e.g. `sample_30K_Ind_3.dat`).
//! 3. **Discovery context**: source path, modification time and the run
//!    counter assigned by the dataset source.
//!
//! Values are typed ([`MetadataValue`]) and totally ordered so they can be
//! used as lookup keys and sort keys by the data browser.

mod error;
mod header;
mod keywords;
mod scan;
mod value;


pub use error::MetadataError;
pub use header::{parse_header_pairs, HeaderSplit};
pub use keywords::{FlagRule, KeywordRules, NextElementRule, SuffixRule};
pub use scan::{ScanMetadata, FILEPATH_KEY, LAST_MODIFIED_KEY, RUN_ID_KEY};
pub use value::MetadataValue;
