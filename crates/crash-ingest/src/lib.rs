//! # Crash Ingest
//!
//! Record normalizer for raw crash records.
//!
//! Reads the raw source table, parses dates leniently, derives season and
//! total-on-board, coerces counts to nullable integers, projects the
//! analysis columns, and writes the processed table atomically.
//!
//! Row-level problems never abort a run: malformed cells become missing
//! values. Only artifact-level problems (absent or unreadable files) fail.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod error;
pub mod normalize;
pub mod parse;
pub mod table;

pub use error::{IngestError, Result};
pub use normalize::{NormalizeSummary, normalize_record, normalize_records};
pub use table::{
    MISSING_PLACEHOLDER, PROCESSED_COLUMNS, RAW_COLUMNS, RawTable, load_normalized, read_raw,
    run_normalizer, write_normalized,
};
