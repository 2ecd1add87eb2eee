//! Parsing for the evaluator's profile event log.

pub mod parse;
pub mod record;

pub use parse::LineParser;
pub use record::{EventKind, Measure, Record, RecordError};
