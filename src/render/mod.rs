//! Plain-text rendering of the derived tables.

pub mod text;

pub use text::{render_summary, render_table};
