//! Result output.
//!
//! - `tabular` - one tab-separated line per HSP, usable from the
//!   formatter thread while a search runs

pub mod tabular;

pub use tabular::{format_evalue, OutputConfig, TabularWriter};
