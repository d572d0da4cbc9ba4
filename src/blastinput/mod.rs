//! Command-line arguments and their translation into `SearchOptions`.

pub mod search_args;

pub use search_args::{RpsArgs, SearchArgs};
