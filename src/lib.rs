pub mod api;
pub mod blastinput;
pub mod core;
pub mod error;
pub mod report;
pub mod sequence;
pub mod stats;

pub use api::{PrelimSearch, SearchOutcome, SummaryReturn};
pub use error::{Result, SearchError};
