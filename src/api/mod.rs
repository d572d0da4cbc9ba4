//! Search entry points.
//!
//! - `prelim_search` - `PrelimSearch`, the driver that runs a search and
//!   returns `HspResults` with a `SummaryReturn`
//! - `thread_manager` - worker fan-out and outcome reduction

pub mod prelim_search;
pub mod thread_manager;

pub use prelim_search::{PrelimSearch, SearchOutcome, SummaryReturn};
pub use thread_manager::{first_error, run_workers};
