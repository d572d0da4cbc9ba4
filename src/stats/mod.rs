pub mod sum_statistics;

pub use sum_statistics::*;
