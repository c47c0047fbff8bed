//! Classification, selection, aggregation and the pipeline tying them together.

pub mod aggregate;
pub mod classify;
pub mod filter;
pub mod pipeline;

pub use aggregate::aggregate;
pub use classify::{classify_table, is_meta2, parse_case_year, CUTOFF_YEAR_RANGE, DEFAULT_CUTOFF_YEAR};
pub use filter::{select, task_names, Selection};
