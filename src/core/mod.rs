//! Core types and traits for the analytics engine.

mod analyzer;
mod error;
pub mod progress;
mod window;

pub use analyzer::{AnalysisContext, Analyzer, Summary};
pub use error::{Error, Result};
pub use window::{days_between, parse_due_date, parse_timestamp, period_label, TimeWindow};
