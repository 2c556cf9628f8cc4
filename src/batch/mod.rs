//! # Batch Processing
//!
//! Merge every video in a directory, sequentially into one output or pair by
//! pair, and summarize the run in a report.

pub mod processor;
pub mod report;

pub use processor::{BatchProcessor, BatchSummary, StepAction, StepResult};
pub use report::BatchReport;
