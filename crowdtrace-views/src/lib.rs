//! Thin consumers of the cluster iteration contract.
//!
//! A view never reaches into stores: it iterates a named cluster, filters by
//! capture-time window, projects one named metric, and renders the result.
//! Metric keys are not guaranteed on every individual, so absent metrics are
//! skipped rather than failed.

mod timeline;
mod window;

pub use timeline::{CsvTimeline, series};
pub use window::TimeWindow;

use thiserror::Error;

/// Result type for view operations.
pub type Result<T> = std::result::Result<T, ViewError>;

/// Errors that can occur while rendering a view.
#[derive(Debug, Error)]
pub enum ViewError {
    /// CSV serialization failed.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// The underlying writer failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
