//! Error types for report generation.
//!
//! This module defines [`ReportError`] which covers all error cases that can
//! occur while loading statements, deriving ratios, fetching enrichment data,
//! or rendering the report.

use thiserror::Error;

/// Errors that can occur during report generation.
#[derive(Error, Debug)]
pub enum ReportError {
    /// A spreadsheet could not be opened or read.
    #[error("Workbook error in {path}: {detail}")]
    Workbook {
        /// Path of the offending workbook.
        path: String,
        /// What went wrong while reading it.
        detail: String,
    },

    /// A named sheet was not found in a workbook.
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// An expected column or label was absent from a statement's schema.
    ///
    /// This class is diagnostic only: the offending year or row is skipped
    /// and the run continues.
    #[error("Schema mismatch for year {year}: missing {what}")]
    SchemaMismatch {
        /// Fiscal year of the statement with the unexpected schema.
        year: i32,
        /// The column or label that was expected.
        what: String,
    },

    /// A configuration error, e.g. a concept key absent from the concept map.
    ///
    /// This class is fatal and aborts ratio computation for the whole run.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network-related errors (connection failures, timeouts, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// Error parsing data from an external source.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A looked-up value (date column, label row, quote) was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Error producing chart images or the output document.
    #[error("Render error: {0}")]
    Render(String),

    /// A DataFrame operation failed.
    #[error("Frame error: {0}")]
    Frame(#[from] polars::error::PolarsError),

    /// An I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using [`ReportError`].
pub type Result<T> = std::result::Result<T, ReportError>;
