#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/equity-report/equity-report/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for equity report generation.
//!
//! This crate provides the foundational abstractions shared by the report
//! pipeline and its external-data adapters:
//!
//! - [`Symbol`](types::Symbol) - Security identifier
//! - [`FiscalSpan`](span::FiscalSpan) - Fixed ascending year range
//! - [`ReportError`](error::ReportError) - Error taxonomy
//! - [`QuoteProvider`](provider::QuoteProvider),
//!   [`ProfileProvider`](provider::ProfileProvider),
//!   [`CommentaryProvider`](provider::CommentaryProvider) - Adapter traits

/// Error types for report generation.
pub mod error;
/// Provider traits for external enrichment data.
pub mod provider;
/// Price-series math over history frames.
pub mod series;
/// Fiscal year span definitions.
pub mod span;
/// Core data types (Symbol, profile and share structures).
pub mod types;

// Re-export commonly used items at crate root
pub use error::{ReportError, Result};
pub use provider::{CommentaryProvider, ProfileProvider, Provider, QuoteProvider};
pub use span::FiscalSpan;
pub use types::{CompanyOverview, ContactInfo, PriceChanges, ShareSnapshot, Symbol};
