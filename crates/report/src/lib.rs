#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/equity-report/equity-report/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Equity report generation facade.
//!
//! This crate re-exports the pipeline types and adapter implementations and
//! provides [`ReportGenerator`], the one-call orchestration of a full batch
//! run.
//!
//! # Features
//!
//! - `vci` - VCI quote provider for price history and overviews
//! - `profile` - scraped company intro and contact fields
//! - `commentary` - OpenRouter chart commentary
//!
//! # Example
//!
//! ```rust,ignore
//! use report::{ReportConfig, ReportGenerator, Symbol};
//! use std::path::PathBuf;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> report::Result<()> {
//!     let statements = (2020..=2024)
//!         .map(|year| PathBuf::from(format!("data/{year}-Vietnam.xlsx")))
//!         .collect();
//!     let config = ReportConfig::new(Symbol::new("MWG"), statements);
//!
//!     let summary = ReportGenerator::new(config).with_vci().generate().await?;
//!     println!("report at {}", summary.pdf_path.display());
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use report_core::*;

// Pipeline
pub use report_statements::{
    ConceptMap, MarketcapBook, RatioEngine, RatioTable, StatementSchema, WideTable,
    YearlyStatement, derive_ratio_table, load_statements,
};

// Rendering
pub use report_render::PdfReport;

// Providers
#[cfg(feature = "commentary")]
pub use report_commentary::OpenRouterProvider;
#[cfg(feature = "profile")]
pub use report_profile::SiteProfileProvider;
#[cfg(feature = "vci")]
pub use report_vci::VciProvider;

mod generator;
pub use generator::{FALLBACK_TEXT, ReportConfig, ReportGenerator, ReportSummary};
