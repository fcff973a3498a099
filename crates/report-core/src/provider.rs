//! Provider traits for external enrichment data.
//!
//! This module defines the traits at the boundary between the ratio pipeline
//! and its external collaborators:
//!
//! - [`QuoteProvider`] - price history and quote lookups
//! - [`ProfileProvider`] - scraped company description and contacts
//! - [`CommentaryProvider`] - chart commentary from a multimodal model
//!
//! Every call is single-attempt and best-effort: the orchestrator converts
//! failures into fallback values rather than aborting the run.

use async_trait::async_trait;
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use std::fmt::Debug;
use std::path::Path;

use crate::{
    error::Result,
    types::{CompanyOverview, ContactInfo, Symbol},
};

/// Base trait for all enrichment providers.
pub trait Provider: Send + Sync + Debug {
    /// Returns the name of this provider (e.g. "VCI").
    fn name(&self) -> &str;

    /// Returns a description of this provider.
    fn description(&self) -> &str;
}

/// Provider for daily price history and quote data.
#[async_trait]
pub trait QuoteProvider: Provider {
    /// Fetches daily OHLCV history for a symbol.
    ///
    /// Returns a DataFrame with columns: date, open, high, low, close, volume.
    async fn fetch_history(
        &self,
        symbol: &Symbol,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DataFrame>;

    /// Fetches the closing price on an exact date.
    async fn close_on(&self, symbol: &Symbol, date: NaiveDate) -> Result<f64>;

    /// Fetches exchange/industry/headcount reference data for a symbol.
    async fn company_overview(&self, symbol: &Symbol) -> Result<CompanyOverview>;
}

/// Provider for scraped company profile text.
///
/// Implementations are configured with the pages to scrape; the subject
/// company is fixed per provider instance, matching the one-security scope
/// of a report run.
#[async_trait]
pub trait ProfileProvider: Provider {
    /// Fetches the company's introduction paragraph.
    async fn intro(&self) -> Result<String>;

    /// Fetches the labeled contact fields (address, phone, website).
    async fn contact_info(&self) -> Result<ContactInfo>;
}

/// Provider for natural-language commentary on a chart image.
#[async_trait]
pub trait CommentaryProvider: Provider {
    /// Describes the chart at `image` in a bounded-length paragraph.
    async fn describe_chart(&self, image: &Path) -> Result<String>;
}
