//! Core data types for equity report generation.
//!
//! This module defines the shared structures:
//!
//! - [`Symbol`] - Security identifier
//! - [`CompanyOverview`] - Exchange/industry/headcount reference data
//! - [`ContactInfo`] - Scraped address, phone, and website fields
//! - [`PriceChanges`] - Trailing percentage changes of the share price
//! - [`ShareSnapshot`] - Share details block for the rendered report

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A security identifier (ticker code).
///
/// Symbols are automatically uppercased on creation; row selection against
/// the yearly statements is an exact match on this uppercased form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new symbol from a string, converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_uppercase())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Company reference information from a quote source.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyOverview {
    /// Exchange the security trades on.
    pub exchange: Option<String>,
    /// Industry classification.
    pub industry: Option<String>,
    /// Reported employee headcount.
    pub employees: Option<u64>,
}

/// Contact fields scraped from a finance-portal profile page.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    /// Registered address.
    pub address: Option<String>,
    /// Contact phone number.
    pub phone: Option<String>,
    /// Company website, scheme-prefixed.
    pub website: Option<String>,
}

/// Trailing percentage changes of the closing price.
///
/// Windows are measured in calendar days back from the most recent close in
/// the price history; a window with no earlier data point is `None`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceChanges {
    /// One-day change, percent.
    pub day_1: Option<f64>,
    /// Five-session change (4 calendar days), percent.
    pub day_5: Option<f64>,
    /// Three-month change (91 days), percent.
    pub month_3: Option<f64>,
    /// Six-month change (211 days), percent.
    pub month_6: Option<f64>,
    /// Month-to-date change (29 days), percent.
    pub month_to_date: Option<f64>,
    /// Year-to-date change (364 days), percent.
    pub year_to_date: Option<f64>,
}

impl PriceChanges {
    /// Labeled values in display order, for table rendering.
    #[must_use]
    pub fn rows(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![
            ("1 day", self.day_1),
            ("5 day", self.day_5),
            ("3 months", self.month_3),
            ("6 months", self.month_6),
            ("Month to date", self.month_to_date),
            ("Year to date", self.year_to_date),
        ]
    }
}

/// Share details for the report's detail block.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ShareSnapshot {
    /// Most recent closing price.
    pub close: Option<f64>,
    /// Beta versus the market index.
    pub beta: Option<f64>,
    /// Average traded volume over the last five sessions.
    pub five_day_volume: Option<f64>,
    /// Trading currency.
    pub currency: String,
    /// Shares outstanding, as reported (display string).
    pub shares_outstanding: Option<String>,
    /// Trailing percentage changes.
    pub changes: PriceChanges,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_uppercases() {
        assert_eq!(Symbol::new("mwg").as_str(), "MWG");
        assert_eq!(Symbol::new(" fpt ").as_str(), "FPT");
    }

    #[test]
    fn test_symbol_from_str() {
        let s: Symbol = "vnm".parse().unwrap();
        assert_eq!(s.to_string(), "VNM");
    }

    #[test]
    fn test_price_change_rows_order() {
        let changes = PriceChanges {
            day_1: Some(1.0),
            ..Default::default()
        };
        let rows = changes.rows();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0], ("1 day", Some(1.0)));
        assert_eq!(rows[5].0, "Year to date");
    }
}
