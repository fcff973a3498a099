//! Market-capitalization workbook lookups.
//!
//! The market-cap workbook is a raw grid: the first row holds date-stamped
//! column headers, the first column holds security labels, and the body
//! holds market values. Lookups are substring matches, mirroring how the
//! source workbook is actually keyed.

use calamine::Data;
use polars::prelude::*;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use tracing::debug;

use report_core::error::{ReportError, Result};

use crate::workbook::{cell_number, cell_text, grid_to_frame, read_grid};

/// Ticker extraction from vendor codes like `VT:MWG(MV)`.
static TICKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"VT:([A-Z]+)\(").expect("valid ticker pattern"));

/// Divisor converting workbook values to display units (thousands).
const VALUE_DIVISOR: f64 = 1000.0;

/// A market-capitalization workbook bound to one sheet.
#[derive(Clone, Debug)]
pub struct MarketcapBook {
    path: PathBuf,
    sheet: String,
}

impl MarketcapBook {
    /// Binds a workbook path and sheet name.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, sheet: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            sheet: sheet.into(),
        }
    }

    /// Looks up the market value for `row_label` at the column whose header
    /// contains `date_target`, scaled to thousands.
    ///
    /// The label match is case-insensitive and trimmed; both a missing date
    /// column and a missing label row are [`ReportError::NotFound`].
    pub fn market_value(&self, date_target: &str, row_label: &str) -> Result<f64> {
        let grid = read_grid(&self.path, &self.sheet)?;
        let rows: Vec<&[Data]> = grid.rows().collect();

        let date_row = rows
            .first()
            .ok_or_else(|| ReportError::NotFound(format!("date column {date_target}")))?;
        let date_col = date_row
            .iter()
            .position(|cell| {
                cell_text(cell).is_some_and(|text| text.contains(date_target))
            })
            .ok_or_else(|| ReportError::NotFound(format!("date column {date_target}")))?;

        let needle = row_label.to_uppercase();
        let value_row = rows
            .iter()
            .find(|row| {
                row.first()
                    .and_then(cell_text)
                    .is_some_and(|text| text.trim().to_uppercase().contains(&needle))
            })
            .ok_or_else(|| ReportError::NotFound(format!("label row {row_label}")))?;

        let value = value_row
            .get(date_col)
            .and_then(cell_number)
            .ok_or_else(|| {
                ReportError::Parse(format!("no numeric value for {row_label} at {date_target}"))
            })?;

        debug!(row_label, date_target, value, "market value resolved");
        Ok(value / VALUE_DIVISOR)
    }

    /// Market values of a peer group at the column whose header starts with
    /// `date_prefix`.
    ///
    /// The sheet is read with its first row as headers; tickers are pulled
    /// out of the `Code` column's vendor codes and filtered to `tickers`.
    pub fn peer_values(&self, tickers: &[String], date_prefix: &str) -> Result<Vec<(String, f64)>> {
        let grid = read_grid(&self.path, &self.sheet)?;
        let frame = grid_to_frame(&grid)?;

        let date_column = frame
            .get_column_names()
            .iter()
            .find(|name| name.starts_with(date_prefix))
            .map(|name| (*name).clone())
            .ok_or_else(|| ReportError::NotFound(format!("date column {date_prefix}")))?;

        let codes = frame.column("Code")?.str()?.clone();
        let values = frame.column(&date_column)?.cast(&DataType::Float64)?;
        let values = values.f64()?;

        let mut out = Vec::new();
        for (code, value) in codes.into_iter().zip(values) {
            let Some(code) = code else { continue };
            let Some(ticker) = TICKER_RE
                .captures(code)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
            else {
                continue;
            };
            if tickers.contains(&ticker) {
                out.push((ticker, value.unwrap_or(0.0)));
            }
        }
        Ok(out)
    }
}

/// Tickers of the securities matching every `(column, value)` equality
/// filter in a normalized statement, e.g. an industry pair.
pub fn industry_peers(
    statement: &DataFrame,
    filters: &[(&str, &str)],
    identifier_column: &str,
) -> Result<Vec<String>> {
    let mut frame = statement.clone();
    for &(column, value) in filters {
        let mask = frame.column(column)?.str()?.equal(value);
        frame = frame.filter(&mask)?;
    }

    Ok(frame
        .column(identifier_column)?
        .str()?
        .into_iter()
        .flatten()
        .map(ToString::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_pattern() {
        let caps = TICKER_RE.captures("VT:MWG(MV)").unwrap();
        assert_eq!(&caps[1], "MWG");
        assert!(TICKER_RE.captures("MWG").is_none());
    }

    #[test]
    fn test_industry_peers() {
        let frame = DataFrame::new(vec![
            Column::new("MÃ".into(), ["MWG", "FPT", "PNJ"]),
            Column::new("SECTOR".into(), ["Retail", "Tech", "Retail"]),
        ])
        .unwrap();

        let peers = industry_peers(&frame, &[("SECTOR", "Retail")], "MÃ").unwrap();
        assert_eq!(peers, ["MWG", "PNJ"]);
    }
}
