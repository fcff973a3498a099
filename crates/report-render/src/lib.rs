#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/equity-report/equity-report/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Report output: chart PNGs and the paginated PDF.
//!
//! The chart functions write PNG files to a local path; [`pdf::PdfReport`]
//! lays the pages out and embeds the files. The `tables` constants pick the
//! ratio-table columns each rendered sub-table shows.

/// Chart image generation.
pub mod charts;
/// Paginated A4 document layout.
pub mod pdf;

pub use charts::{grouped_bar_chart, marketcap_chart, price_chart, year_series_chart};
pub use pdf::PdfReport;

/// Ratio-table column picks for the rendered sub-tables, as
/// `(column, display label)` pairs.
pub mod tables {
    /// Balance sheet block.
    pub const BALANCE_SHEET: &[(&str, &str)] = &[
        ("Total Current Assets", "Total Current Assets"),
        ("Property/Plant/Equipment", "Property/Plant/Equipment"),
        ("Total Assets", "Total Assets"),
        ("Total Current Liabilities", "Total Current Liabilities"),
        ("Total Long-Term Debt", "Total Long-Term Debt"),
        ("Total Liabilities", "Total Liabilities"),
    ];

    /// Income statement block.
    pub const INCOME_STATEMENT: &[(&str, &str)] = &[
        ("Revenue", "Revenue"),
        ("Total Operating Expense", "Total Operating Expense"),
        ("Net Income Before Taxes", "Net Income Before Taxes"),
        ("Net Income After Taxes", "Net Income After Taxes"),
        (
            "Net Income Before Extraordinary Items",
            "Net Income Before Extraordinary Items",
        ),
    ];

    /// Profitability block; ratio columns carry a percent suffix in display.
    pub const PROFITABILITY: &[(&str, &str)] = &[
        ("ROE", "ROE, %"),
        ("ROA", "ROA, %"),
        ("ROS", "ROS, %"),
        ("Income After Tax Margin", "Income After Tax Margin"),
        ("Revenue/Total Assets", "Revenue/Total Assets, %"),
        ("Long Term Debt/Equity", "Long Term Debt/Equity, %"),
        ("Total Debt/Equity", "Total Debt/Equity, %"),
    ];
}
