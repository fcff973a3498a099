#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/equity-report/equity-report/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! The ratio-derivation pipeline.
//!
//! Data flows one way through this crate:
//!
//! ```text
//! xlsx files -> normalize -> merge -> transpose -> ratios -> RatioTable
//! ```
//!
//! Every structure is created fresh per run and never mutated after
//! creation. See [`derive_ratio_table`] for the whole chain in one call.

/// The concept-to-label configuration map.
pub mod concepts;
/// Market-capitalization workbook lookups.
pub mod marketcap;
/// Row selection and cross-year merging.
pub mod merge;
/// Per-year unit and header normalization.
pub mod normalize;
/// Ratio derivation and display formatting.
pub mod ratios;
/// Pivot from year-major to label-major.
pub mod transpose;
/// Spreadsheet cell access.
pub mod workbook;

use std::path::Path;

use tracing::{debug, warn};

use report_core::error::{ReportError, Result};
use report_core::{FiscalSpan, Symbol};

pub use concepts::ConceptMap;
pub use marketcap::MarketcapBook;
pub use merge::{MergedSeries, merge_years};
pub use normalize::{StatementSchema, YearlyStatement, normalize_statement};
pub use ratios::{RatioEngine, RatioTable};
pub use transpose::{WideTable, transpose};
pub use workbook::read_statement;

/// Loads and normalizes one statement workbook per span year.
///
/// Paths pair positionally with the span's years, oldest first. A year whose
/// schema lacks the designated start column is skipped with a diagnostic;
/// an unreadable workbook is fatal.
pub fn load_statements(
    paths: &[impl AsRef<Path>],
    schema: &StatementSchema,
    span: &FiscalSpan,
) -> Result<Vec<YearlyStatement>> {
    if paths.len() != span.len() {
        return Err(ReportError::Config(format!(
            "expected {} statement files for span {}-{}, got {}",
            span.len(),
            span.first(),
            span.last(),
            paths.len()
        )));
    }

    let mut statements = Vec::with_capacity(paths.len());
    for (path, year) in paths.iter().zip(span.years()) {
        let raw = workbook::read_statement(path.as_ref())?;
        match normalize::normalize_statement(&raw, schema, year) {
            Ok(statement) => {
                debug!(year, rows = statement.frame.height(), "statement loaded");
                statements.push(statement);
            }
            Err(ReportError::SchemaMismatch { year, what }) => {
                warn!(year, missing = %what, "statement schema mismatch; year skipped");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(statements)
}

/// Output of the full derivation chain.
#[derive(Clone, Debug)]
pub struct DerivedRatios {
    /// The formatted ratio table.
    pub table: RatioTable,
    /// The wide table the ratios were derived from.
    pub wide: WideTable,
    /// Fiscal years that actually contributed a merged row.
    pub merged_years: Vec<i32>,
    /// Labels requested by the concept map but absent from the wide table.
    pub missing_labels: usize,
}

/// Runs the whole chain: merge the statements for `symbol`, transpose over
/// `span`, and derive the ratio table with `concepts`.
pub fn derive_ratio_table(
    statements: &[YearlyStatement],
    symbol: &Symbol,
    schema: &StatementSchema,
    concepts: &ConceptMap,
    span: &FiscalSpan,
) -> Result<DerivedRatios> {
    let merged = merge_years(statements, symbol, schema)?;
    if merged.is_empty() {
        warn!(symbol = %symbol, "security matched in no year; ratio table will be all zeros");
    }

    let wide = transpose(&merged, span)?;
    let mut engine = RatioEngine::new(&wide, concepts)?;
    let table = engine.compute()?;
    let missing_labels = engine.missing_labels();

    Ok(DerivedRatios {
        table,
        wide,
        merged_years: merged.years,
        missing_labels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn statement(year: i32, revenue: f64, net_income: f64) -> YearlyStatement {
        YearlyStatement {
            year,
            frame: DataFrame::new(vec![
                Column::new("MÃ".into(), ["MWG"]),
                Column::new("KQKD. DOANH THU THUẦN".into(), [revenue]),
                Column::new(
                    "KQKD. LỢI NHUẬN SAU THUẾ THU NHẬP DOANH NGHIỆP".into(),
                    [net_income],
                ),
            ])
            .unwrap(),
        }
    }

    #[test]
    fn test_chain_end_to_end() {
        let span = FiscalSpan::new(2020, 2024);
        let statements: Vec<YearlyStatement> = span
            .years()
            .map(|year| statement(year, 1000.0 + f64::from(year - 2020), 100.0))
            .collect();

        let derived = derive_ratio_table(
            &statements,
            &Symbol::new("MWG"),
            &StatementSchema::default(),
            &ConceptMap::default(),
            &span,
        )
        .unwrap();

        assert_eq!(derived.merged_years, [2020, 2021, 2022, 2023, 2024]);
        assert_eq!(
            derived.table.column("Revenue").unwrap(),
            ["1,000.00", "1,001.00", "1,002.00", "1,003.00", "1,004.00"]
        );
        // ROS = 100 / revenue, percentage-scaled.
        assert_eq!(derived.table.column("ROS").unwrap()[0], "10.00");
        // Balance-sheet labels are absent from these frames: counted, zeroed.
        assert!(derived.missing_labels > 0);
        assert_eq!(
            derived.table.column("Total Assets").unwrap()[0],
            "0.00"
        );
    }

    #[test]
    fn test_chain_with_empty_merge() {
        let span = FiscalSpan::new(2020, 2022);
        let statements: Vec<YearlyStatement> =
            span.years().map(|year| statement(year, 1.0, 1.0)).collect();

        let derived = derive_ratio_table(
            &statements,
            &Symbol::new("ABSENT"),
            &StatementSchema::default(),
            &ConceptMap::default(),
            &span,
        )
        .unwrap();

        assert!(derived.merged_years.is_empty());
        assert_eq!(derived.table.column("Revenue").unwrap(), ["0.00"; 3]);
    }

    #[test]
    fn test_load_statements_wrong_count() {
        let err = load_statements(
            &["only-one.xlsx"],
            &StatementSchema::default(),
            &FiscalSpan::new(2020, 2024),
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::Config(_)));
    }
}
