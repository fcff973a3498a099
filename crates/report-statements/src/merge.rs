//! Row selection and cross-year merging.
//!
//! Each normalized yearly statement contributes the single row matching the
//! target security. Years where the identifier column is missing, or where
//! the security simply is not listed, are skipped with a diagnostic and
//! excluded from the merge; they are never zero-filled here. Year-to-year
//! schema drift is tolerated by concatenating diagonally over the union of
//! labels.

use polars::prelude::*;
use tracing::warn;

use report_core::Symbol;
use report_core::error::Result;

use crate::normalize::{StatementSchema, YearlyStatement, canonical};

/// Long-format series for one security: one row per fiscal year that
/// actually listed it, in chronological order.
#[derive(Clone, Debug)]
pub struct MergedSeries {
    /// The merged frame; columns are the union of labels across the
    /// contributing years, nulls where a year lacked a label.
    pub frame: DataFrame,
    /// Fiscal year of each row, parallel to the frame's rows.
    pub years: Vec<i32>,
}

impl MergedSeries {
    /// An explicitly empty result: the security matched in no year.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            frame: DataFrame::empty(),
            years: Vec::new(),
        }
    }

    /// True when no year produced a matching row.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// Number of merged rows.
    #[must_use]
    pub fn height(&self) -> usize {
        self.years.len()
    }
}

/// Selects the row matching `symbol` from each yearly statement and
/// concatenates the matches in year order.
///
/// Returns [`MergedSeries::empty`] when no year matches; callers must handle
/// the empty case.
pub fn merge_years(
    statements: &[YearlyStatement],
    symbol: &Symbol,
    schema: &StatementSchema,
) -> Result<MergedSeries> {
    let id_column = canonical(&schema.identifier_column);

    let mut parts: Vec<LazyFrame> = Vec::with_capacity(statements.len());
    let mut years: Vec<i32> = Vec::with_capacity(statements.len());

    for statement in statements {
        let Ok(column) = statement.frame.column(&id_column) else {
            warn!(
                year = statement.year,
                column = %id_column,
                "identifier column missing from statement; year skipped"
            );
            continue;
        };

        let Ok(codes) = column.str() else {
            warn!(
                year = statement.year,
                column = %id_column,
                "identifier column is not text; year skipped"
            );
            continue;
        };

        let matched = statement.frame.filter(&codes.equal(symbol.as_str()))?;
        if matched.height() == 0 {
            warn!(
                year = statement.year,
                symbol = %symbol,
                "security not listed in statement; year skipped"
            );
            continue;
        }

        years.extend(std::iter::repeat_n(statement.year, matched.height()));
        parts.push(matched.lazy());
    }

    if parts.is_empty() {
        return Ok(MergedSeries::empty());
    }

    let mut merged = concat_lf_diagonal(&parts, UnionArgs::default())?.collect()?;

    let dropped: Vec<PlSmallStr> = merged
        .get_column_names()
        .iter()
        .filter(|name| {
            let upper = name.to_uppercase();
            schema
                .drop_contains
                .iter()
                .any(|pattern| upper.contains(&pattern.to_uppercase()))
        })
        .map(|name| (*name).clone())
        .collect();
    if !dropped.is_empty() {
        merged = merged.drop_many(dropped);
    }

    Ok(MergedSeries {
        frame: merged,
        years,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement(year: i32, codes: &[&str], revenue: &[f64]) -> YearlyStatement {
        YearlyStatement {
            year,
            frame: DataFrame::new(vec![
                Column::new("MÃ".into(), codes.to_vec()),
                Column::new("DOANH THU THUẦN".into(), revenue.to_vec()),
            ])
            .unwrap(),
        }
    }

    #[test]
    fn test_merge_preserves_year_order_and_skips_missing() {
        // Present in 3 of 5 years: no synthesized rows for the gaps.
        let statements = vec![
            statement(2020, &["MWG", "FPT"], &[10.0, 99.0]),
            statement(2021, &["FPT"], &[98.0]),
            statement(2022, &["MWG"], &[12.0]),
            statement(2023, &["FPT"], &[97.0]),
            statement(2024, &["FPT", "MWG"], &[96.0, 14.0]),
        ];
        let merged = merge_years(
            &statements,
            &Symbol::new("MWG"),
            &StatementSchema::default(),
        )
        .unwrap();

        assert_eq!(merged.height(), 3);
        assert_eq!(merged.years, [2020, 2022, 2024]);

        let revenue = merged.frame.column("DOANH THU THUẦN").unwrap();
        let revenue = revenue.f64().unwrap();
        assert_eq!(revenue.get(0), Some(10.0));
        assert_eq!(revenue.get(1), Some(12.0));
        assert_eq!(revenue.get(2), Some(14.0));
    }

    #[test]
    fn test_merge_unions_drifting_schemas() {
        let wide = YearlyStatement {
            year: 2021,
            frame: DataFrame::new(vec![
                Column::new("MÃ".into(), ["MWG"]),
                Column::new("DOANH THU THUẦN".into(), [20.0]),
                Column::new("CHI PHÍ BÁN HÀNG".into(), [5.0]),
            ])
            .unwrap(),
        };
        let statements = vec![statement(2020, &["MWG"], &[10.0]), wide];
        let merged = merge_years(
            &statements,
            &Symbol::new("MWG"),
            &StatementSchema::default(),
        )
        .unwrap();

        assert_eq!(merged.height(), 2);
        let selling = merged.frame.column("CHI PHÍ BÁN HÀNG").unwrap();
        let selling = selling.f64().unwrap();
        assert_eq!(selling.get(0), None);
        assert_eq!(selling.get(1), Some(5.0));
    }

    #[test]
    fn test_merge_missing_identifier_column_skips_year() {
        let no_id = YearlyStatement {
            year: 2021,
            frame: DataFrame::new(vec![Column::new("DOANH THU THUẦN".into(), [1.0])]).unwrap(),
        };
        let statements = vec![statement(2020, &["MWG"], &[10.0]), no_id];
        let merged = merge_years(
            &statements,
            &Symbol::new("MWG"),
            &StatementSchema::default(),
        )
        .unwrap();
        assert_eq!(merged.years, [2020]);
    }

    #[test]
    fn test_merge_no_match_is_empty_not_error() {
        let statements = vec![statement(2020, &["FPT"], &[1.0])];
        let merged = merge_years(
            &statements,
            &Symbol::new("MWG"),
            &StatementSchema::default(),
        )
        .unwrap();
        assert!(merged.is_empty());
        assert_eq!(merged.height(), 0);
    }

    #[test]
    fn test_merge_drops_configured_columns() {
        let with_ratio = YearlyStatement {
            year: 2020,
            frame: DataFrame::new(vec![
                Column::new("MÃ".into(), ["MWG"]),
                Column::new("CURRENT RATIO (X)".into(), [1.8]),
            ])
            .unwrap(),
        };
        let merged = merge_years(
            &[with_ratio],
            &Symbol::new("MWG"),
            &StatementSchema::default(),
        )
        .unwrap();
        assert!(merged.frame.column("CURRENT RATIO (X)").is_err());
        assert!(merged.frame.column("MÃ").is_ok());
    }
}
