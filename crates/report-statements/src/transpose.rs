//! Pivot from year-major to label-major.
//!
//! The merged long-format series (one row per year) is pivoted into the wide
//! table the ratio engine reads: one row per line-item label, one column per
//! year of the fixed span. Each merged row lands in the column of its
//! recorded fiscal year, so a year in which the security was not listed
//! becomes a zero column instead of shifting its neighbours. All gaps are
//! filled with zero; from here on the pipeline never sees a null.

use polars::prelude::*;
use std::collections::HashMap;
use tracing::warn;

use report_core::FiscalSpan;
use report_core::error::Result;

use crate::merge::MergedSeries;

/// Name of the label column in the wide table.
pub const LABEL_COLUMN: &str = "line-item";

/// Label-major table: one row per line-item label, one `f64` column per year
/// of the span, oldest first.
#[derive(Clone, Debug)]
pub struct WideTable {
    frame: DataFrame,
    labels: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<f64>>,
}

impl WideTable {
    /// The underlying frame (label column plus one column per year).
    #[must_use]
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Line-item labels in row order.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Year column labels, oldest first.
    #[must_use]
    pub fn year_labels(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .skip(1)
            .map(|name| name.to_string())
            .collect()
    }

    /// Number of year columns.
    #[must_use]
    pub fn year_count(&self) -> usize {
        self.frame.width().saturating_sub(1)
    }

    /// The value series for `label`, exact-string-matched; `None` when the
    /// label has no row.
    #[must_use]
    pub fn series(&self, label: &str) -> Option<Vec<f64>> {
        self.index.get(label).map(|&i| self.rows[i].clone())
    }

    /// An all-zero series of year-count length, the stand-in for any label
    /// absent from the table.
    #[must_use]
    pub fn zero_series(&self) -> Vec<f64> {
        vec![0.0; self.year_count()]
    }
}

/// Pivots `merged` into a [`WideTable`] over the fixed `span`.
///
/// The output column set is always the span's full year list regardless of
/// how many rows the merged series had; null cells and entirely missing
/// years come out as zero.
pub fn transpose(merged: &MergedSeries, span: &FiscalSpan) -> Result<WideTable> {
    let year_count = span.len();

    // Row position of each span year within the merged frame. Duplicate rows
    // for one year would be a malformed source; the first wins.
    let mut row_of_year: HashMap<i32, usize> = HashMap::new();
    for (row, &year) in merged.years.iter().enumerate() {
        if span.index_of(year).is_none() {
            warn!(year, "merged row outside the report span; ignored");
            continue;
        }
        if row_of_year.contains_key(&year) {
            warn!(year, "duplicate merged row for year; keeping first");
            continue;
        }
        row_of_year.insert(year, row);
    }

    let mut labels: Vec<String> = Vec::with_capacity(merged.frame.width());
    let mut rows: Vec<Vec<f64>> = Vec::with_capacity(merged.frame.width());

    for column in merged.frame.get_columns() {
        let numeric = column.cast(&DataType::Float64)?;
        let values = numeric.f64()?;

        let mut row = Vec::with_capacity(year_count);
        for year in span.years() {
            let value = row_of_year
                .get(&year)
                .and_then(|&i| values.get(i))
                .unwrap_or(0.0);
            row.push(value);
        }

        labels.push(column.name().to_string());
        rows.push(row);
    }

    let mut columns: Vec<Column> = Vec::with_capacity(year_count + 1);
    columns.push(Column::new(LABEL_COLUMN.into(), labels.clone()));
    for (i, year_label) in span.labels().into_iter().enumerate() {
        let year_values: Vec<f64> = rows.iter().map(|row| row[i]).collect();
        columns.push(Column::new(year_label.as_str().into(), year_values));
    }

    let index = labels
        .iter()
        .enumerate()
        .map(|(i, label)| (label.clone(), i))
        .collect();

    Ok(WideTable {
        frame: DataFrame::new(columns)?,
        labels,
        index,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merged_three_years() -> MergedSeries {
        MergedSeries {
            frame: DataFrame::new(vec![
                Column::new("MÃ".into(), ["MWG", "MWG", "MWG"]),
                Column::new("NET INCOME".into(), [100.0, 150.0, -20.0]),
                Column::new(
                    "REVENUE".into(),
                    [Some(1000.0), None, Some(0.0)],
                ),
            ])
            .unwrap(),
            years: vec![2020, 2021, 2022],
        }
    }

    #[test]
    fn test_transpose_shape_and_fill() {
        let span = FiscalSpan::new(2020, 2024);
        let wide = transpose(&merged_three_years(), &span).unwrap();

        assert_eq!(wide.year_count(), 5);
        assert_eq!(wide.year_labels(), ["2020", "2021", "2022", "2023", "2024"]);
        assert_eq!(
            wide.series("NET INCOME").unwrap(),
            [100.0, 150.0, -20.0, 0.0, 0.0]
        );
        // Null cell filled with zero.
        assert_eq!(
            wide.series("REVENUE").unwrap(),
            [1000.0, 0.0, 0.0, 0.0, 0.0]
        );
        // Text column casts to an all-zero row, never an error.
        assert_eq!(wide.series("MÃ").unwrap(), [0.0; 5]);
    }

    #[test]
    fn test_transpose_aligns_by_recorded_year() {
        // 2021 missing from the merge: its column is zero and 2022 stays put.
        let merged = MergedSeries {
            frame: DataFrame::new(vec![Column::new("REVENUE".into(), [10.0, 12.0])]).unwrap(),
            years: vec![2020, 2022],
        };
        let wide = transpose(&merged, &FiscalSpan::new(2020, 2022)).unwrap();
        assert_eq!(wide.series("REVENUE").unwrap(), [10.0, 0.0, 12.0]);
    }

    #[test]
    fn test_transpose_empty_merge() {
        let wide = transpose(&MergedSeries::empty(), &FiscalSpan::default()).unwrap();
        assert_eq!(wide.year_count(), 5);
        assert!(wide.labels().is_empty());
        assert_eq!(wide.series("ANYTHING"), None);
        assert_eq!(wide.zero_series(), [0.0; 5]);
    }

    #[test]
    fn test_round_trip_preserves_cells() {
        let merged = merged_three_years();
        let span = FiscalSpan::new(2020, 2022);
        let wide = transpose(&merged, &span).unwrap();

        // Re-widen: read each year column back out of the wide frame and
        // compare with the label-major rows.
        for (i, year_label) in wide.year_labels().iter().enumerate() {
            let column = wide.frame().column(year_label).unwrap();
            let column = column.f64().unwrap();
            for (j, label) in wide.labels().iter().enumerate() {
                let cell = column.get(j).unwrap();
                assert_eq!(cell, wide.series(label).unwrap()[i]);
            }
        }
    }
}
