//! Ratio derivation and display formatting.
//!
//! The engine resolves concepts against the wide table, combines them into
//! the derived aggregates and safe ratios, and formats everything into the
//! presentation-only ratio table. Numeric series live only transiently
//! inside a computation; the table carries formatted strings.
//!
//! Lookup tolerance is asymmetric on purpose: a concept key missing from
//! the map fails engine construction (configuration error, fatal), while a
//! label missing from the wide table degrades to a zero contribution and is
//! only counted as a diagnostic.

use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::{debug, warn};

use report_core::error::{ReportError, Result};

use crate::concepts::ConceptMap;
use crate::transpose::WideTable;

/// Concept keys the engine resolves; all of them must be present in the
/// concept map before any computation starts.
pub const REQUIRED_CONCEPTS: &[&str] = &[
    "total_current_assets",
    "ppe",
    "total_assets",
    "total_current_liabilities",
    "total_long_term_debt",
    "total_liabilities",
    "net_income",
    "interest_expense",
    "taxes",
    "depreciation_amortization",
    "revenue",
    "gross_profit",
    "financial_expense",
    "selling_expense",
    "admin_expense",
    "total_equity",
    "total_debt",
    "operating_profit",
    "other_profit",
    "jv_profit",
    "other_income",
];

/// Display column names of the ratio table, in output order (after the
/// leading year column).
pub const METRIC_COLUMNS: &[&str] = &[
    "Total Current Assets",
    "Property/Plant/Equipment",
    "Total Assets",
    "Total Current Liabilities",
    "Total Long-Term Debt",
    "Total Liabilities",
    "EBITDA",
    "Net Income Before Taxes",
    "Net Income Before Extraordinary Items",
    "Revenue",
    "Total Operating Expense",
    "Net Income After Taxes",
    "ROE",
    "ROA",
    "ROS",
    "Income After Tax Margin",
    "Revenue/Total Assets",
    "Long Term Debt/Equity",
    "Total Debt/Equity",
];

/// Name of the ratio table's year column.
pub const YEAR_COLUMN: &str = "Year";

/// Derives the ratio table from a wide table and a concept map.
#[derive(Debug)]
pub struct RatioEngine<'a> {
    wide: &'a WideTable,
    concepts: &'a ConceptMap,
    missing: usize,
}

impl<'a> RatioEngine<'a> {
    /// Creates an engine, validating that every required concept key exists
    /// in the map. A missing key aborts construction.
    pub fn new(wide: &'a WideTable, concepts: &'a ConceptMap) -> Result<Self> {
        for concept in REQUIRED_CONCEPTS {
            concepts.get(concept)?;
        }
        Ok(Self {
            wide,
            concepts,
            missing: 0,
        })
    }

    /// Count of labels requested so far that had no row in the wide table.
    ///
    /// Absent labels contribute zeros by design; this counter keeps schema
    /// drift from being entirely silent.
    #[must_use]
    pub fn missing_labels(&self) -> usize {
        self.missing
    }

    /// The value series for one label, or an all-zero series when the label
    /// has no row.
    fn series(&mut self, label: &str) -> Vec<f64> {
        match self.wide.series(label) {
            Some(values) => values,
            None => {
                debug!(label, "label not present in wide table; contributing zeros");
                self.missing += 1;
                self.wide.zero_series()
            }
        }
    }

    /// Sum over every label of a concept.
    fn concept_sum(&mut self, concept: &str) -> Result<Vec<f64>> {
        let labels = self.concepts.get(concept)?.to_vec();
        let mut total = self.wide.zero_series();
        for label in &labels {
            let values = self.series(label);
            for (t, v) in total.iter_mut().zip(values) {
                *t += v;
            }
        }
        Ok(total)
    }

    /// The series of a single-label concept (the first label of its list).
    fn concept_single(&mut self, concept: &str) -> Result<Vec<f64>> {
        let label = self.concepts.get(concept)?[0].clone();
        Ok(self.series(&label))
    }

    /// Computes every metric and formats the ratio table.
    pub fn compute(&mut self) -> Result<RatioTable> {
        let total_current_assets = self.concept_sum("total_current_assets")?;
        let ppe = self.concept_sum("ppe")?;
        let total_assets = self.concept_sum("total_assets")?;
        let total_current_liabilities = self.concept_single("total_current_liabilities")?;
        let total_long_term_debt = self.concept_single("total_long_term_debt")?;
        let total_liabilities = self.concept_single("total_liabilities")?;

        let net_income = self.concept_single("net_income")?;
        let interest_expense = self.concept_single("interest_expense")?;
        let taxes = self.concept_single("taxes")?;
        let depreciation_amortization = self.concept_single("depreciation_amortization")?;
        let ebitda = vadd(
            &vadd(&net_income, &interest_expense),
            &vadd(&taxes, &depreciation_amortization),
        );

        let operating_profit = self.concept_single("operating_profit")?;
        let other_profit = self.concept_single("other_profit")?;
        let jv_profit = self.concept_single("jv_profit")?;
        let net_income_before_taxes = vadd(&vadd(&operating_profit, &other_profit), &jv_profit);

        let other_income = self.concept_single("other_income")?;
        let net_income_before_extraordinary = vadd(&net_income, &other_income);

        let revenue = self.concept_single("revenue")?;
        let gross_profit = self.concept_single("gross_profit")?;
        let financial_expense = self.concept_single("financial_expense")?;
        let selling_expense = self.concept_single("selling_expense")?;
        let admin_expense = self.concept_single("admin_expense")?;
        // Expense residual reconstructed from the profit lines, not a sum of
        // raw expense items.
        let total_operating_expense = vadd(
            &vadd(&vsub(&revenue, &gross_profit), &financial_expense),
            &vadd(&selling_expense, &admin_expense),
        );

        let total_equity = self.concept_single("total_equity")?;
        let total_debt = self.concept_single("total_debt")?;

        let roe = safe_divide(&net_income, &total_equity);
        let roa = safe_divide(&net_income, &total_assets);
        let ros = safe_divide(&net_income, &revenue);
        let income_after_tax_margin = safe_divide(&net_income, &revenue);
        let revenue_to_assets = safe_divide(&revenue, &total_assets);
        let long_term_debt_to_equity = safe_divide(&total_long_term_debt, &total_equity);
        let total_debt_to_equity = safe_divide(&total_debt, &total_equity);

        if self.missing > 0 {
            warn!(
                missing = self.missing,
                "labels requested but not found in wide table; treated as zero"
            );
        }

        let columns = vec![
            Column::new(YEAR_COLUMN.into(), self.wide.year_labels()),
            format_column("Total Current Assets", &total_current_assets, 1.0),
            format_column("Property/Plant/Equipment", &ppe, 1.0),
            format_column("Total Assets", &total_assets, 1.0),
            format_column("Total Current Liabilities", &total_current_liabilities, 1.0),
            format_column("Total Long-Term Debt", &total_long_term_debt, 1.0),
            format_column("Total Liabilities", &total_liabilities, 1.0),
            format_column("EBITDA", &ebitda, 1.0),
            format_column("Net Income Before Taxes", &net_income_before_taxes, 1.0),
            format_column(
                "Net Income Before Extraordinary Items",
                &net_income_before_extraordinary,
                1.0,
            ),
            format_column("Revenue", &revenue, 1.0),
            format_column("Total Operating Expense", &total_operating_expense, 1.0),
            format_column("Net Income After Taxes", &net_income, 1.0),
            format_column("ROE", &roe, 100.0),
            format_column("ROA", &roa, 100.0),
            format_column("ROS", &ros, 100.0),
            format_column("Income After Tax Margin", &income_after_tax_margin, 1.0),
            format_column("Revenue/Total Assets", &revenue_to_assets, 100.0),
            format_column("Long Term Debt/Equity", &long_term_debt_to_equity, 100.0),
            format_column("Total Debt/Equity", &total_debt_to_equity, 100.0),
        ];

        Ok(RatioTable {
            frame: DataFrame::new(columns)?,
        })
    }

    /// The percentage-scaled profitability series (ROE, ROA, ROS) for chart
    /// rendering. Recomputed on demand; nothing numeric is retained.
    pub fn profitability_series(&mut self) -> Result<Vec<(String, Vec<f64>)>> {
        let net_income = self.concept_single("net_income")?;
        let revenue = self.concept_single("revenue")?;
        let total_assets = self.concept_sum("total_assets")?;
        let total_equity = self.concept_single("total_equity")?;

        Ok(vec![
            ("ROE".to_string(), vscale(&safe_divide(&net_income, &total_equity), 100.0)),
            ("ROA".to_string(), vscale(&safe_divide(&net_income, &total_assets), 100.0)),
            ("ROS".to_string(), vscale(&safe_divide(&net_income, &revenue), 100.0)),
        ])
    }

    /// Balance-sheet aggregates (assets, liabilities, equity) for chart
    /// rendering.
    pub fn balance_series(&mut self) -> Result<Vec<(String, Vec<f64>)>> {
        Ok(vec![
            ("Total Assets".to_string(), self.concept_sum("total_assets")?),
            (
                "Total Liabilities".to_string(),
                self.concept_single("total_liabilities")?,
            ),
            (
                "Total Equity".to_string(),
                self.concept_single("total_equity")?,
            ),
        ])
    }
}

/// The finished, presentation-only ratio table: one row per year, formatted
/// strings in every metric column.
#[derive(Clone, Debug, PartialEq)]
pub struct RatioTable {
    frame: DataFrame,
}

impl RatioTable {
    /// The underlying frame.
    #[must_use]
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Year labels, oldest first.
    pub fn years(&self) -> Result<Vec<String>> {
        self.column(YEAR_COLUMN)
    }

    /// The formatted values of one column, oldest year first.
    pub fn column(&self, name: &str) -> Result<Vec<String>> {
        let column = self.frame.column(name)?;
        Ok(column
            .str()?
            .into_iter()
            .map(|v| v.unwrap_or_default().to_string())
            .collect())
    }

    /// Selects columns into a sub-table of `(display label, values)` rows
    /// for the renderer. No computation happens here.
    pub fn select(&self, picks: &[(&str, &str)]) -> Result<Vec<(String, Vec<String>)>> {
        picks
            .iter()
            .map(|&(column, display)| Ok((display.to_string(), self.column(column)?)))
            .collect()
    }

    /// Writes the table as CSV.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut file = File::create(path)?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut self.frame.clone())
            .map_err(ReportError::from)
    }
}

fn vadd(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x + y).collect()
}

fn vsub(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

fn vscale(a: &[f64], factor: f64) -> Vec<f64> {
    a.iter().map(|x| x * factor).collect()
}

/// Element-wise division returning 0 wherever the denominator is 0.
#[must_use]
pub fn safe_divide(numerator: &[f64], denominator: &[f64]) -> Vec<f64> {
    numerator
        .iter()
        .zip(denominator)
        .map(|(n, d)| if *d == 0.0 { 0.0 } else { n / d })
        .collect()
}

/// Formats a value as a thousands-grouped, two-decimal string.
#[must_use]
pub fn group_format(value: f64) -> String {
    let fixed = format!("{value:.2}");
    let (sign, rest) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (int_part, frac_part) = rest.split_once('.').unwrap_or((rest, "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{sign}{grouped}.{frac_part}")
}

fn format_column(name: &str, values: &[f64], scale: f64) -> Column {
    let formatted: Vec<String> = values.iter().map(|v| group_format(v * scale)).collect();
    Column::new(name.into(), formatted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::MergedSeries;
    use crate::transpose::transpose;
    use report_core::FiscalSpan;

    fn wide_from(columns: Vec<Column>, years: Vec<i32>, span: FiscalSpan) -> WideTable {
        let merged = MergedSeries {
            frame: DataFrame::new(columns).unwrap(),
            years,
        };
        transpose(&merged, &span).unwrap()
    }

    fn minimal_concepts() -> ConceptMap {
        let mut map = ConceptMap::new();
        for concept in REQUIRED_CONCEPTS {
            map.insert(*concept, vec![format!("L-{concept}")]);
        }
        map
    }

    #[test]
    fn test_engine_requires_every_concept() {
        let wide = wide_from(
            vec![Column::new("X".into(), [1.0])],
            vec![2020],
            FiscalSpan::new(2020, 2022),
        );
        let mut incomplete = minimal_concepts();
        incomplete.insert("net_income", vec![]);

        assert!(RatioEngine::new(&wide, &incomplete).is_err());
        assert!(RatioEngine::new(&wide, &minimal_concepts()).is_ok());
    }

    #[test]
    fn test_absent_labels_sum_to_zero_series() {
        // Nothing in the wide table matches any concept label: every series
        // is all zeros of year-count length, and nothing panics.
        let wide = wide_from(
            vec![Column::new("UNRELATED".into(), [1.0])],
            vec![2020],
            FiscalSpan::new(2020, 2022),
        );
        let concepts = minimal_concepts();
        let mut engine = RatioEngine::new(&wide, &concepts).unwrap();

        let table = engine.compute().unwrap();
        assert_eq!(
            table.column("Total Assets").unwrap(),
            ["0.00", "0.00", "0.00"]
        );
        assert!(engine.missing_labels() > 0);
    }

    #[test]
    fn test_partial_concept_resolves_present_labels() {
        // total_assets = ["A", "B"], "B" absent, "A" = [5, 5, 5].
        let wide = wide_from(
            vec![Column::new("A".into(), [5.0, 5.0, 5.0])],
            vec![2020, 2021, 2022],
            FiscalSpan::new(2020, 2022),
        );
        let mut concepts = minimal_concepts();
        concepts.insert("total_assets", vec!["A".to_string(), "B".to_string()]);
        let mut engine = RatioEngine::new(&wide, &concepts).unwrap();

        let table = engine.compute().unwrap();
        assert_eq!(
            table.column("Total Assets").unwrap(),
            ["5.00", "5.00", "5.00"]
        );
        assert!(engine.missing_labels() > 0);
    }

    #[test]
    fn test_ros_scenario_with_zero_revenue() {
        // NET INCOME = [100, 150, -20], REVENUE = [1000, 1500, 0]:
        // ROS = [10.00, 10.00, 0.00] after percentage scaling, no error.
        let wide = wide_from(
            vec![
                Column::new("L-net_income".into(), [100.0, 150.0, -20.0]),
                Column::new("L-revenue".into(), [1000.0, 1500.0, 0.0]),
            ],
            vec![2020, 2021, 2022],
            FiscalSpan::new(2020, 2022),
        );
        let concepts = minimal_concepts();
        let mut engine = RatioEngine::new(&wide, &concepts).unwrap();

        let table = engine.compute().unwrap();
        assert_eq!(table.column("ROS").unwrap(), ["10.00", "10.00", "0.00"]);
        // The margin column is the same quotient without percentage scaling.
        assert_eq!(
            table.column("Income After Tax Margin").unwrap(),
            ["0.10", "0.10", "0.00"]
        );
    }

    #[test]
    fn test_derived_aggregates() {
        let wide = wide_from(
            vec![
                Column::new("L-net_income".into(), [10.0]),
                Column::new("L-interest_expense".into(), [2.0]),
                Column::new("L-taxes".into(), [3.0]),
                Column::new("L-depreciation_amortization".into(), [5.0]),
                Column::new("L-revenue".into(), [100.0]),
                Column::new("L-gross_profit".into(), [40.0]),
                Column::new("L-financial_expense".into(), [4.0]),
                Column::new("L-selling_expense".into(), [6.0]),
                Column::new("L-admin_expense".into(), [8.0]),
            ],
            vec![2020],
            FiscalSpan::new(2020, 2020),
        );
        let concepts = minimal_concepts();
        let mut engine = RatioEngine::new(&wide, &concepts).unwrap();

        let table = engine.compute().unwrap();
        assert_eq!(table.column("EBITDA").unwrap(), ["20.00"]);
        // 100 - 40 + 4 + 6 + 8
        assert_eq!(table.column("Total Operating Expense").unwrap(), ["78.00"]);
    }

    #[test]
    fn test_table_carries_every_metric_column() {
        let wide = wide_from(
            vec![Column::new("L-revenue".into(), [1.0])],
            vec![2020],
            FiscalSpan::new(2020, 2020),
        );
        let concepts = minimal_concepts();
        let mut engine = RatioEngine::new(&wide, &concepts).unwrap();
        let table = engine.compute().unwrap();

        assert_eq!(table.frame().width(), METRIC_COLUMNS.len() + 1);
        for name in METRIC_COLUMNS {
            assert!(table.column(name).is_ok(), "missing column {name}");
        }
    }

    #[test]
    fn test_safe_divide() {
        let out = safe_divide(&[10.0, -5.0, 3.0], &[2.0, 0.0, -1.0]);
        assert_eq!(out, [5.0, 0.0, -3.0]);
    }

    #[test]
    fn test_group_format() {
        assert_eq!(group_format(1234567.891), "1,234,567.89");
        assert_eq!(group_format(-1234.5), "-1,234.50");
        assert_eq!(group_format(0.0), "0.00");
        assert_eq!(group_format(999.0), "999.00");
        assert_eq!(group_format(1000.0), "1,000.00");
    }

    #[test]
    fn test_csv_round_trip_header() {
        let wide = wide_from(
            vec![Column::new("L-revenue".into(), [1.0])],
            vec![2020],
            FiscalSpan::new(2020, 2020),
        );
        let concepts = minimal_concepts();
        let mut engine = RatioEngine::new(&wide, &concepts).unwrap();
        let table = engine.compute().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ratios.csv");
        table.write_csv(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let header = written.lines().next().unwrap();
        assert!(header.starts_with("Year,"));
        assert!(header.contains("EBITDA"));
        assert!(header.contains("Total Debt/Equity"));
    }
}
