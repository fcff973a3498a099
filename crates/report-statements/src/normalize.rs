//! Per-year unit and header normalization.
//!
//! Source statements arrive with locale-decorated headers ("Năm: 2020",
//! unit annotations, consolidation phrases), footnote reference columns, and
//! monetary values whose unit changed partway through the covered years.
//! Normalization strips the decorations, drops the footnote columns,
//! canonicalizes header text, and rescales the early years to the target
//! unit. The rules live in one [`StatementSchema`] table so a different
//! source locale only means a different schema value, not different code.

use polars::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use report_core::error::{ReportError, Result};

/// Normalization and selection rules for a statement source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatementSchema {
    /// Header of the column holding the security identifier.
    pub identifier_column: String,
    /// Header after which all columns are monetary and coerced to numeric.
    pub start_column: String,
    /// Substring marking footnote reference columns, dropped entirely.
    pub footnote_marker: String,
    /// Year marker template stripped from headers; `{year}` is substituted.
    pub year_marker: String,
    /// Regex for the unit annotation stripped from headers.
    pub unit_annotation: String,
    /// Regex for the fixed locale phrases stripped from headers.
    pub locale_phrases: String,
    /// Divisor applied to monetary columns of the designated years.
    pub unit_divisor: f64,
    /// Years whose source data still needs the unit divisor applied.
    pub divisor_years: Vec<i32>,
    /// Header substrings dropped from the merged frame (case-insensitive).
    pub drop_contains: Vec<String>,
}

impl Default for StatementSchema {
    /// Rules for the Vietnamese statement exports the generator was built
    /// around: values in VND, 2020-2022 files reported in units of VND
    /// rather than billions.
    fn default() -> Self {
        Self {
            identifier_column: "MÃ".to_string(),
            start_column: "Trạng thái kiểm toán".to_string(),
            footnote_marker: "TM".to_string(),
            year_marker: "Năm: {year}".to_string(),
            unit_annotation: r"Đơn vị: (Tỷ|Triệu) VND".to_string(),
            locale_phrases: r"\bHợp nhất\b|\bQuý: Hàng năm\b".to_string(),
            unit_divisor: 1e9,
            divisor_years: vec![2020, 2021, 2022],
            drop_contains: vec!["CURRENT RATIO".to_string()],
        }
    }
}

impl StatementSchema {
    /// Whether `year`'s monetary columns need the unit divisor.
    #[must_use]
    pub fn needs_divisor(&self, year: i32) -> bool {
        self.divisor_years.contains(&year)
    }
}

/// One fiscal year's statement table, immutable after normalization.
#[derive(Clone, Debug)]
pub struct YearlyStatement {
    /// Fiscal year the statement covers.
    pub year: i32,
    /// The normalized table: one row per listed security.
    pub frame: DataFrame,
}

/// Canonical form of a header: trimmed, newlines collapsed to spaces,
/// uppercased. Label lookup everywhere downstream is exact match on this
/// form.
#[must_use]
pub fn canonical(header: &str) -> String {
    header.trim().replace('\n', " ").to_uppercase()
}

/// Strips locale decorations from every header, drops footnote columns, and
/// canonicalizes the remaining header text.
///
/// Applying this to an already-normalized frame is a no-op: the strip
/// patterns no longer match and canonicalization is idempotent.
pub fn normalize_headers(
    frame: &DataFrame,
    schema: &StatementSchema,
    year: i32,
) -> Result<DataFrame> {
    let year_marker = schema.year_marker.replace("{year}", &year.to_string());
    let unit_annotation = Regex::new(&schema.unit_annotation)
        .map_err(|e| ReportError::Config(format!("bad unit annotation pattern: {e}")))?;
    let locale_phrases = Regex::new(&schema.locale_phrases)
        .map_err(|e| ReportError::Config(format!("bad locale phrase pattern: {e}")))?;

    let mut seen: Vec<String> = Vec::new();
    let mut columns: Vec<Column> = Vec::new();

    for column in frame.get_columns() {
        let stripped = column.name().replace(&year_marker, "");
        let stripped = unit_annotation.replace_all(&stripped, "");
        let stripped = locale_phrases.replace_all(&stripped, "");
        let stripped = stripped.trim();

        if stripped.contains(&schema.footnote_marker) {
            continue;
        }

        let name = canonical(stripped);
        if seen.contains(&name) {
            warn!(year, header = %name, "duplicate header after normalization; keeping first");
            continue;
        }

        let mut renamed = column.clone();
        renamed.rename(name.as_str().into());
        seen.push(name);
        columns.push(renamed);
    }

    Ok(DataFrame::new(columns)?)
}

/// Coerces every column after the start column to numeric and applies the
/// unit divisor for the years the schema designates.
///
/// The coercion runs for every year so the merged frame has one dtype per
/// label; only the divisor is year-dependent. Unparseable cells become null
/// silently; they are only treated as zero after the transpose fill step. A
/// schema whose start column is absent yields a
/// [`ReportError::SchemaMismatch`] so the caller can skip the year with a
/// diagnostic.
pub fn convert_units(frame: &DataFrame, schema: &StatementSchema, year: i32) -> Result<DataFrame> {
    let divisor = if schema.needs_divisor(year) {
        schema.unit_divisor
    } else {
        1.0
    };

    let start = canonical(&schema.start_column);
    let start_idx = frame
        .get_column_names()
        .iter()
        .position(|name| name.as_str() == start)
        .ok_or_else(|| ReportError::SchemaMismatch {
            year,
            what: start.clone(),
        })?;

    let mut columns: Vec<Column> = Vec::with_capacity(frame.width());
    for (i, column) in frame.get_columns().iter().enumerate() {
        if i <= start_idx {
            columns.push(column.clone());
            continue;
        }

        let numeric = column.cast(&DataType::Float64)?;
        let divided: Vec<Option<f64>> = numeric
            .f64()?
            .into_iter()
            .map(|v| v.map(|x| x / divisor))
            .collect();
        columns.push(Column::new(column.name().clone(), divided));
    }

    Ok(DataFrame::new(columns)?)
}

/// Normalizes one yearly statement: header cleanup, numeric coercion, and
/// the unit divisor where the year calls for it.
pub fn normalize_statement(
    frame: &DataFrame,
    schema: &StatementSchema,
    year: i32,
) -> Result<YearlyStatement> {
    let frame = normalize_headers(frame, schema, year)?;
    let frame = convert_units(&frame, schema, year)?;

    Ok(YearlyStatement { year, frame })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_frame() -> DataFrame {
        DataFrame::new(vec![
            Column::new("MÃ".into(), ["MWG", "FPT"]),
            Column::new(
                "Trạng thái kiểm toán Hợp nhất".into(),
                ["Audited", "Audited"],
            ),
            Column::new(
                "CĐKT. TÀI SẢN NGẮN HẠN Năm: 2020 Đơn vị: Tỷ VND".into(),
                ["1000000000", "2000000000"],
            ),
            Column::new("Thuyết minh TM".into(), ["1", "2"]),
            Column::new(
                "doanh thu thuần\nQuý: Hàng năm".into(),
                ["5000000000", "x"],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_normalize_headers_strips_and_uppercases() {
        let schema = StatementSchema::default();
        let df = normalize_headers(&raw_frame(), &schema, 2020).unwrap();
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            names,
            [
                "MÃ",
                "TRẠNG THÁI KIỂM TOÁN",
                "CĐKT. TÀI SẢN NGẮN HẠN",
                "DOANH THU THUẦN",
            ]
        );
    }

    #[test]
    fn test_normalize_headers_idempotent() {
        let schema = StatementSchema::default();
        let once = normalize_headers(&raw_frame(), &schema, 2020).unwrap();
        let twice = normalize_headers(&once, &schema, 2020).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_convert_units_divides_and_nulls() {
        let schema = StatementSchema::default();
        let df = normalize_headers(&raw_frame(), &schema, 2020).unwrap();
        let df = convert_units(&df, &schema, 2020).unwrap();

        let assets = df.column("CĐKT. TÀI SẢN NGẮN HẠN").unwrap();
        let assets = assets.f64().unwrap();
        assert_eq!(assets.get(0), Some(1.0));
        assert_eq!(assets.get(1), Some(2.0));

        // Unparseable cell coerced to null, not an error.
        let revenue = df.column("DOANH THU THUẦN").unwrap();
        let revenue = revenue.f64().unwrap();
        assert_eq!(revenue.get(0), Some(5.0));
        assert_eq!(revenue.get(1), None);

        // Identifier column untouched.
        let id = df.column("MÃ").unwrap();
        assert_eq!(id.str().unwrap().get(0), Some("MWG"));
    }

    #[test]
    fn test_convert_units_coerces_without_divisor_in_later_years() {
        // 2023 is outside the divisor years: values coerce to numeric but
        // keep their scale.
        let schema = StatementSchema::default();
        let df = normalize_headers(&raw_frame(), &schema, 2020).unwrap();
        let df = convert_units(&df, &schema, 2023).unwrap();

        let assets = df.column("CĐKT. TÀI SẢN NGẮN HẠN").unwrap();
        let assets = assets.f64().unwrap();
        assert_eq!(assets.get(0), Some(1_000_000_000.0));
    }

    #[test]
    fn test_convert_units_missing_start_column() {
        let schema = StatementSchema {
            start_column: "NO SUCH COLUMN".to_string(),
            ..StatementSchema::default()
        };
        let df = normalize_headers(&raw_frame(), &schema, 2020).unwrap();
        let err = convert_units(&df, &schema, 2020).unwrap_err();
        assert!(matches!(
            err,
            ReportError::SchemaMismatch { year: 2020, .. }
        ));
    }
}
