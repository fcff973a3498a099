//! Spreadsheet cell access.
//!
//! Workbooks are read cell-by-cell with `calamine` and materialized
//! column-wise into polars DataFrames. Every cell is carried as text at this
//! stage; numeric coercion happens later in the normalizer, where unparseable
//! cells silently become null.

use calamine::{Data, Range, Reader, open_workbook_auto};
use polars::prelude::*;
use std::path::Path;

use report_core::error::{ReportError, Result};

/// Renders one cell as trimmed text, `None` for empty or error cells.
pub(crate) fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Data::Float(f) => Some(f.to_string()),
        Data::Int(i) => Some(i.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
    }
}

/// Reads one cell as a number, if it holds one.
pub(crate) fn cell_number(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

/// Opens `path` and returns the raw cell grid of `sheet`.
pub(crate) fn read_grid(path: &Path, sheet: &str) -> Result<Range<Data>> {
    let mut workbook = open_workbook_auto(path).map_err(|e| ReportError::Workbook {
        path: path.display().to_string(),
        detail: e.to_string(),
    })?;

    workbook
        .worksheet_range(sheet)
        .map_err(|_| ReportError::SheetNotFound(sheet.to_string()))
}

/// Reads the first sheet of a yearly statement workbook into a DataFrame.
///
/// The first row is taken as the header; duplicate header text is
/// disambiguated with a numeric suffix so the frame can be constructed.
/// Rows shorter than the header are padded with nulls.
pub fn read_statement(path: &Path) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path).map_err(|e| ReportError::Workbook {
        path: path.display().to_string(),
        detail: e.to_string(),
    })?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ReportError::Workbook {
            path: path.display().to_string(),
            detail: "workbook has no sheets".to_string(),
        })?;

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| ReportError::Workbook {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;

    grid_to_frame(&range)
}

/// Builds a DataFrame from a header-plus-rows cell grid.
pub(crate) fn grid_to_frame(range: &Range<Data>) -> Result<DataFrame> {
    let mut rows = range.rows();
    let header_row = rows.next().unwrap_or(&[]);

    let mut headers: Vec<String> = Vec::with_capacity(header_row.len());
    for (i, cell) in header_row.iter().enumerate() {
        let mut name = cell_text(cell).unwrap_or_else(|| format!("column-{i}"));
        if headers.contains(&name) {
            let mut n = 1;
            while headers.contains(&format!("{name}_{n}")) {
                n += 1;
            }
            name = format!("{name}_{n}");
        }
        headers.push(name);
    }

    let mut values: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for row in rows {
        for (i, column) in values.iter_mut().enumerate() {
            column.push(row.get(i).and_then(cell_text));
        }
    }

    let columns: Vec<Column> = headers
        .into_iter()
        .zip(values)
        .map(|(name, column)| Column::new(name.as_str().into(), column))
        .collect();

    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Empty), None);
        assert_eq!(cell_text(&Data::String("  MWG ".into())), Some("MWG".into()));
        assert_eq!(cell_text(&Data::Float(1.5)), Some("1.5".into()));
        assert_eq!(cell_text(&Data::Int(7)), Some("7".into()));
    }

    #[test]
    fn test_cell_number() {
        assert_eq!(cell_number(&Data::Float(2.5)), Some(2.5));
        assert_eq!(cell_number(&Data::Int(3)), Some(3.0));
        assert_eq!(cell_number(&Data::String("1,234.5".into())), Some(1234.5));
        assert_eq!(cell_number(&Data::String("n/a".into())), None);
        assert_eq!(cell_number(&Data::Empty), None);
    }

    #[test]
    fn test_grid_to_frame_dedupes_headers() {
        let mut range = Range::new((0, 0), (1, 2));
        range.set_value((0, 0), Data::String("A".into()));
        range.set_value((0, 1), Data::String("A".into()));
        range.set_value((0, 2), Data::String("B".into()));
        range.set_value((1, 0), Data::Float(1.0));
        range.set_value((1, 1), Data::Float(2.0));
        range.set_value((1, 2), Data::Float(3.0));

        let df = grid_to_frame(&range).unwrap();
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, ["A", "A_1", "B"]);
        assert_eq!(df.height(), 1);
    }
}
