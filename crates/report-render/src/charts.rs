//! Chart image generation.
//!
//! All charts render to PNG files on a local path; the PDF layer embeds the
//! files afterwards and the commentary provider reads them back. Sizes are
//! fixed per chart kind to match the slots in the page layout.

use chrono::NaiveDate;
use plotters::prelude::*;
use std::path::Path;

use report_core::error::{ReportError, Result};

/// Pixel size of the half-width price charts.
const PRICE_CHART_SIZE: (u32, u32) = (900, 600);

/// Pixel size of the full-width series and bar charts.
const WIDE_CHART_SIZE: (u32, u32) = (1500, 600);

/// Series palette shared by the multi-series charts.
const SERIES_COLORS: [RGBColor; 5] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
];

fn render_error(e: impl std::fmt::Display) -> ReportError {
    ReportError::Render(e.to_string())
}

fn prepare_path(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn value_bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if min > max {
        return None;
    }
    if min == max {
        // Flat series still needs a drawable y range.
        min -= 1.0;
        max += 1.0;
    }
    let pad = (max - min) * 0.05;
    Some((min - pad, max + pad))
}

/// Renders a closing-price line chart over a date range.
pub fn price_chart(closes: &[(NaiveDate, f64)], title: &str, path: &Path) -> Result<()> {
    if closes.is_empty() {
        return Err(ReportError::Render(format!("no price data for {title}")));
    }
    prepare_path(path)?;

    let (start, end) = (closes[0].0, closes[closes.len() - 1].0);
    let (y_min, y_max) = value_bounds(closes.iter().map(|(_, v)| *v))
        .ok_or_else(|| ReportError::Render(format!("no price data for {title}")))?;

    let root = BitMapBackend::new(path, PRICE_CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(render_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(12)
        .x_label_area_size(42)
        .y_label_area_size(64)
        .build_cartesian_2d(start..end, y_min..y_max)
        .map_err(render_error)?;

    chart
        .configure_mesh()
        .x_label_formatter(&|date| date.format("%m/%Y").to_string())
        .y_label_formatter(&|v| format!("{v:.3}"))
        .draw()
        .map_err(render_error)?;

    chart
        .draw_series(LineSeries::new(
            closes.iter().copied(),
            SERIES_COLORS[0].stroke_width(2),
        ))
        .map_err(render_error)?;

    root.present().map_err(render_error)?;
    Ok(())
}

/// Renders one line per named series across the span's year labels.
pub fn year_series_chart(
    years: &[String],
    series: &[(String, Vec<f64>)],
    title: &str,
    path: &Path,
) -> Result<()> {
    if years.is_empty() || series.is_empty() {
        return Err(ReportError::Render(format!("no series data for {title}")));
    }
    prepare_path(path)?;

    let (y_min, y_max) = value_bounds(series.iter().flat_map(|(_, v)| v.iter().copied()))
        .ok_or_else(|| ReportError::Render(format!("no series data for {title}")))?;

    let root = BitMapBackend::new(path, WIDE_CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(render_error)?;

    let x_max = (years.len() - 1) as f64;
    let labels = years.to_vec();

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(12)
        .x_label_area_size(42)
        .y_label_area_size(64)
        .build_cartesian_2d(-0.25..x_max + 0.25, y_min..y_max)
        .map_err(render_error)?;

    chart
        .configure_mesh()
        .x_labels(years.len())
        .x_label_formatter(&move |x| {
            let idx = x.round() as usize;
            labels.get(idx).cloned().unwrap_or_default()
        })
        .y_label_formatter(&|v| format!("{v:.2}"))
        .draw()
        .map_err(render_error)?;

    for (i, (name, values)) in series.iter().enumerate() {
        let color = SERIES_COLORS[i % SERIES_COLORS.len()];
        chart
            .draw_series(LineSeries::new(
                values.iter().enumerate().map(|(x, v)| (x as f64, *v)),
                color.stroke_width(3),
            ))
            .map_err(render_error)?
            .label(name.clone())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(3))
            });
    }

    chart
        .configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .draw()
        .map_err(render_error)?;

    root.present().map_err(render_error)?;
    Ok(())
}

/// Renders grouped vertical bars, one group per year label.
pub fn grouped_bar_chart(
    years: &[String],
    series: &[(String, Vec<f64>)],
    title: &str,
    path: &Path,
) -> Result<()> {
    if years.is_empty() || series.is_empty() {
        return Err(ReportError::Render(format!("no bar data for {title}")));
    }
    prepare_path(path)?;

    let (y_min, y_max) = value_bounds(
        series
            .iter()
            .flat_map(|(_, v)| v.iter().copied())
            .chain(std::iter::once(0.0)),
    )
    .ok_or_else(|| ReportError::Render(format!("no bar data for {title}")))?;

    let root = BitMapBackend::new(path, WIDE_CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(render_error)?;

    let x_max = years.len() as f64;
    let labels = years.to_vec();

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(12)
        .x_label_area_size(42)
        .y_label_area_size(80)
        .build_cartesian_2d(0.0..x_max, y_min..y_max)
        .map_err(render_error)?;

    chart
        .configure_mesh()
        .x_labels(years.len())
        .x_label_formatter(&move |x| {
            let idx = x.floor() as usize;
            labels.get(idx).cloned().unwrap_or_default()
        })
        .y_label_formatter(&|v| format!("{v:.0}"))
        .draw()
        .map_err(render_error)?;

    let group_width = 0.8;
    let bar_width = group_width / series.len() as f64;

    for (i, (name, values)) in series.iter().enumerate() {
        let color = SERIES_COLORS[i % SERIES_COLORS.len()];
        let offset = i as f64 * bar_width;
        chart
            .draw_series(values.iter().enumerate().map(|(x, v)| {
                let x0 = x as f64 + 0.1 + offset;
                Rectangle::new([(x0, 0.0), (x0 + bar_width * 0.9, *v)], color.filled())
            }))
            .map_err(render_error)?
            .label(name.clone())
            .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 12, y + 6)], color.filled()));
    }

    chart
        .configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .draw()
        .map_err(render_error)?;

    root.present().map_err(render_error)?;
    Ok(())
}

/// Renders the peer market-cap scatter with the subject security
/// highlighted. Point area tracks the market value; peer labels are
/// suppressed like the source chart.
pub fn marketcap_chart(
    values: &[(String, f64)],
    highlight: &str,
    title: &str,
    path: &Path,
) -> Result<()> {
    if values.is_empty() {
        return Err(ReportError::Render(format!("no market-cap data for {title}")));
    }
    prepare_path(path)?;

    let max_value = values
        .iter()
        .map(|(_, v)| *v)
        .fold(f64::NEG_INFINITY, f64::max)
        .max(1.0);
    let (y_min, y_max) = value_bounds(values.iter().map(|(_, v)| *v))
        .ok_or_else(|| ReportError::Render(format!("no market-cap data for {title}")))?;

    let root = BitMapBackend::new(path, WIDE_CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(render_error)?;

    let x_max = values.len() as f64;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(12)
        .x_label_area_size(24)
        .y_label_area_size(80)
        .build_cartesian_2d(-1.0..x_max, y_min.min(0.0)..y_max)
        .map_err(render_error)?;

    chart
        .configure_mesh()
        .x_labels(0)
        .y_label_formatter(&|v| format!("{v:.0}"))
        .draw()
        .map_err(render_error)?;

    let radius = |value: f64| 4 + ((value / max_value) * 26.0) as i32;

    chart
        .draw_series(
            values
                .iter()
                .enumerate()
                .filter(|(_, (ticker, _))| ticker != highlight)
                .map(|(i, (_, value))| {
                    Circle::new(
                        (i as f64, *value),
                        radius(*value),
                        SERIES_COLORS[0].mix(0.6).filled(),
                    )
                }),
        )
        .map_err(render_error)?;

    chart
        .draw_series(
            values
                .iter()
                .enumerate()
                .filter(|(_, (ticker, _))| ticker == highlight)
                .map(|(i, (_, value))| {
                    Circle::new(
                        (i as f64, *value),
                        radius(*value),
                        SERIES_COLORS[1].mix(0.9).filled(),
                    )
                }),
        )
        .map_err(render_error)?;

    root.present().map_err(render_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_price_chart_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("charts").join("price.png");

        let closes: Vec<(NaiveDate, f64)> = (0..180)
            .map(|i| {
                (
                    date(2024, 7, 1) + chrono::Duration::days(i),
                    50.0 + (i % 11) as f64,
                )
            })
            .collect();
        price_chart(&closes, "MWG - 6 months", &path).unwrap();
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_price_chart_empty_is_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("price.png");
        let err = price_chart(&[], "empty", &path).unwrap_err();
        assert!(matches!(err, ReportError::Render(_)));
    }

    #[test]
    fn test_year_series_chart_flat_series() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ratios.png");
        let years: Vec<String> = (2020..=2024).map(|y| y.to_string()).collect();
        let series = vec![
            ("ROE".to_string(), vec![10.0; 5]),
            ("ROA".to_string(), vec![10.0; 5]),
        ];
        year_series_chart(&years, &series, "Profitability", &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_grouped_bar_chart_with_negatives() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("balance.png");
        let years: Vec<String> = (2020..=2022).map(|y| y.to_string()).collect();
        let series = vec![
            ("Assets".to_string(), vec![100.0, 120.0, 90.0]),
            ("Liabilities".to_string(), vec![60.0, 70.0, -5.0]),
        ];
        grouped_bar_chart(&years, &series, "Balance Sheet", &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_marketcap_chart_highlight() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("marketcap.png");
        let values = vec![
            ("MWG".to_string(), 900.0),
            ("PNJ".to_string(), 300.0),
            ("FRT".to_string(), 150.0),
        ];
        marketcap_chart(&values, "MWG", "Retail market cap", &path).unwrap();
        assert!(path.exists());
    }
}
