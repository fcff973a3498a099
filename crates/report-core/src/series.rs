//! Price-series math over history frames.
//!
//! Helpers shared by the quote providers and the report orchestrator:
//! close-series extraction, trailing percentage changes, average volume, and
//! beta estimation from daily simple returns.

use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::HashMap;
use tracing::warn;

use crate::error::Result;
use crate::types::PriceChanges;

/// Calendar-day lookback windows for the trailing percentage changes, in
/// the order of [`PriceChanges`]' fields.
const CHANGE_WINDOWS: [i64; 6] = [1, 4, 91, 211, 29, 364];

/// Extracts `(date, close)` pairs from a history frame, oldest first,
/// skipping null closes.
pub fn close_series(history: &DataFrame) -> Result<Vec<(NaiveDate, f64)>> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();

    let dates = history.column("date")?.cast(&DataType::Int32)?;
    let dates = dates.i32()?;
    let closes = history.column("close")?.f64()?.clone();

    let mut out = Vec::with_capacity(history.height());
    for (days, close) in dates.into_iter().zip(&closes) {
        if let (Some(days), Some(close)) = (days, close) {
            out.push((epoch + chrono::Duration::days(i64::from(days)), close));
        }
    }
    Ok(out)
}

/// Average of the last `sessions` volume values in a history frame.
#[must_use]
pub fn average_volume(history: &DataFrame, sessions: usize) -> Option<f64> {
    let volumes = history
        .column("volume")
        .ok()?
        .cast(&DataType::Float64)
        .ok()?;
    let volumes = volumes.f64().ok()?;
    let values: Vec<f64> = volumes.into_iter().flatten().collect();
    if values.is_empty() {
        return None;
    }
    let tail = &values[values.len().saturating_sub(sessions)..];
    Some(tail.iter().sum::<f64>() / tail.len() as f64)
}

/// Trailing percentage changes of the most recent close over the report's
/// fixed calendar-day windows.
///
/// A window whose lookback date precedes all data yields `None` for that
/// entry; an empty series yields all-`None`.
#[must_use]
pub fn percentage_changes(closes: &[(NaiveDate, f64)]) -> PriceChanges {
    let Some(&(last_date, last_close)) = closes.last() else {
        return PriceChanges::default();
    };

    let change_over = |days: i64| -> Option<f64> {
        let target = last_date - chrono::Duration::days(days);
        let past_close = closes
            .iter()
            .rev()
            .find(|(date, _)| *date <= target)
            .map(|(_, close)| *close)?;
        if past_close == 0.0 {
            return None;
        }
        Some((((last_close - past_close) / past_close) * 100.0 * 100.0).round() / 100.0)
    };

    let [day_1, day_5, month_3, month_6, month_to_date, year_to_date] =
        CHANGE_WINDOWS.map(change_over);

    PriceChanges {
        day_1,
        day_5,
        month_3,
        month_6,
        month_to_date,
        year_to_date,
    }
}

/// Beta from two `(date, close)` series: covariance of date-aligned daily
/// simple returns over the market's return variance.
#[must_use]
pub fn beta_from_series(stock: &[(NaiveDate, f64)], market: &[(NaiveDate, f64)]) -> Option<f64> {
    let stock_returns = daily_returns(stock);
    let market_returns: HashMap<NaiveDate, f64> = daily_returns(market).into_iter().collect();

    let paired: Vec<(f64, f64)> = stock_returns
        .into_iter()
        .filter_map(|(date, r)| market_returns.get(&date).map(|m| (r, *m)))
        .collect();

    if paired.len() < 2 {
        warn!("not enough overlapping returns to estimate beta");
        return None;
    }

    let n = paired.len() as f64;
    let mean_s = paired.iter().map(|(s, _)| s).sum::<f64>() / n;
    let mean_m = paired.iter().map(|(_, m)| m).sum::<f64>() / n;

    let covariance = paired
        .iter()
        .map(|(s, m)| (s - mean_s) * (m - mean_m))
        .sum::<f64>()
        / (n - 1.0);
    let variance = paired
        .iter()
        .map(|(_, m)| (m - mean_m).powi(2))
        .sum::<f64>()
        / (n - 1.0);

    if variance == 0.0 {
        return None;
    }
    Some(covariance / variance)
}

/// Daily simple returns of a close series, keyed by the later date.
fn daily_returns(closes: &[(NaiveDate, f64)]) -> Vec<(NaiveDate, f64)> {
    closes
        .windows(2)
        .filter_map(|pair| {
            let (_, previous) = pair[0];
            let (date, current) = pair[1];
            (previous != 0.0).then(|| (date, (current - previous) / previous))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_percentage_changes() {
        // 10 -> 11 over one day: +10%; flat further back.
        let closes: Vec<(NaiveDate, f64)> = (0..400)
            .map(|i| {
                let close = if i == 399 { 11.0 } else { 10.0 };
                (date(2023, 12, 1) + chrono::Duration::days(i), close)
            })
            .collect();

        let changes = percentage_changes(&closes);
        assert_eq!(changes.day_1, Some(10.0));
        assert_eq!(changes.day_5, Some(10.0));
        assert_eq!(changes.year_to_date, Some(10.0));
    }

    #[test]
    fn test_percentage_changes_short_series() {
        let closes = vec![(date(2024, 12, 31), 10.0)];
        let changes = percentage_changes(&closes);
        assert_eq!(changes.day_1, None);
        assert_eq!(changes.year_to_date, None);

        assert_eq!(percentage_changes(&[]), PriceChanges::default());
    }

    #[test]
    fn test_beta_of_identical_series_is_one() {
        let closes: Vec<(NaiveDate, f64)> = (0..30)
            .map(|i| {
                (
                    date(2024, 1, 1) + chrono::Duration::days(i),
                    100.0 + (i % 7) as f64,
                )
            })
            .collect();
        let beta = beta_from_series(&closes, &closes).unwrap();
        assert!((beta - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_beta_needs_overlap() {
        let a = vec![(date(2024, 1, 1), 1.0), (date(2024, 1, 2), 2.0)];
        let b = vec![(date(2024, 6, 1), 1.0), (date(2024, 6, 2), 2.0)];
        assert_eq!(beta_from_series(&a, &b), None);
    }

    #[test]
    fn test_close_series_and_average_volume() {
        let epoch = date(1970, 1, 1);
        let days: Vec<i32> = vec![
            (date(2024, 1, 1) - epoch).num_days() as i32,
            (date(2024, 1, 2) - epoch).num_days() as i32,
        ];
        let df = DataFrame::new(vec![
            Column::new("date".into(), days)
                .cast(&DataType::Date)
                .unwrap(),
            Column::new("close".into(), [Some(1.5), None]),
            Column::new("volume".into(), [10.0, 30.0]),
        ])
        .unwrap();

        let closes = close_series(&df).unwrap();
        assert_eq!(closes, [(date(2024, 1, 1), 1.5)]);
        assert_eq!(average_volume(&df, 2), Some(20.0));
    }
}
