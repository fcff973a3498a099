#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/equity-report/equity-report/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! VCI (Vietcap) quote data provider.
//!
//! This crate implements [`QuoteProvider`] against the VCI public chart API:
//!
//! - Daily OHLCV history via the gap-chart endpoint
//! - Close-on-date lookups
//! - Company overview reference data
//! - Built-in rate limiting (1 request per second by default)
//!
//! # Example
//!
//! ```no_run
//! use report_vci::VciProvider;
//! use report_core::{QuoteProvider, Symbol};
//! use chrono::NaiveDate;
//!
//! # async fn example() -> report_core::Result<()> {
//! let provider = VciProvider::new();
//! let symbol = Symbol::new("MWG");
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
//!
//! let df = provider.fetch_history(&symbol, start, end).await?;
//! println!("Fetched {} rows", df.height());
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::debug;

use report_core::error::{ReportError, Result};
use report_core::series::{beta_from_series, close_series};
use report_core::{CompanyOverview, Provider, QuoteProvider, Symbol};

/// VCI chart API endpoint.
const CHART_API_URL: &str = "https://trading.vietcap.com.vn/api/chart/OHLCChart/gap-chart";

/// VCI company overview endpoint.
const OVERVIEW_API_URL: &str = "https://trading.vietcap.com.vn/api/company/overview";

/// Default rate limit delay in milliseconds.
const DEFAULT_RATE_LIMIT_MS: u64 = 1000;

/// User agent for HTTP requests.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// VCI quote data provider.
///
/// Implements [`QuoteProvider`].
#[derive(Debug)]
pub struct VciProvider {
    client: reqwest::Client,
    rate_limit_ms: u64,
    last_request_time: AtomicU64,
}

impl VciProvider {
    /// Create a new VCI provider with default settings.
    ///
    /// Uses built-in rate limiting of 1 request per second.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rate_limit(Duration::from_millis(DEFAULT_RATE_LIMIT_MS))
    }

    /// Create a new VCI provider with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            rate_limit_ms: DEFAULT_RATE_LIMIT_MS,
            last_request_time: AtomicU64::new(0),
        }
    }

    /// Create a new VCI provider with custom rate limiting.
    #[must_use]
    pub fn with_rate_limit(rate_limit: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            rate_limit_ms: rate_limit.as_millis() as u64,
            last_request_time: AtomicU64::new(0),
        }
    }

    /// Apply rate limiting before making a request.
    async fn apply_rate_limit(&self) {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        let last = self.last_request_time.load(Ordering::Relaxed);
        let elapsed = now.saturating_sub(last);

        if elapsed < self.rate_limit_ms {
            let wait_time = self.rate_limit_ms - elapsed;
            debug!("Rate limiting: waiting {}ms", wait_time);
            sleep(Duration::from_millis(wait_time)).await;
        }

        self.last_request_time.store(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
            Ordering::Relaxed,
        );
    }

    /// Build the chart request payload for a symbol and date range.
    fn chart_payload(symbol: &Symbol, start: NaiveDate, end: NaiveDate) -> serde_json::Value {
        let from = start
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(0);
        let to = end
            .and_hms_opt(23, 59, 59)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(0);

        serde_json::json!({
            "timeFrame": "ONE_DAY",
            "symbols": [symbol.as_str()],
            "from": from,
            "to": to,
        })
    }

    /// Parse a chart response into a DataFrame.
    fn parse_chart_response(symbol: &Symbol, series: Vec<ChartSeries>) -> Result<DataFrame> {
        let series = series
            .into_iter()
            .find(|s| s.symbol.eq_ignore_ascii_case(symbol.as_str()))
            .ok_or_else(|| ReportError::NotFound(format!("no history for {symbol}")))?;

        if series.timestamps.is_empty() {
            return Err(ReportError::NotFound(format!("no history for {symbol}")));
        }

        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        let dates: Vec<i32> = series
            .timestamps
            .iter()
            .map(|&ts| {
                chrono::DateTime::from_timestamp(ts, 0)
                    .map(|dt| dt.date_naive())
                    .unwrap_or(epoch)
            })
            .map(|d| (d - epoch).num_days() as i32)
            .collect();

        let date_col = Column::new("date".into(), dates).cast(&DataType::Date)?;

        let df = DataFrame::new(vec![
            date_col,
            Column::new("open".into(), series.open),
            Column::new("high".into(), series.high),
            Column::new("low".into(), series.low),
            Column::new("close".into(), series.close),
            Column::new("volume".into(), series.volume),
        ])?;

        Ok(df)
    }

    /// Beta of `symbol` versus `market_symbol` over a date range.
    ///
    /// Computed as the covariance of daily simple returns over the market's
    /// return variance. `Ok(None)` when the two series are too short to
    /// align.
    pub async fn beta(
        &self,
        symbol: &Symbol,
        market_symbol: &Symbol,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<f64>> {
        let stock = self.fetch_history(symbol, start, end).await?;
        let market = self.fetch_history(market_symbol, start, end).await?;

        let stock = close_series(&stock)?;
        let market = close_series(&market)?;
        Ok(beta_from_series(&stock, &market))
    }
}

impl Default for VciProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for VciProvider {
    fn name(&self) -> &str {
        "VCI"
    }

    fn description(&self) -> &str {
        "VCI (Vietcap) quote provider for price history and company overviews"
    }
}

#[async_trait]
impl QuoteProvider for VciProvider {
    async fn fetch_history(
        &self,
        symbol: &Symbol,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DataFrame> {
        if start > end {
            return Err(ReportError::Parse(format!(
                "start date {start} is after end date {end}"
            )));
        }

        self.apply_rate_limit().await;

        let payload = Self::chart_payload(symbol, start, end);
        debug!(symbol = %symbol, %start, %end, "Fetching OHLCV history");

        let response = self
            .client
            .post(CHART_API_URL)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ReportError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ReportError::NotFound(symbol.to_string()));
        }

        if !response.status().is_success() {
            return Err(ReportError::Network(format!(
                "HTTP {} for {}",
                response.status(),
                symbol
            )));
        }

        let series: Vec<ChartSeries> = response
            .json()
            .await
            .map_err(|e| ReportError::Parse(e.to_string()))?;

        Self::parse_chart_response(symbol, series)
    }

    async fn close_on(&self, symbol: &Symbol, date: NaiveDate) -> Result<f64> {
        let history = self.fetch_history(symbol, date, date).await?;
        let closes = close_series(&history)?;
        closes
            .iter()
            .find(|(d, _)| *d == date)
            .map(|(_, close)| *close)
            .or_else(|| closes.first().map(|(_, close)| *close))
            .ok_or_else(|| ReportError::NotFound(format!("no close for {symbol} on {date}")))
    }

    async fn company_overview(&self, symbol: &Symbol) -> Result<CompanyOverview> {
        self.apply_rate_limit().await;

        let url = format!("{OVERVIEW_API_URL}?symbol={}", symbol.as_str());
        debug!(symbol = %symbol, "Fetching company overview");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ReportError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ReportError::NotFound(symbol.to_string()));
        }

        if !response.status().is_success() {
            return Err(ReportError::Network(format!(
                "HTTP {} for {}",
                response.status(),
                symbol
            )));
        }

        let overview: OverviewResponse = response
            .json()
            .await
            .map_err(|e| ReportError::Parse(e.to_string()))?;

        Ok(CompanyOverview {
            exchange: overview.exchange,
            industry: overview.industry,
            employees: overview.no_employees,
        })
    }
}

// ============================================================================
// VCI API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChartSeries {
    symbol: String,
    #[serde(rename = "t")]
    timestamps: Vec<i64>,
    #[serde(rename = "o")]
    open: Vec<Option<f64>>,
    #[serde(rename = "h")]
    high: Vec<Option<f64>>,
    #[serde(rename = "l")]
    low: Vec<Option<f64>>,
    #[serde(rename = "c")]
    close: Vec<Option<f64>>,
    #[serde(rename = "v")]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OverviewResponse {
    exchange: Option<String>,
    industry: Option<String>,
    no_employees: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_chart_payload() {
        let payload = VciProvider::chart_payload(
            &Symbol::new("MWG"),
            date(2024, 1, 1),
            date(2024, 12, 31),
        );
        assert_eq!(payload["timeFrame"], "ONE_DAY");
        assert_eq!(payload["symbols"][0], "MWG");
        assert!(payload["from"].as_i64().unwrap() < payload["to"].as_i64().unwrap());
    }

    #[test]
    fn test_provider_info() {
        let provider = VciProvider::new();
        assert_eq!(provider.name(), "VCI");
        assert!(!provider.description().is_empty());
    }

    #[test]
    fn test_default() {
        let provider = VciProvider::default();
        assert_eq!(provider.name(), "VCI");
    }

    #[test]
    fn test_parse_chart_response() {
        let series = vec![ChartSeries {
            symbol: "MWG".to_string(),
            timestamps: vec![1_704_067_200, 1_704_153_600],
            open: vec![Some(1.0), Some(2.0)],
            high: vec![Some(1.5), Some(2.5)],
            low: vec![Some(0.5), Some(1.5)],
            close: vec![Some(1.2), Some(2.2)],
            volume: vec![Some(100), None],
        }];
        let df = VciProvider::parse_chart_response(&Symbol::new("MWG"), series).unwrap();
        assert_eq!(df.height(), 2);

        let closes = close_series(&df).unwrap();
        assert_eq!(closes[0], (date(2024, 1, 1), 1.2));
        assert_eq!(closes[1], (date(2024, 1, 2), 2.2));
    }

    #[test]
    fn test_parse_chart_response_missing_symbol() {
        let err =
            VciProvider::parse_chart_response(&Symbol::new("MWG"), Vec::new()).unwrap_err();
        assert!(matches!(err, ReportError::NotFound(_)));
    }

    #[test]
    fn test_response_deserialization() {
        let body = r#"[{"symbol":"MWG","t":[1704067200],"o":[1.0],"h":[1.5],"l":[0.5],"c":[1.2],"v":[100]}]"#;
        let series: Vec<ChartSeries> = serde_json::from_str(body).unwrap();
        assert_eq!(series[0].close, [Some(1.2)]);
    }
}
