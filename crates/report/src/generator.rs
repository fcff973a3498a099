//! Best-effort report orchestration.
//!
//! One call to [`ReportGenerator::generate`] runs the whole batch: load and
//! normalize the yearly statements, derive the ratio table, fetch the
//! enrichment data, render charts, ask for commentary, and lay out the PDF.
//! Every external call is awaited to completion before the next starts and
//! is attempted exactly once; failures degrade to placeholder values and the
//! run keeps going. Only configuration-class errors (bad concept map,
//! unreadable statement workbook) abort.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use report_core::error::Result;
use report_core::series::{average_volume, beta_from_series, close_series, percentage_changes};
use report_core::{
    CommentaryProvider, CompanyOverview, ContactInfo, FiscalSpan, ProfileProvider, QuoteProvider,
    ShareSnapshot, Symbol,
};
use report_render::{PdfReport, charts, tables};
use report_statements::marketcap::industry_peers;
use report_statements::normalize::canonical;
use report_statements::ratios::group_format;
use report_statements::{
    ConceptMap, MarketcapBook, RatioEngine, StatementSchema, derive_ratio_table, load_statements,
};

/// Placeholder for enrichment values that could not be fetched.
pub const FALLBACK_TEXT: &str = "Not available.";

/// Height of the half-width price charts on the page, in millimetres.
const PRICE_CHART_HEIGHT: f64 = 60.0;

/// Height of the full-width charts on the page, in millimetres.
const WIDE_CHART_HEIGHT: f64 = 60.0;

/// Everything a report run needs to know.
#[derive(Clone, Debug)]
pub struct ReportConfig {
    /// Security the report covers.
    pub symbol: Symbol,
    /// Fiscal years covered, oldest first.
    pub span: FiscalSpan,
    /// One statement workbook per span year, oldest first.
    pub statement_paths: Vec<PathBuf>,
    /// Market-capitalization workbook, if available.
    pub marketcap_path: Option<PathBuf>,
    /// Sheet of the market-capitalization workbook.
    pub marketcap_sheet: String,
    /// Row label of the subject security in the market-cap sheet.
    pub marketcap_label: Option<String>,
    /// Valuation date shown in the header and used for quote lookups.
    pub target_date: NaiveDate,
    /// Company title shown in the report header.
    pub company_title: String,
    /// Market index symbol for beta estimation.
    pub market_index: Symbol,
    /// Company website page carrying the intro paragraph.
    pub intro_url: Option<String>,
    /// Finance-portal profile page carrying the contact block.
    pub portal_url: Option<String>,
    /// Equality filters (canonical column, value) selecting the peer group
    /// from the most recent statement.
    pub peer_filters: Vec<(String, String)>,
    /// Directory the chart PNGs are written to.
    pub chart_dir: PathBuf,
    /// Output PDF path.
    pub output_pdf: PathBuf,
    /// Output CSV path.
    pub output_csv: PathBuf,
    /// Shares outstanding, as reported (display string).
    pub shares_outstanding: Option<String>,
    /// Financial summary paragraph, if one is supplied with the run.
    pub summary_text: Option<String>,
    /// Statement normalization rules.
    pub schema: StatementSchema,
    /// Concept-to-label map for the ratio engine.
    pub concepts: ConceptMap,
    /// Skip all network enrichment and render placeholders.
    pub offline: bool,
}

impl ReportConfig {
    /// A config with the generator's defaults for everything but the symbol
    /// and statement paths.
    #[must_use]
    pub fn new(symbol: Symbol, statement_paths: Vec<PathBuf>) -> Self {
        let span = FiscalSpan::default();
        let target_date = NaiveDate::from_ymd_opt(span.last(), 12, 31)
            .expect("December 31st exists in every year");
        let company_title = symbol.to_string();

        Self {
            symbol,
            span,
            statement_paths,
            marketcap_path: None,
            marketcap_sheet: "Sheet2".to_string(),
            marketcap_label: None,
            target_date,
            company_title,
            market_index: Symbol::new("VNINDEX"),
            intro_url: None,
            portal_url: None,
            peer_filters: Vec::new(),
            chart_dir: PathBuf::from("chart_image"),
            output_pdf: PathBuf::from("equity_report.pdf"),
            output_csv: PathBuf::from("financial_ratios.csv"),
            shares_outstanding: None,
            summary_text: None,
            schema: StatementSchema::default(),
            concepts: ConceptMap::default(),
            offline: false,
        }
    }
}

/// What a finished run produced.
#[derive(Clone, Debug)]
pub struct ReportSummary {
    /// Path of the written PDF.
    pub pdf_path: PathBuf,
    /// Path of the written ratio CSV.
    pub csv_path: PathBuf,
    /// Fiscal years that contributed a merged row.
    pub merged_years: Vec<i32>,
    /// Labels requested by the concept map but absent from the wide table.
    pub missing_labels: usize,
    /// Enrichment steps that degraded to placeholders.
    pub degraded: Vec<String>,
}

/// Assembles a full report from the pipeline plus optional providers.
#[derive(Debug)]
pub struct ReportGenerator {
    config: ReportConfig,
    quotes: Option<Arc<dyn QuoteProvider>>,
    profile: Option<Arc<dyn ProfileProvider>>,
    commentary: Option<Arc<dyn CommentaryProvider>>,
}

impl ReportGenerator {
    /// Creates a generator with no providers; every enrichment degrades to
    /// its placeholder until providers are attached.
    #[must_use]
    pub fn new(config: ReportConfig) -> Self {
        Self {
            config,
            quotes: None,
            profile: None,
            commentary: None,
        }
    }

    /// Attaches a quote provider.
    #[must_use]
    pub fn with_quotes(mut self, provider: Arc<dyn QuoteProvider>) -> Self {
        self.quotes = Some(provider);
        self
    }

    /// Attaches a profile provider.
    #[must_use]
    pub fn with_profile(mut self, provider: Arc<dyn ProfileProvider>) -> Self {
        self.profile = Some(provider);
        self
    }

    /// Attaches a commentary provider.
    #[must_use]
    pub fn with_commentary(mut self, provider: Arc<dyn CommentaryProvider>) -> Self {
        self.commentary = Some(provider);
        self
    }

    /// Attaches the VCI quote provider.
    #[cfg(feature = "vci")]
    #[must_use]
    pub fn with_vci(self) -> Self {
        self.with_quotes(Arc::new(report_vci::VciProvider::new()))
    }

    /// Attaches the scraped profile provider for the configured URLs.
    ///
    /// Does nothing (with a diagnostic) when the config carries no URLs.
    #[cfg(feature = "profile")]
    #[must_use]
    pub fn with_site_profile(self) -> Self {
        match (&self.config.intro_url, &self.config.portal_url) {
            (Some(intro), Some(portal)) => {
                let provider =
                    report_profile::SiteProfileProvider::new(intro.as_str(), portal.as_str());
                self.with_profile(Arc::new(provider))
            }
            _ => {
                warn!("no profile URLs configured; company profile will be a placeholder");
                self
            }
        }
    }

    /// Attaches the OpenRouter commentary provider.
    #[cfg(feature = "commentary")]
    #[must_use]
    pub fn with_openrouter(self, api_key: impl Into<String>) -> Self {
        self.with_commentary(Arc::new(report_commentary::OpenRouterProvider::new(api_key)))
    }

    fn quotes(&self) -> Option<&Arc<dyn QuoteProvider>> {
        if self.config.offline {
            None
        } else {
            self.quotes.as_ref()
        }
    }

    fn profile(&self) -> Option<&Arc<dyn ProfileProvider>> {
        if self.config.offline {
            None
        } else {
            self.profile.as_ref()
        }
    }

    fn commentary(&self) -> Option<&Arc<dyn CommentaryProvider>> {
        if self.config.offline {
            None
        } else {
            self.commentary.as_ref()
        }
    }

    /// Runs the whole batch and writes the CSV and PDF outputs.
    pub async fn generate(&self) -> Result<ReportSummary> {
        let cfg = &self.config;
        let mut degraded: Vec<String> = Vec::new();

        // Pipeline: fatal on configuration errors, tolerant of schema drift.
        let statements = load_statements(&cfg.statement_paths, &cfg.schema, &cfg.span)?;
        let derived =
            derive_ratio_table(&statements, &cfg.symbol, &cfg.schema, &cfg.concepts, &cfg.span)?;
        derived.table.write_csv(&cfg.output_csv)?;
        info!(path = %cfg.output_csv.display(), "ratio table written");

        if derived.missing_labels > 0 {
            warn!(
                missing = derived.missing_labels,
                "labels requested but not found this run"
            );
        }

        // Chart series are recomputed transiently from the wide table.
        let mut engine = RatioEngine::new(&derived.wide, &cfg.concepts)?;
        let profitability = engine.profitability_series()?;
        let balance = engine.balance_series()?;
        let years = derived.wide.year_labels();

        // Price history: one fetch covers the five-year chart, the six-month
        // slice, the detail block, and beta.
        let history_start =
            NaiveDate::from_ymd_opt(cfg.span.first(), 1, 1).unwrap_or(cfg.target_date);
        let history = match self.quotes() {
            Some(quotes) => note(
                quotes
                    .fetch_history(&cfg.symbol, history_start, cfg.target_date)
                    .await,
                "price history",
                &mut degraded,
            ),
            None => None,
        };
        let closes = history
            .as_ref()
            .and_then(|frame| close_series(frame).ok())
            .unwrap_or_default();

        let close_price = match self.quotes() {
            Some(quotes) => note(
                quotes.close_on(&cfg.symbol, cfg.target_date).await,
                "closing price",
                &mut degraded,
            ),
            None => None,
        };
        let changes = percentage_changes(&closes);
        let five_day_volume = history.as_ref().and_then(|frame| average_volume(frame, 5));

        let beta: Option<f64> = match self.quotes() {
            Some(quotes) => note(
                quotes
                    .fetch_history(&cfg.market_index, history_start, cfg.target_date)
                    .await,
                "index history",
                &mut degraded,
            )
            .and_then(|frame| close_series(&frame).ok())
            .and_then(|market| beta_from_series(&closes, &market)),
            None => None,
        };

        let overview = match self.quotes() {
            Some(quotes) => note(
                quotes.company_overview(&cfg.symbol).await,
                "company overview",
                &mut degraded,
            ),
            None => None,
        }
        .unwrap_or_default();

        let intro = match self.profile() {
            Some(profile) => note(profile.intro().await, "company intro", &mut degraded),
            None => None,
        }
        .unwrap_or_else(|| FALLBACK_TEXT.to_string());

        let contacts = match self.profile() {
            Some(profile) => note(
                profile.contact_info().await,
                "contact info",
                &mut degraded,
            ),
            None => None,
        }
        .unwrap_or_default();

        // Market-cap workbook lookups are local file reads, still best-effort.
        let market_value = match (&cfg.marketcap_path, &cfg.marketcap_label) {
            (Some(path), Some(label)) => {
                let book = MarketcapBook::new(path, cfg.marketcap_sheet.clone());
                note(
                    book.market_value(&cfg.target_date.to_string(), label),
                    "market value",
                    &mut degraded,
                )
            }
            _ => None,
        };

        let peer_values = match &cfg.marketcap_path {
            Some(path) if !cfg.peer_filters.is_empty() => {
                let book = MarketcapBook::new(path, cfg.marketcap_sheet.clone());
                self.peer_market_caps(&book, &statements, &mut degraded)
            }
            _ => Vec::new(),
        };

        // Charts.
        let six_month_start = cfg.target_date - chrono::Duration::days(184);
        let recent: Vec<(NaiveDate, f64)> = closes
            .iter()
            .copied()
            .filter(|(date, _)| *date >= six_month_start)
            .collect();

        let chart_6m = self.render_chart(&mut degraded, "six-month price chart", "price_6m.png", |path| {
            charts::price_chart(&recent, &format!("{} - 6 months", cfg.symbol), path)
        });
        let chart_5y = self.render_chart(&mut degraded, "five-year price chart", "price_5y.png", |path| {
            charts::price_chart(&closes, &format!("{} - 5 years", cfg.symbol), path)
        });
        let chart_balance =
            self.render_chart(&mut degraded, "balance-sheet chart", "balance.png", |path| {
                charts::grouped_bar_chart(&years, &balance, "Assets and liabilities", path)
            });
        let chart_profit =
            self.render_chart(&mut degraded, "profitability chart", "profitability.png", |path| {
                charts::year_series_chart(&years, &profitability, "ROE / ROA / ROS", path)
            });
        let chart_marketcap =
            self.render_chart(&mut degraded, "market-cap chart", "marketcap.png", |path| {
                charts::marketcap_chart(
                    &peer_values,
                    cfg.symbol.as_str(),
                    &format!("Peer market capitalization - {}", cfg.target_date),
                    path,
                )
            });

        // Commentary, one call per rendered chart.
        let balance_commentary = self.describe(chart_balance.as_deref()).await;
        let profit_commentary = self.describe(chart_profit.as_deref()).await;
        let marketcap_commentary = self.describe(chart_marketcap.as_deref()).await;

        let snapshot = ShareSnapshot {
            close: close_price,
            beta,
            five_day_volume,
            currency: "VND".to_string(),
            shares_outstanding: cfg.shares_outstanding.clone(),
            changes,
        };

        // Document assembly.
        let price_text = close_price.map_or_else(|| "N/A".to_string(), group_format);
        let mut pdf = PdfReport::new(&format!("{} Equity Report", cfg.symbol))?;
        pdf.header(&cfg.company_title, &cfg.target_date.to_string(), &price_text);

        pdf.info_columns(
            "General information",
            &general_info_rows(&overview, market_value),
            "Company details",
            &contact_rows(&contacts),
        );

        pdf.space(4.0);
        pdf.section_title("Business summary", 190.0);
        pdf.paragraph(&intro);

        if let (Some(left), Some(right)) = (&chart_6m, &chart_5y) {
            pdf.image_pair("6 months", left, "5 years", right, PRICE_CHART_HEIGHT);
        }

        pdf.space(4.0);
        pdf.detail_tables(
            "Share detail",
            &share_detail_rows(&snapshot),
            "Percentage change",
            &change_rows(&snapshot),
        );

        if let Some(summary) = &cfg.summary_text {
            pdf.section_title("Financial summary", 190.0);
            pdf.paragraph(summary);
        }

        let year_labels = derived.table.years()?;
        pdf.financial_table(
            Some("Balance sheet"),
            &year_labels,
            &derived.table.select(tables::BALANCE_SHEET)?,
        );
        if let Some(chart) = &chart_balance {
            pdf.image(chart, 10.0, 190.0, WIDE_CHART_HEIGHT);
        }
        pdf.section_title("AI analysis", 190.0);
        pdf.paragraph(&balance_commentary);

        pdf.financial_table(
            Some("Income statement"),
            &year_labels,
            &derived.table.select(tables::INCOME_STATEMENT)?,
        );
        pdf.financial_table(
            Some("Profitability"),
            &year_labels,
            &derived.table.select(tables::PROFITABILITY)?,
        );
        if let Some(chart) = &chart_profit {
            pdf.image(chart, 10.0, 190.0, WIDE_CHART_HEIGHT);
        }
        pdf.section_title("AI analysis", 190.0);
        pdf.paragraph(&profit_commentary);

        pdf.new_page();
        pdf.section_title("Market capitalization", 190.0);
        if let Some(chart) = &chart_marketcap {
            pdf.image(chart, 10.0, 190.0, WIDE_CHART_HEIGHT + 20.0);
        } else {
            pdf.paragraph(FALLBACK_TEXT);
        }
        pdf.section_title("AI analysis", 190.0);
        pdf.paragraph(&marketcap_commentary);

        pdf.save(&cfg.output_pdf)?;
        info!(path = %cfg.output_pdf.display(), degraded = degraded.len(), "report written");

        Ok(ReportSummary {
            pdf_path: cfg.output_pdf.clone(),
            csv_path: cfg.output_csv.clone(),
            merged_years: derived.merged_years,
            missing_labels: derived.missing_labels,
            degraded,
        })
    }

    /// Resolves the peer group from the most recent statement and looks up
    /// its market values.
    fn peer_market_caps(
        &self,
        book: &MarketcapBook,
        statements: &[report_statements::YearlyStatement],
        degraded: &mut Vec<String>,
    ) -> Vec<(String, f64)> {
        let cfg = &self.config;
        let Some(latest) = statements.last() else {
            return Vec::new();
        };

        let filters: Vec<(&str, &str)> = cfg
            .peer_filters
            .iter()
            .map(|(column, value)| (column.as_str(), value.as_str()))
            .collect();
        let id_column = canonical(&cfg.schema.identifier_column);

        let peers = note(
            industry_peers(&latest.frame, &filters, &id_column),
            "peer selection",
            degraded,
        )
        .unwrap_or_default();
        if peers.is_empty() {
            return Vec::new();
        }

        note(
            book.peer_values(&peers, &cfg.target_date.to_string()),
            "peer market values",
            degraded,
        )
        .unwrap_or_default()
    }

    /// Renders one chart into the chart directory, best-effort.
    fn render_chart(
        &self,
        degraded: &mut Vec<String>,
        what: &str,
        file_name: &str,
        render: impl FnOnce(&Path) -> Result<()>,
    ) -> Option<PathBuf> {
        let path = self.config.chart_dir.join(file_name);
        note(render(&path).map(|()| path), what, degraded)
    }

    /// Commentary for a chart, or the diagnostic placeholder.
    async fn describe(&self, chart: Option<&Path>) -> String {
        let Some(chart) = chart else {
            return FALLBACK_TEXT.to_string();
        };
        match self.commentary() {
            Some(provider) => provider
                .describe_chart(chart)
                .await
                .unwrap_or_else(|e| format!("Commentary unavailable: {e}")),
            None => FALLBACK_TEXT.to_string(),
        }
    }
}

/// Records a degraded enrichment step and converts the error to `None`.
fn note<T>(result: Result<T>, what: &str, degraded: &mut Vec<String>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(step = what, error = %e, "enrichment unavailable; continuing");
            degraded.push(what.to_string());
            None
        }
    }
}

fn general_info_rows(
    overview: &CompanyOverview,
    market_value: Option<f64>,
) -> Vec<(String, String)> {
    let text = |value: &Option<String>| {
        value
            .clone()
            .unwrap_or_else(|| FALLBACK_TEXT.to_string())
    };
    vec![
        ("Exchange".to_string(), text(&overview.exchange)),
        ("Industry".to_string(), text(&overview.industry)),
        (
            "Employees".to_string(),
            overview
                .employees
                .map_or_else(|| FALLBACK_TEXT.to_string(), |n| n.to_string()),
        ),
        (
            "Market cap".to_string(),
            market_value.map_or_else(|| "N/A".to_string(), |v| format!("{}B", group_format(v))),
        ),
    ]
}

fn contact_rows(contacts: &ContactInfo) -> Vec<(String, String)> {
    let text = |value: &Option<String>| {
        value
            .clone()
            .unwrap_or_else(|| FALLBACK_TEXT.to_string())
    };
    vec![
        ("Address".to_string(), text(&contacts.address)),
        ("Phone".to_string(), text(&contacts.phone)),
        ("Website".to_string(), text(&contacts.website)),
    ]
}

fn share_detail_rows(snapshot: &ShareSnapshot) -> Vec<(String, String)> {
    vec![
        (
            "Close".to_string(),
            snapshot.close.map_or_else(|| "N/A".to_string(), group_format),
        ),
        (
            "Beta".to_string(),
            snapshot
                .beta
                .map_or_else(|| "N/A".to_string(), |b| format!("{b:.3}")),
        ),
        ("Currency".to_string(), snapshot.currency.clone()),
        (
            "5-day avg volume".to_string(),
            snapshot
                .five_day_volume
                .map_or_else(|| "N/A".to_string(), group_format),
        ),
        (
            "Shares outstanding".to_string(),
            snapshot
                .shares_outstanding
                .clone()
                .unwrap_or_else(|| "N/A".to_string()),
        ),
    ]
}

fn change_rows(snapshot: &ShareSnapshot) -> Vec<(String, String)> {
    snapshot
        .changes
        .rows()
        .into_iter()
        .map(|(label, value)| {
            (
                label.to_string(),
                value.map_or_else(|| "N/A".to_string(), |v| format!("{v:.2}%")),
            )
        })
        .collect()
}
