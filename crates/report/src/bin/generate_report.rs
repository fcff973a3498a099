//! Command-line entry point: one batch run, one report.

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use report::{ConceptMap, ReportConfig, ReportGenerator, Symbol};

#[derive(Parser, Debug)]
#[command(
    name = "generate-report",
    version,
    about = "Generate an equity report from yearly statement workbooks"
)]
struct Args {
    /// Security identifier to report on
    #[arg(long, default_value = "MWG")]
    symbol: String,

    /// Directory holding the statement workbooks
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Statement workbook paths, oldest year first; defaults to
    /// <data-dir>/<year>-Vietnam.xlsx per span year
    #[arg(long, num_args = 1..)]
    statements: Vec<PathBuf>,

    /// First fiscal year of the span
    #[arg(long, default_value_t = 2020)]
    first_year: i32,

    /// Last fiscal year of the span
    #[arg(long, default_value_t = 2024)]
    last_year: i32,

    /// Market-capitalization workbook path
    #[arg(long)]
    marketcap: Option<PathBuf>,

    /// Row label of the security in the market-cap sheet
    #[arg(long)]
    marketcap_label: Option<String>,

    /// Valuation date (defaults to Dec 31 of the last span year)
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Company title shown in the report header
    #[arg(long)]
    title: Option<String>,

    /// Concept map JSON file (defaults to the built-in map)
    #[arg(long)]
    concepts: Option<PathBuf>,

    /// Company website page carrying the intro paragraph
    #[arg(long)]
    intro_url: Option<String>,

    /// Finance-portal profile page carrying the contact block
    #[arg(long)]
    portal_url: Option<String>,

    /// Shares outstanding, as reported (display string)
    #[arg(long)]
    shares_outstanding: Option<String>,

    /// Financial summary paragraph to include in the report
    #[arg(long)]
    summary: Option<String>,

    /// Output PDF path
    #[arg(long, default_value = "equity_report.pdf")]
    pdf: PathBuf,

    /// Output CSV path
    #[arg(long, default_value = "financial_ratios.csv")]
    csv: PathBuf,

    /// Directory for generated chart images
    #[arg(long, default_value = "chart_image")]
    chart_dir: PathBuf,

    /// Skip network enrichment and render placeholders
    #[arg(long)]
    offline: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let span = report::FiscalSpan::new(args.first_year, args.last_year);
    let statement_paths: Vec<PathBuf> = if args.statements.is_empty() {
        span.years()
            .map(|year| args.data_dir.join(format!("{year}-Vietnam.xlsx")))
            .collect()
    } else {
        args.statements
    };

    let mut config = ReportConfig::new(Symbol::new(args.symbol.as_str()), statement_paths);
    config.span = span;
    config.marketcap_path = args.marketcap;
    config.marketcap_label = args.marketcap_label;
    config.intro_url = args.intro_url;
    config.portal_url = args.portal_url;
    config.shares_outstanding = args.shares_outstanding;
    config.summary_text = args.summary;
    config.output_pdf = args.pdf;
    config.output_csv = args.csv;
    config.chart_dir = args.chart_dir;
    config.offline = args.offline;
    if let Some(date) = args.date {
        config.target_date = date;
    } else {
        config.target_date = match NaiveDate::from_ymd_opt(span.last(), 12, 31) {
            Some(date) => date,
            None => config.target_date,
        };
    }
    if let Some(title) = args.title {
        config.company_title = title;
    }

    if let Some(path) = &args.concepts {
        match std::fs::read_to_string(path) {
            Ok(json) => match ConceptMap::from_json(&json) {
                Ok(map) => config.concepts = map,
                Err(e) => {
                    error!(path = %path.display(), error = %e, "concept map rejected");
                    return ExitCode::FAILURE;
                }
            },
            Err(e) => {
                error!(path = %path.display(), error = %e, "concept map unreadable");
                return ExitCode::FAILURE;
            }
        }
    }

    let mut generator = ReportGenerator::new(config);
    #[cfg(feature = "vci")]
    {
        generator = generator.with_vci();
    }
    #[cfg(feature = "profile")]
    {
        generator = generator.with_site_profile();
    }
    #[cfg(feature = "commentary")]
    {
        match std::env::var("OPENROUTER_API_KEY") {
            Ok(key) if !key.is_empty() => generator = generator.with_openrouter(key),
            _ => warn!("OPENROUTER_API_KEY not set; chart commentary will be a placeholder"),
        }
    }

    match generator.generate().await {
        Ok(summary) => {
            info!(
                pdf = %summary.pdf_path.display(),
                csv = %summary.csv_path.display(),
                merged_years = ?summary.merged_years,
                missing_labels = summary.missing_labels,
                degraded = ?summary.degraded,
                "report complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "report generation failed");
            ExitCode::FAILURE
        }
    }
}
