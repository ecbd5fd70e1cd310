use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use comfy_table::Table;
use configuration::BacktestSettings;
use core_types::{AllocationMode, AllocationScheme};
use engine::{BacktestEngine, BacktestReport, BacktestRequest};
use inflation::StatBureauClient;
use market_data::YahooChartClient;
use std::path::PathBuf;

/// The main entry point for the Meridian backtesting application.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Parse command-line arguments
    let cli = Cli::parse();

    // Execute the appropriate command
    let result = match cli.command {
        Commands::Run(args) => handle_run(args).await,
        Commands::ShowConfig(args) => handle_show_config(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Compare a portfolio's historical performance against a baseline asset.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a backtest over a historical date range.
    Run(RunArgs),
    /// Print a saved backtest configuration.
    ShowConfig(ShowConfigArgs),
}

#[derive(Parser)]
struct RunArgs {
    /// Comma-separated stock tickers (e.g. "AAPL,MSFT").
    #[arg(long)]
    stocks: Option<String>,

    /// Comma-separated allocations, one per ticker (e.g. "60,40").
    #[arg(long)]
    allocations: Option<String>,

    /// How the allocations are interpreted: "percentage" or "dollar".
    #[arg(long, default_value_t = AllocationMode::Percentage)]
    allocation_type: AllocationMode,

    /// Baseline ticker to compare the portfolio against (e.g. "SPY").
    #[arg(long)]
    baseline: Option<String>,

    /// Start of the backtest range (format: YYYY-MM-DD).
    #[arg(long)]
    from: Option<NaiveDate>,

    /// End of the backtest range (format: YYYY-MM-DD).
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Deflate the result series by historical inflation.
    #[arg(long)]
    inflation_adjusted: bool,

    /// Country whose inflation series is used for the adjustment.
    #[arg(long, default_value = "united-states")]
    country: String,

    /// Load stocks, allocations, baseline and dates from a saved
    /// configuration file instead of the individual flags.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Save the effective configuration to this file before running.
    #[arg(long)]
    save_config: Option<PathBuf>,
}

#[derive(Parser)]
struct ShowConfigArgs {
    /// Path of the configuration file to print.
    path: PathBuf,
}

// ==============================================================================
// Command Logic
// ==============================================================================

/// Handles the orchestration of a single backtest run.
async fn handle_run(args: RunArgs) -> anyhow::Result<()> {
    let settings = resolve_settings(&args)?;

    if let Some(path) = &args.save_config {
        settings
            .save(path)
            .with_context(|| format!("failed to save configuration to {}", path.display()))?;
        tracing::info!("Configuration saved to {}", path.display());
    }

    let request = BacktestRequest {
        symbols: settings.stocks.clone(),
        scheme: AllocationScheme::new(settings.allocation_type, settings.allocations.clone()),
        baseline: settings.baseline.clone(),
        start_date: settings.start_date,
        end_date: settings.end_date,
        inflation_adjusted: args.inflation_adjusted,
        inflation_country: args.country.clone(),
    };

    let engine = BacktestEngine::new(
        Box::new(YahooChartClient::new()),
        Box::new(StatBureauClient::new()),
    );
    let report = engine.run(&request).await?;

    render_report(&settings, &report);
    Ok(())
}

fn handle_show_config(args: ShowConfigArgs) -> anyhow::Result<()> {
    let settings = BacktestSettings::load(&args.path)
        .with_context(|| format!("failed to load configuration from {}", args.path.display()))?;
    print!("{}", settings.to_file_format());
    Ok(())
}

/// Builds the effective settings either from a saved file or from the flags.
fn resolve_settings(args: &RunArgs) -> anyhow::Result<BacktestSettings> {
    if let Some(path) = &args.config {
        let settings = BacktestSettings::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?;
        return Ok(settings);
    }

    let stocks = split_list(
        args.stocks
            .as_deref()
            .context("--stocks is required without --config")?,
    );
    let allocations = args
        .allocations
        .as_deref()
        .context("--allocations is required without --config")?
        .split(',')
        .map(|a| {
            a.trim()
                .parse::<f64>()
                .with_context(|| format!("invalid allocation value: {a}"))
        })
        .collect::<anyhow::Result<Vec<f64>>>()?;

    Ok(BacktestSettings {
        stocks,
        allocations,
        allocation_type: args.allocation_type,
        baseline: args
            .baseline
            .clone()
            .context("--baseline is required without --config")?,
        start_date: args.from.context("--from is required without --config")?,
        end_date: args.to.context("--to is required without --config")?,
    })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ==============================================================================
// Rendering
// ==============================================================================

fn render_report(settings: &BacktestSettings, report: &BacktestReport) {
    let mut table = Table::new();
    table.set_header(vec![
        "Metric".to_string(),
        "Portfolio".to_string(),
        format!("Baseline ({})", settings.baseline),
    ]);
    table.add_row(vec![
        "Total Return".to_string(),
        format!("{:.2}%", report.portfolio_return_pct),
        format!("{:.2}%", report.baseline_return_pct),
    ]);
    table.add_row(vec![
        "Annualized Return".to_string(),
        format!("{:.2}%", report.portfolio_annualized_return_pct),
        format!("{:.2}%", report.baseline_annualized_return_pct),
    ]);
    table.add_row(vec![
        "Final Normalized Value".to_string(),
        format!("{:.4}", report.portfolio_series.last().unwrap_or(f64::NAN)),
        format!("{:.4}", report.baseline_series.last().unwrap_or(f64::NAN)),
    ]);
    table.add_row(vec![
        "Trading Days".to_string(),
        report.portfolio_series.len().to_string(),
        report.baseline_series.len().to_string(),
    ]);

    println!("{table}");
    match (
        report.portfolio_series.first_date(),
        report.portfolio_series.last_date(),
    ) {
        (Some(first), Some(last)) => {
            println!(
                "Series normalized to 1.0 at {first}; values through {last} are {}.",
                if report.inflation_adjusted {
                    "inflation-adjusted (real)"
                } else {
                    "nominal"
                }
            );
        }
        _ => println!("No observations in range."),
    }
}
