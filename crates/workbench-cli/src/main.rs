//! workbench: value, rank and screen a universe snapshot from local files.
//!
//! Usage:
//!   workbench --fundamentals data/fundamentals.json --prices data/prices.csv run
//!   workbench --prices data/prices.csv signals --active-only
//!   workbench --fundamentals data/fundamentals.json --prices data/prices.csv --db alpha.db orders
//!   workbench --prices data/prices.csv monitor --positions data/final_buy_orders.csv

mod io;
mod store;

use analysis_orchestrator::{Pipeline, PipelineConfig, PriceHistory, RawFundamentals};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use store::ResultStore;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON array of fundamentals records
    #[arg(long, global = true)]
    fundamentals: Option<PathBuf>,

    /// Daily bars CSV: ticker,date,open,high,low,close,volume
    #[arg(long, global = true)]
    prices: Option<PathBuf>,

    /// Directory for CSV output
    #[arg(long, global = true, default_value = "data")]
    out: PathBuf,

    /// SQLite database to replace result tables in
    #[arg(long, global = true)]
    db: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Screen price history for uptrend names that are not overbought
    Scan {
        #[arg(long)]
        min_price: Option<f64>,
    },
    /// DCF valuation of every ticker in the fundamentals file
    Value,
    /// Value / quality / trend factor ranking
    Rank,
    /// Technical signal scores for every ticker with enough history
    Signals {
        /// Only write non-WAIT signals to CSV
        #[arg(long)]
        active_only: bool,
    },
    /// Trend / zone / trigger checklist
    Trinity,
    /// Value, then allocate capital across the BUY list
    Orders,
    /// Trailing-stop and hard-stop check of open positions
    Monitor {
        /// CSV with ticker, entry_price (or limit_price) and shares
        #[arg(long)]
        positions: PathBuf,
    },
    /// Map holdings to sector ETFs and rate each fund's trend
    Sectors {
        /// Holdings CSV; scanner candidates are used when omitted
        #[arg(long)]
        positions: Option<PathBuf>,
    },
    /// Every stage in sequence
    Run,
}

fn load_fundamentals(path: Option<&Path>) -> Result<Vec<RawFundamentals>> {
    let path = path.context("--fundamentals is required for this command")?;
    let records = io::read_fundamentals(path)?;
    tracing::info!("Loaded {} fundamentals records", records.len());
    Ok(records)
}

fn load_prices(path: Option<&Path>, required: bool) -> Result<PriceHistory> {
    match path {
        Some(path) => {
            let history = io::read_prices(path)?;
            tracing::info!("Loaded price history for {} tickers", history.len());
            Ok(history)
        }
        None if required => anyhow::bail!("--prices is required for this command"),
        None => Ok(PriceHistory::new()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "workbench=info,analysis_orchestrator=info,technical_analysis=info,quant_analysis=info,order_allocator=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = PipelineConfig::from_env()?;
    if let Commands::Scan { min_price: Some(min_price) } = &cli.command {
        config.scanner.min_price = Some(*min_price);
    }
    let pipeline = Pipeline::new(config)?;

    std::fs::create_dir_all(&cli.out).with_context(|| format!("creating {}", cli.out.display()))?;
    let store = match &cli.db {
        Some(path) => Some(ResultStore::open(path).await?),
        None => None,
    };

    let fundamentals_path = cli.fundamentals.as_deref();
    let prices_path = cli.prices.as_deref();

    match &cli.command {
        Commands::Scan { .. } => {
            let history = load_prices(prices_path, true)?;
            let candidates = pipeline.scan(&history);
            io::write_csv(&cli.out.join("watchlist.csv"), &candidates)?;
            if let Some(store) = &store {
                store.replace_candidates(&candidates).await?;
            }
        }
        Commands::Value => {
            let fundamentals = load_fundamentals(fundamentals_path)?;
            let history = load_prices(prices_path, false)?;
            let valuations = pipeline.value(&fundamentals, &history);
            io::write_csv(&cli.out.join("valuations.csv"), &valuations)?;
            if let Some(store) = &store {
                store.replace_valuations(&valuations).await?;
            }
        }
        Commands::Rank => {
            let fundamentals = load_fundamentals(fundamentals_path)?;
            let history = load_prices(prices_path, true)?;
            let rankings = pipeline.rank(&fundamentals, &history);
            io::write_csv(&cli.out.join("quant_rankings.csv"), &rankings)?;
            if let Some(store) = &store {
                store.replace_rankings(&rankings).await?;
            }
        }
        Commands::Signals { active_only } => {
            let history = load_prices(prices_path, true)?;
            let signals = pipeline.signals(&history);
            let written: Vec<_> = signals
                .iter()
                .filter(|s| !*active_only || s.signal.is_active())
                .cloned()
                .collect();
            io::write_csv(&cli.out.join("technical_signals.csv"), &written)?;
            if let Some(store) = &store {
                store.replace_signals(&signals).await?;
            }
        }
        Commands::Trinity => {
            let history = load_prices(prices_path, true)?;
            let reports = pipeline.trinity(&history);
            io::write_csv(&cli.out.join("trinity.csv"), &reports)?;
        }
        Commands::Orders => {
            let fundamentals = load_fundamentals(fundamentals_path)?;
            let history = load_prices(prices_path, false)?;
            let valuations = pipeline.value(&fundamentals, &history);
            let orders = pipeline.orders(&valuations);
            io::write_csv(&cli.out.join("final_buy_orders.csv"), &orders)?;
            if let Some(store) = &store {
                store.replace_orders(&orders).await?;
            }
        }
        Commands::Monitor { positions } => {
            let positions = io::read_positions(positions)?;
            let history = load_prices(prices_path, true)?;
            let signals = pipeline.monitor(&positions, &history);
            io::write_csv(&cli.out.join("portfolio_monitor.csv"), &signals)?;
        }
        Commands::Sectors { positions } => {
            let history = load_prices(prices_path, true)?;
            let fundamentals = match fundamentals_path {
                Some(_) => load_fundamentals(fundamentals_path)?,
                None => Vec::new(),
            };
            let tickers: Vec<String> = match positions {
                Some(path) => io::read_positions(path)?.into_iter().map(|p| p.ticker).collect(),
                None => pipeline.scan(&history).into_iter().map(|c| c.ticker).collect(),
            };
            let tickers: Vec<&str> = tickers.iter().map(String::as_str).collect();
            let allocations = pipeline.sector_etfs(&tickers, &fundamentals, &history);
            io::write_csv(&cli.out.join("etf_strategy.csv"), &allocations)?;
        }
        Commands::Run => {
            let fundamentals = load_fundamentals(fundamentals_path)?;
            let history = load_prices(prices_path, true)?;
            let report = pipeline.run(&fundamentals, &history);

            io::write_csv(&cli.out.join("watchlist.csv"), &report.candidates)?;
            io::write_csv(&cli.out.join("valuations.csv"), &report.valuations)?;
            io::write_csv(&cli.out.join("quant_rankings.csv"), &report.rankings)?;
            io::write_csv(&cli.out.join("technical_signals.csv"), &report.signals)?;
            io::write_csv(&cli.out.join("final_buy_orders.csv"), &report.orders)?;
            io::write_csv(&cli.out.join("etf_strategy.csv"), &report.etf_strategy)?;
            if let Some(store) = &store {
                store.save_run(&report).await?;
            }

            tracing::info!(
                "Run complete: {} candidates, {} valued, {} ranked, {} orders",
                report.candidates.len(),
                report.valuations.len(),
                report.rankings.len(),
                report.orders.len()
            );
        }
    }

    Ok(())
}
