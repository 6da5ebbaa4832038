//! TrendScan CLI: screening, sell advice and data checks.
//!
//! Commands:
//! - `screen`: screen a universe file (or listed symbols) and write a candidate CSV
//! - `advise`: evaluate held positions and write a decision CSV
//! - `fetch`: fetch bars for a few symbols and report what came back
//! - `init-config`: write a fully populated default config file

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use trendscan_core::data::{MarketDataFetcher, Universe};
use trendscan_core::screen::{Screener, Strictness, TrendMode};
use trendscan_core::sell::SellEngine;
use trendscan_runner::{
    candidates_csv, decisions_csv, load_positions, write_file, AdviceReport, Advisor, AppConfig,
    ScanPipeline, ScanReport, WorkerPool,
};

#[derive(Parser)]
#[command(
    name = "trendscan",
    about = "TrendScan: daily trend screening and sell-decision advice"
)]
struct Cli {
    /// TOML config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging (RUST_LOG takes precedence).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Screen a universe for trend candidates.
    Screen {
        /// Universe file: one symbol per line, optionally `symbol,name`.
        #[arg(long)]
        universe: Option<PathBuf>,

        /// Symbols to screen instead of a universe file (e.g., 7203 6758).
        symbols: Vec<String>,

        /// Override the trend-confirmation template.
        #[arg(long, value_enum)]
        trend_mode: Option<TrendModeArg>,

        /// Override how volume failures are treated.
        #[arg(long, value_enum)]
        strictness: Option<StrictnessArg>,

        /// Output CSV. Defaults to candidates_<date>.csv.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Evaluate held positions and recommend HOLD or a sell action.
    Advise {
        /// Positions CSV: symbol,buy_price,buy_time,quantity[,tier].
        #[arg(long)]
        positions: PathBuf,

        /// Output CSV. Defaults to decisions_<date>.csv.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Fetch daily bars and print a one-line summary per symbol.
    Fetch {
        #[arg(required = true)]
        symbols: Vec<String>,
    },
    /// Write the default configuration as TOML.
    InitConfig {
        #[arg(long, default_value = "trendscan.toml")]
        output: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TrendModeArg {
    Hybrid,
    Minervini,
    AdxOnly,
}

impl From<TrendModeArg> for TrendMode {
    fn from(arg: TrendModeArg) -> Self {
        match arg {
            TrendModeArg::Hybrid => TrendMode::Hybrid,
            TrendModeArg::Minervini => TrendMode::Minervini,
            TrendModeArg::AdxOnly => TrendMode::AdxOnly,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StrictnessArg {
    Strict,
    Normal,
    Loose,
}

impl From<StrictnessArg> for Strictness {
    fn from(arg: StrictnessArg) -> Self {
        match arg {
            StrictnessArg::Strict => Strictness::Strict,
            StrictnessArg::Normal => Strictness::Normal,
            StrictnessArg::Loose => Strictness::Loose,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Screen {
            universe,
            symbols,
            trend_mode,
            strictness,
            output,
        } => {
            let mut config = config;
            if let Some(mode) = trend_mode {
                config.screen.trend_mode = mode.into();
            }
            if let Some(s) = strictness {
                config.screen.strictness = s.into();
            }
            run_screen(&config, universe.as_deref(), &symbols, output)
        }
        Commands::Advise { positions, output } => run_advise(&config, &positions, output),
        Commands::Fetch { symbols } => run_fetch(&config, &symbols),
        Commands::InitConfig { output, force } => run_init_config(&output, force),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .ok();
}

fn dated_output(output: Option<PathBuf>, stem: &str) -> PathBuf {
    output.unwrap_or_else(|| {
        PathBuf::from(format!(
            "{stem}_{}.csv",
            chrono::Local::now().format("%Y%m%d")
        ))
    })
}

fn build_fetcher(config: &AppConfig) -> Result<Arc<MarketDataFetcher>> {
    let fetcher =
        MarketDataFetcher::from_config(&config.fetch).context("failed to build HTTP client")?;
    Ok(Arc::new(fetcher))
}

fn build_pool(config: &AppConfig) -> Result<WorkerPool> {
    Ok(WorkerPool::from_config(&config.fetch, &config.pipeline)?)
}

fn run_screen(
    config: &AppConfig,
    universe_path: Option<&Path>,
    symbols: &[String],
    output: Option<PathBuf>,
) -> Result<()> {
    let universe = match (universe_path, symbols.is_empty()) {
        (Some(_), false) => bail!("pass either --universe or symbols, not both"),
        (Some(path), true) => Universe::from_file(path)?,
        (None, false) => Universe::from_symbols(symbols),
        (None, true) => bail!("one of --universe or symbols is required"),
    };
    if universe.is_empty() {
        bail!("universe is empty");
    }

    let pool = build_pool(config)?;
    info!(
        symbols = universe.len(),
        threads = pool.threads(),
        trend_mode = %config.screen.trend_mode,
        config = %config.fingerprint(),
        "starting screen"
    );
    let pipeline = ScanPipeline::new(
        build_fetcher(config)?,
        Screener::new(config.screen.clone()),
        pool,
    );
    let report = pipeline.run(&universe);

    let path = dated_output(output, "candidates");
    write_file(&path, &candidates_csv(&report.candidates)?)?;
    print_scan_summary(&report);
    println!("Candidates written to: {}", path.display());
    Ok(())
}

fn run_advise(config: &AppConfig, positions_path: &Path, output: Option<PathBuf>) -> Result<()> {
    let positions = load_positions(positions_path)?;
    if positions.is_empty() {
        bail!("no usable positions in {}", positions_path.display());
    }

    let advisor = Advisor::new(
        build_fetcher(config)?,
        SellEngine::new(config.sell.clone()),
        build_pool(config)?,
    );
    info!(positions = positions.len(), config = %config.fingerprint(), "starting advice");
    let report = advisor.advise(positions);

    let path = dated_output(output, "decisions");
    write_file(&path, &decisions_csv(&report.rows)?)?;
    print_advice_summary(&report);
    println!("Decisions written to: {}", path.display());
    Ok(())
}

fn run_fetch(config: &AppConfig, symbols: &[String]) -> Result<()> {
    let fetcher = build_fetcher(config)?;
    let mut failed = 0;
    for symbol in symbols {
        match fetcher.fetch(symbol) {
            Ok(fetched) => {
                let store = &fetched.store;
                match store.last() {
                    Some(last) => println!(
                        "{:<10} {:>4} bars via {:<6} last {} close {:.2} vol {}",
                        store.symbol(),
                        store.len(),
                        fetched.source.to_string(),
                        last.date,
                        last.close,
                        last.volume
                    ),
                    None => println!("{:<10} no bars", store.symbol()),
                }
            }
            Err(failure) => {
                failed += 1;
                eprintln!("Error: {failure}");
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} symbol(s) could not be fetched", symbols.len());
    }
    Ok(())
}

fn run_init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!("{} already exists (pass --force to overwrite)", output.display());
    }
    write_file(output, &AppConfig::default().to_toml_string()?)?;
    println!("Default config written to: {}", output.display());
    Ok(())
}

fn print_scan_summary(report: &ScanReport) {
    println!();
    println!("=== Screen Result ===");
    println!("Universe:       {}", report.universe_size);
    println!("Prefiltered:    {}", report.prefiltered);
    println!("Candidates:     {}", report.candidates.len());
    println!("Fetch failures: {}", report.failures.len());
    if report.secondary_hits > 0 {
        println!("Via fallback:   {}", report.secondary_hits);
    }
    if report.abandoned > 0 {
        println!("Timed out:      {}", report.abandoned);
    }
    if !report.rejects.is_empty() {
        println!();
        println!("--- Rejections ---");
        for (reason, count) in &report.rejects {
            println!("{:<22} {count:>6}", reason.to_string());
        }
    }
    for failure in &report.failures {
        println!("WARNING: {failure}");
    }
    println!();
}

fn print_advice_summary(report: &AdviceReport) {
    println!();
    println!("=== Advice Result ===");
    println!("Positions:      {}", report.rows.len());
    println!("Sell actions:   {}", report.sells());
    println!("Fetch failures: {}", report.failed());
    if report.abandoned() > 0 {
        println!("Timed out:      {}", report.abandoned());
    }
    println!();
    for row in &report.rows {
        if let Some(decision) = row.decision() {
            println!(
                "{:<10} {:<10} {}",
                row.position.symbol(),
                decision.action.to_string(),
                decision.reason_text()
            );
        }
    }
    println!();
}
