//! Manifold momentum bot entry point.

use std::path::Path;

use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use manifold_momentum::collector::save_markets;
use manifold_momentum::config::Config;
use manifold_momentum::error::TradingError;
use manifold_momentum::market::ManifoldClient;
use manifold_momentum::metrics;
use manifold_momentum::store::Collection;
use manifold_momentum::strategy::{bet_contract_ids, run_momentum};

/// Manifold Markets snapshot collector and YES-momentum bot.
#[derive(Parser, Debug)]
#[command(name = "manifold-momentum")]
#[command(about = "Snapshot Manifold markets and bet YES on momentum crossings")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch open markets and upsert them into the snapshot (default).
    SaveMarkets,

    /// Bet on markets that crossed into the momentum band.
    Momentum {
        /// Log bets instead of placing them.
        #[arg(long)]
        dry_run: bool,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Show stored collection sizes.
    Stats,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut logging = Config::load().unwrap_or_default();
    logging.verbose |= args.verbose;
    let filter =
        EnvFilter::try_new(logging.log_directive()).unwrap_or_else(|_| EnvFilter::new("info"));

    if args.json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(),
        Some(Command::Stats) => cmd_stats(),
        Some(Command::Momentum { dry_run }) => with_metrics(cmd_momentum(dry_run)).await,
        Some(Command::SaveMarkets) | None => with_metrics(cmd_save_markets()).await,
    }
}

/// Install the Prometheus recorder when a textfile is configured, run the
/// command, then dump the metrics.
async fn with_metrics<F>(command: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = anyhow::Result<()>>,
{
    let textfile = Config::load().ok().and_then(|c| c.metrics_textfile);
    let handle: Option<PrometheusHandle> = match &textfile {
        Some(_) => match metrics::install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Failed to install metrics recorder: {}", e);
                None
            }
        },
        None => None,
    };
    metrics::init_metrics();

    let result = command.await;

    if let (Some(handle), Some(path)) = (handle, textfile) {
        if let Err(e) = metrics::write_textfile(&handle, &path) {
            warn!(path = %path.display(), "Failed to write metrics: {}", e);
        }
    }

    result
}

fn load_config() -> anyhow::Result<Config> {
    info!("Loading configuration...");
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;
    Ok(config)
}

fn timestamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))
    .unwrap_or_else(|_| now.to_string())
}

/// Fetch open markets and reconcile them into the markets snapshot.
async fn cmd_save_markets() -> anyhow::Result<()> {
    let config = load_config()?;

    println!("Running script at: ");
    println!("{}", timestamp());

    let client = ManifoldClient::new(&config)?;
    let mut markets = Collection::open(&config.markets_db_path)?;

    let summary = save_markets(&client, &mut markets, &config.fetch_config()).await?;

    match summary.reconciled {
        Some(reconciled) => {
            println!("Fetched a total of {} markets.", summary.fetched);
            println!("Saved a total of {} new markets.", reconciled.inserted);
            println!("Updated a total of {} existing markets.", reconciled.updated);
        }
        None => println!("Failed to fetch markets"),
    }

    Ok(())
}

/// Run the YES-momentum strategy against the stored snapshot.
async fn cmd_momentum(dry_run_flag: bool) -> anyhow::Result<()> {
    let mut config = load_config()?;
    if dry_run_flag {
        config.dry_run = true;
    }

    if !config.dry_run && !config.has_api_key() {
        error!("MANIFOLD_API_KEY is required for live betting");
        return Err(TradingError::MissingCredential.into());
    }

    info!("Mode: {}", if config.dry_run { "SIMULATION" } else { "LIVE BETTING" });

    let client = ManifoldClient::new(&config)?;
    let snapshot = Collection::open(&config.markets_db_path)?;
    let mut bets = Collection::open(&config.bets_db_path)?;
    let params = config.momentum_params();

    let summary = run_momentum(&client, &snapshot, &mut bets, &config.fetch_config(), &params).await?;

    if summary.report.fetched == 0 {
        println!("Failed to fetch markets");
        return Ok(());
    }

    println!("Length fetched, before filtering: {}", summary.report.fetched);
    println!("Already tracked in markets snapshot: {}", summary.report.tracked);
    println!("Tracked below {}: {}", params.prior_max, summary.report.prior_below);
    println!(
        "Current probability between {} and {}: {}",
        params.band_low, params.band_high, summary.report.in_band
    );
    println!("Not bet on yet: {}", summary.report.not_bet_on);
    if summary.bets.cap_reached {
        println!("Bet cap of {} reached.", params.max_total_bets);
    }
    if summary.bets.failed > 0 {
        println!("Failed bets: {}", summary.bets.failed);
    }
    if config.dry_run {
        println!("Would have placed {} bets.", summary.bets.simulated);
    } else {
        println!("Placed {} bets!", summary.bets.placed);
    }

    Ok(())
}

/// Check configuration validity.
fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("MANIFOLD MOMENTUM - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    print!("Checking API key... ");
    if config.has_api_key() {
        println!("OK");
    } else {
        println!("MISSING");
        println!("  Live betting requires MANIFOLD_API_KEY; dry runs work without it.");
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  API URL: {}", config.manifold_api_url);
    println!("  Markets DB: {}", config.markets_db_path.display());
    println!("  Bets DB: {}", config.bets_db_path.display());
    println!("  Fetch: {} markets, {} per page", config.fetch_total, config.page_size);
    println!("  Min Liquidity: {}", config.min_liquidity);
    println!("  Token: {}", config.market_token);
    println!("  Prior Below: {}", config.prior_probability_max);
    println!("  Band: ({}, {})", config.band_low, config.band_high);
    println!("  Bet Amount: {}", config.bet_amount);
    println!("  Max Total Bets: {}", config.max_total_bets);
    println!("  Dry Run: {}", config.dry_run);
    if let Some(path) = &config.metrics_textfile {
        println!("  Metrics Textfile: {}", path.display());
    }
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Show stored collection sizes.
fn cmd_stats() -> anyhow::Result<()> {
    let config = load_config()?;

    println!("======================================================================");
    println!("MANIFOLD MOMENTUM - STORE STATS");
    println!("======================================================================");

    print_collection_stats("Markets", &config.markets_db_path, |_| None)?;
    print_collection_stats("Bets", &config.bets_db_path, |bets| {
        Some(bet_contract_ids(bets).len())
    })?;

    println!("======================================================================");

    Ok(())
}

fn print_collection_stats(
    label: &str,
    path: &Path,
    distinct: impl Fn(&Collection) -> Option<usize>,
) -> anyhow::Result<()> {
    let collection = Collection::open(path)?;
    println!("{} ({}):", label, path.display());
    println!("  Documents: {}", collection.len());
    if let Some(count) = distinct(&collection) {
        println!("  Distinct markets: {}", count);
    }
    Ok(())
}
