//! rusty-ledger CLI - offline valuation over CSV exports
//!
//! ## Example Usage
//!
//! ```bash
//! # Rate of a currency in the base currency at a date (epoch ms)
//! rusty-ledger --config valuation.toml rate --datums datums.csv \
//!     --owner <OWNER> --currency <CURRENCY> --at 1717200000000
//!
//! # Evenly sampled rate history
//! rusty-ledger --config valuation.toml history --datums datums.csv \
//!     --owner <OWNER> --currency <CURRENCY> --divisions 20
//!
//! # Value every container at a cutoff
//! rusty-ledger --config valuation.toml value --datums datums.csv \
//!     --fragments fragments.csv --owner <OWNER> --at 1717200000000
//! ```

use anyhow::{anyhow, Context, Result};
use chrono::DateTime;
use clap::{Parser, Subcommand};
use colored::Colorize;
use rusty_ledger::config::ValuationConfig;
use rusty_ledger::ledger::{load_fragments_csv, LedgerValuation, TransactionFragment};
use rusty_ledger::rates::{rate_history, InMemoryRateDatumStore, RateChain, RateSource};
use rusty_ledger::types::{ContainerId, CurrencyId, OwnerId, Timestamp};
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process;

/// rusty-ledger: multi-currency ledger valuation
#[derive(Parser)]
#[command(name = "rusty-ledger")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Point-in-time valuation for a multi-currency ledger", long_about = None)]
struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Base currency, overriding the configuration file
    #[arg(long, global = true)]
    base: Option<CurrencyId>,

    /// Pretty-print JSON output
    #[arg(short, long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rate of a currency in the base currency, or in another currency
    Rate {
        #[arg(long)]
        datums: PathBuf,
        #[arg(long)]
        owner: OwnerId,
        #[arg(long)]
        currency: CurrencyId,
        /// Date in epoch milliseconds
        #[arg(long)]
        at: i64,
        /// Quote the rate in this currency instead of the base currency
        #[arg(long)]
        to: Option<CurrencyId>,
    },

    /// Sampled rate history of a currency
    History {
        #[arg(long)]
        datums: PathBuf,
        #[arg(long)]
        owner: OwnerId,
        #[arg(long)]
        currency: CurrencyId,
        #[arg(long)]
        start: Option<i64>,
        #[arg(long)]
        end: Option<i64>,
        /// Number of samples (default: timeline_divisions from config)
        #[arg(short = 'n', long)]
        divisions: Option<usize>,
    },

    /// Value all containers at a cutoff date
    Value {
        #[arg(long)]
        datums: PathBuf,
        #[arg(long)]
        fragments: PathBuf,
        #[arg(long)]
        owner: OwnerId,
        /// Cutoff in epoch milliseconds
        #[arg(long)]
        at: i64,
        /// Start of the income and expense window
        #[arg(long)]
        since: Option<i64>,
    },

    /// Balance timeline of one container
    Timeline {
        #[arg(long)]
        datums: PathBuf,
        #[arg(long)]
        fragments: PathBuf,
        #[arg(long)]
        owner: OwnerId,
        #[arg(long)]
        container: ContainerId,
        #[arg(long)]
        start: Option<i64>,
        #[arg(long)]
        end: i64,
        #[arg(short = 'n', long)]
        divisions: Option<usize>,
    },
}

fn load_config(path: Option<&Path>, base: Option<CurrencyId>) -> Result<ValuationConfig> {
    let mut config = match path {
        Some(path) => ValuationConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ValuationConfig::default(),
    };
    if base.is_some() {
        config.base_currency = base;
    }
    config.validate()?;
    Ok(config)
}

fn load_store(path: &Path) -> Result<InMemoryRateDatumStore> {
    let store = InMemoryRateDatumStore::new();
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let count = store.load_from_csv(file)?;
    log::info!("Loaded {} rate datums from {}", count, path.display());
    Ok(store)
}

fn load_fragments(path: &Path) -> Result<Vec<TransactionFragment>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    Ok(load_fragments_csv(file)?)
}

fn millis(ms: i64) -> Result<Timestamp> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| anyhow!("{} is not a valid epoch millisecond date", ms))
}

fn emit<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}

#[derive(Serialize)]
struct RateOutput {
    currency: CurrencyId,
    quoted_in: CurrencyId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    date: Timestamp,
    rate: Option<rust_decimal::Decimal>,
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref(), cli.base)?;

    match cli.command {
        Commands::Rate {
            datums,
            owner,
            currency,
            at,
            to,
        } => {
            let store = load_store(&datums)?;
            let chain = RateChain::new(&store, owner, &config)?;
            let date = millis(at)?;
            let (quoted_in, rate) = match to {
                Some(to) => (to, chain.currency_to_currency_rate(currency, to, date).await?),
                None => (chain.base_currency(), chain.rate_to_base(currency, date).await?),
            };
            emit(
                &RateOutput {
                    currency,
                    quoted_in,
                    date,
                    rate,
                },
                cli.pretty,
            )
        }

        Commands::History {
            datums,
            owner,
            currency,
            start,
            end,
            divisions,
        } => {
            let store = load_store(&datums)?;
            let chain = RateChain::new(&store, owner, &config)?;
            let history = rate_history(
                &store,
                &chain,
                owner,
                currency,
                start.map(millis).transpose()?,
                end.map(millis).transpose()?,
                divisions.unwrap_or(config.timeline_divisions),
            )
            .await?;
            emit(&history, cli.pretty)
        }

        Commands::Value {
            datums,
            fragments,
            owner,
            at,
            since,
        } => {
            let store = load_store(&datums)?;
            let fragments = load_fragments(&fragments)?;
            let chain = RateChain::new(&store, owner, &config)?;
            let valuation = LedgerValuation::new(&chain);
            let cutoff = millis(at)?;

            let snapshot = valuation.value_at(&fragments, cutoff).await?;
            let summary = valuation
                .income_and_expense(&fragments, since.map(millis).transpose()?, cutoff)
                .await?;
            emit(
                &serde_json::json!({
                    "snapshot": snapshot,
                    "income_and_expense": summary,
                }),
                cli.pretty,
            )
        }

        Commands::Timeline {
            datums,
            fragments,
            owner,
            container,
            start,
            end,
            divisions,
        } => {
            let store = load_store(&datums)?;
            let fragments = load_fragments(&fragments)?;
            let chain = RateChain::new(&store, owner, &config)?;
            let timeline = LedgerValuation::new(&chain)
                .balance_timeline(
                    &fragments,
                    container,
                    start.map(millis).transpose()?,
                    millis(end)?,
                    divisions.unwrap_or(config.timeline_divisions),
                )
                .await?;
            emit(&timeline, cli.pretty)
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}
