use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pricewell::{AssetType, ChartPeriod, Config, HoldingRef, MarketDataService};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pricewell")]
#[command(about = "Market data acquisition: quotes, portfolio pricing, candles and live trades", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a single quote through the provider chain
    Quote {
        /// Asset type (stock, etf, mutual_fund, crypto, gold, silver, platinum, index, ...)
        asset_type: AssetType,

        /// Ticker symbol (not needed for commodities)
        symbol: Option<String>,
    },

    /// Price every holding in a JSON file of `{id, assetType, symbol?}` records
    Batch {
        holdings: PathBuf,
    },

    /// Fetch historical candles
    Candles {
        symbol: String,

        /// Display period (1D, 1W, 1M, 3M, 1Y)
        period: ChartPeriod,
    },

    /// Print live trades until interrupted
    Stream {
        #[arg(required = true)]
        symbols: Vec<String>,
    },

    /// Remove every cached quote, including persisted copies
    ClearCache,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pricewell=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    config.log_provider_status();

    let service = MarketDataService::from_config(&config).await;

    match cli.cmd {
        Commands::Quote { asset_type, symbol } => {
            match service.quote(asset_type, symbol.as_deref()).await {
                Some(quote) => println!("{}", serde_json::to_string_pretty(&quote)?),
                None => println!("null"),
            }
        }
        Commands::Batch { holdings } => {
            let raw = tokio::fs::read_to_string(&holdings)
                .await
                .with_context(|| format!("read {}", holdings.display()))?;
            let holdings: Vec<HoldingRef> =
                serde_json::from_str(&raw).context("parse holdings JSON")?;
            let quotes = service.price_holdings(&holdings).await;
            println!("{}", serde_json::to_string_pretty(&quotes)?);
        }
        Commands::Candles { symbol, period } => {
            let candles = service.candles(&symbol, period).await;
            println!("{}", serde_json::to_string_pretty(&candles)?);
        }
        Commands::Stream { symbols } => {
            let handle = service.stream(&symbols, |tick| {
                if let Ok(line) = serde_json::to_string(&tick) {
                    println!("{}", line);
                }
            });
            tokio::signal::ctrl_c()
                .await
                .context("listen for shutdown signal")?;
            info!("Shutting down trade stream");
            handle.shutdown().await;
        }
        Commands::ClearCache => {
            service.clear_cache().await;
        }
    }

    Ok(())
}
