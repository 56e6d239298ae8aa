//! Ladder trading bot
//!
//! Walks a configured ladder of buy/sell steps against a live price feed,
//! tracking per-lot cost basis and realized PnL in a durable JSON snapshot.

mod api;
mod bot;
mod config;
mod engine;
mod indicators;
mod models;
mod state;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::api::{BinanceClient, ExchangeApi};
use crate::bot::Bot;
use crate::config::{BotSettings, LadderConfig};
use crate::state::StateStore;

/// Ladder trading bot CLI.
#[derive(Parser)]
#[command(name = "ladderbot")]
#[command(about = "Walk buy/sell price ladders with per-lot PnL accounting", long_about = None)]
struct Cli {
    /// Ladder ruleset file
    #[arg(short, long, default_value = "config/ladder.json")]
    config: PathBuf,

    /// Engine state snapshot file
    #[arg(long, default_value = "data/state.json", env = "STATE_FILE")]
    state_file: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Submit real orders instead of simulating
    #[arg(long, env = "LIVE")]
    live: bool,

    /// Use the exchange testnet
    #[arg(long, env = "USE_TESTNET")]
    testnet: bool,

    /// Paper fee percentage per fill
    #[arg(long, env = "PAPER_FEE_PCT", default_value = "0.1")]
    fee_pct: Decimal,

    /// Paper slippage in basis points
    #[arg(long, env = "PAPER_SLIPPAGE_BPS", default_value = "2")]
    slippage_bps: Decimal,

    /// Starting paper quote balance
    #[arg(long, env = "PAPER_STARTING_USDT", default_value = "10000")]
    starting_usdt: Decimal,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the periodic evaluation loop
    Run,

    /// Evaluate all symbols once, then exit
    Tick,

    /// Show configuration summary
    Status,

    /// Dump the engine state snapshot
    State,

    /// Show paper wallet balances and realized PnL
    Balances,

    /// Show position lots
    Lots,

    /// Show trade history
    Trades,

    /// Reset the engine state to a fresh snapshot
    Reset,

    /// Show the current price for a symbol
    Price {
        /// Market symbol, e.g. SOL/USDT
        #[arg(short, long)]
        symbol: String,
    },

    /// Show an EMA crossover + RSI read for a symbol
    Signal {
        /// Market symbol, e.g. SOL/USDT
        #[arg(short, long)]
        symbol: String,

        /// Candle timeframe
        #[arg(short, long, default_value = "1m")]
        timeframe: String,
    },
}

impl Cli {
    fn settings(&self) -> BotSettings {
        BotSettings {
            live: self.live,
            testnet: self.testnet,
            fee_pct: self.fee_pct,
            slippage_bps: self.slippage_bps,
            starting_quote: self.starting_usdt,
            state_path: self.state_file.clone(),
            ..BotSettings::default()
        }
    }

    fn store(&self) -> StateStore {
        let settings = self.settings();
        StateStore::new(settings.state_path, &settings.quote_asset, settings.starting_quote)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match &cli.command {
        Commands::Run => {
            let ladder = LadderConfig::from_file(&cli.config)?;
            let exchange = BinanceClient::new(cli.testnet)?;
            let bot = Bot::new(cli.settings(), ladder, exchange);
            bot.run().await?;
        }

        Commands::Tick => {
            let ladder = LadderConfig::from_file(&cli.config)?;
            let exchange = BinanceClient::new(cli.testnet)?;
            let bot = Bot::new(cli.settings(), ladder, exchange);
            bot.tick_all().await;
        }

        Commands::Status => {
            let ladder = LadderConfig::from_file(&cli.config)?;
            let status = json!({
                "app": "ladderbot",
                "loopSeconds": ladder.loop_seconds,
                "live": cli.live || ladder.live,
                "testnet": cli.testnet,
                "symbols": ladder.symbols(),
                "stateFile": cli.state_file,
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }

        Commands::State => {
            let state = cli.store().load()?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }

        Commands::Balances => {
            let state = cli.store().load()?;
            let out = json!({
                "balances": state.balances,
                "realizedPnlUSDT": state.realized_pnl_usdt,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }

        Commands::Lots => {
            let state = cli.store().load()?;
            println!("{}", serde_json::to_string_pretty(&json!({ "lots": state.lots }))?);
        }

        Commands::Trades => {
            let state = cli.store().load()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "trades": state.trades }))?
            );
        }

        Commands::Reset => {
            let state = cli.store().reset()?;
            info!("engine state reset");
            println!("{}", serde_json::to_string_pretty(&state)?);
        }

        Commands::Price { symbol } => {
            let exchange = BinanceClient::new(cli.testnet)?;
            let price = exchange.current_price(symbol).await?;
            println!("{}", json!({ "symbol": symbol, "price": price }));
        }

        Commands::Signal { symbol, timeframe } => {
            let exchange = BinanceClient::new(cli.testnet)?;
            let closes = exchange.recent_closes(symbol, timeframe, 200).await?;
            let signal = indicators::ema_crossover(&closes);
            let rsi = indicators::rsi(&closes, 14);
            let out = json!({
                "symbol": symbol,
                "timeframe": timeframe,
                "signal": signal.as_str(),
                "rsi": rsi.last(),
                "lastClose": closes.last(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    Ok(())
}
