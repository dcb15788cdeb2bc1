use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use log::info;
use news_trader::commands::{backtest, cancel_all, status, trade};
use news_trader::config::{BacktestConfig, BracketMode, BracketSpec, SentimentBounds, TradeConfig};
use news_trader::context::AppContext;
use std::path::PathBuf;

const DEFAULT_UNIVERSE_FILE: &str = "technology_tickers.csv";
const DEFAULT_REPORT_DIR: &str = "reports";

#[derive(Parser)]
#[command(name = "news-trader")]
#[command(about = "News-sentiment equity screener with bracket-order paper trading and candle-replay backtesting")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct BracketArgs {
    /// Take-profit offset from the entry price (percent or dollars per --bracket-mode)
    #[arg(long, default_value_t = 0.5)]
    take_profit: f64,
    /// Stop-loss offset from the entry price (percent or dollars per --bracket-mode)
    #[arg(long, default_value_t = 1.5)]
    stop_loss: f64,
    /// Whether offsets are percentages or dollar amounts
    #[arg(long, value_enum, default_value_t = BracketMode::Dollar)]
    bracket_mode: BracketMode,
}

#[derive(Args)]
struct SentimentArgs {
    /// Minimum compound sentiment to qualify (inclusive)
    #[arg(long, default_value_t = 0.0)]
    min_sentiment: f64,
    /// Maximum compound sentiment to qualify (inclusive)
    #[arg(long, default_value_t = 0.7)]
    max_sentiment: f64,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay historical candles for sentiment qualifiers over a date range
    Backtest {
        /// First day of the range (YYYY-MM-DD, inclusive)
        start: NaiveDate,
        /// Last day of the range (YYYY-MM-DD, inclusive)
        end: NaiveDate,
        #[command(flatten)]
        bracket: BracketArgs,
        #[command(flatten)]
        sentiment: SentimentArgs,
        /// Forced-exit cap in minutes after entry
        #[arg(long, default_value_t = 390)]
        max_holding_minutes: i64,
        /// Dollars allocated per qualifying ticker
        #[arg(long, default_value_t = 10_000.0)]
        allocation: f64,
        /// CSV file with a Ticker column
        #[arg(long, value_name = "PATH", default_value = DEFAULT_UNIVERSE_FILE)]
        universe: PathBuf,
        /// Directory for the CSV/JSON report files
        #[arg(long, value_name = "PATH", default_value = DEFAULT_REPORT_DIR)]
        report_dir: PathBuf,
    },
    /// Screen today's universe and place paper bracket orders
    Trade {
        #[command(flatten)]
        bracket: BracketArgs,
        #[command(flatten)]
        sentiment: SentimentArgs,
        /// Fraction of buying power to deploy across qualifiers
        #[arg(long, default_value_t = 0.9)]
        buying_power_ratio: f64,
        /// CSV file with a Ticker column
        #[arg(long, value_name = "PATH", default_value = DEFAULT_UNIVERSE_FILE)]
        universe: PathBuf,
    },
    /// Close all positions and cancel all open orders
    CancelAll,
    /// Check configuration and broker connectivity
    Status,
}

impl BracketArgs {
    fn spec(&self) -> BracketSpec {
        BracketSpec {
            mode: self.bracket_mode,
            take_profit: self.take_profit,
            stop_loss: self.stop_loss,
        }
    }
}

impl SentimentArgs {
    fn bounds(&self) -> SentimentBounds {
        SentimentBounds {
            min: self.min_sentiment,
            max: self.max_sentiment,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let context = AppContext::initialize()?;

    info!("Starting news-trader. Not financial advice. Use at your own risk.");

    match cli.command {
        Commands::Backtest {
            start,
            end,
            bracket,
            sentiment,
            max_holding_minutes,
            allocation,
            universe,
            report_dir,
        } => {
            let config = BacktestConfig {
                start,
                end,
                bracket: bracket.spec(),
                sentiment: sentiment.bounds(),
                max_holding_minutes,
                allocation_per_ticker: allocation,
                universe_file: universe,
                report_dir,
            };
            backtest::run(&context, &config).await?;
        }
        Commands::Trade {
            bracket,
            sentiment,
            buying_power_ratio,
            universe,
        } => {
            let config = TradeConfig {
                bracket: bracket.spec(),
                sentiment: sentiment.bounds(),
                buying_power_ratio,
                universe_file: universe,
            };
            trade::run(&context, &config).await?;
        }
        Commands::CancelAll => {
            cancel_all::run(&context).await?;
        }
        Commands::Status => {
            status::run(&context).await?;
        }
    }

    Ok(())
}
