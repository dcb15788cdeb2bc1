use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use clap::ValueEnum;
use serde::Serialize;
use std::env;
use std::path::PathBuf;

const DEFAULT_FINNHUB_URL: &str = "https://finnhub.io";
const DEFAULT_ALPACA_DATA_URL: &str = "https://data.alpaca.markets";
const DEFAULT_ALPACA_TRADING_URL: &str = "https://paper-api.alpaca.markets";

/// How take-profit and stop-loss offsets relate to the entry price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BracketMode {
    /// Offsets are percentages of the entry price.
    Percent,
    /// Offsets are dollar amounts added to / subtracted from the entry price.
    Dollar,
}

/// Bracket geometry: positive TP and SL offsets around an entry price.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BracketSpec {
    pub mode: BracketMode,
    pub take_profit: f64,
    pub stop_loss: f64,
}

impl BracketSpec {
    /// Absolute (take_profit, stop_loss) price levels for an entry fill.
    pub fn levels(&self, entry_price: f64) -> (f64, f64) {
        match self.mode {
            BracketMode::Percent => (
                entry_price * (1.0 + self.take_profit / 100.0),
                entry_price * (1.0 - self.stop_loss / 100.0),
            ),
            BracketMode::Dollar => (entry_price + self.take_profit, entry_price - self.stop_loss),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.take_profit.is_finite() || self.take_profit <= 0.0 {
            return Err(anyhow!(
                "Take-profit offset must be > 0 (value: {})",
                self.take_profit
            ));
        }
        if !self.stop_loss.is_finite() || self.stop_loss <= 0.0 {
            return Err(anyhow!(
                "Stop-loss offset must be > 0 (value: {})",
                self.stop_loss
            ));
        }
        if self.mode == BracketMode::Percent && self.stop_loss >= 100.0 {
            return Err(anyhow!(
                "Percent stop-loss must be < 100 (value: {})",
                self.stop_loss
            ));
        }
        Ok(())
    }
}

/// Inclusive sentiment band a ticker-day score must fall in to qualify.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SentimentBounds {
    pub min: f64,
    pub max: f64,
}

impl SentimentBounds {
    pub fn contains(&self, compound: f64) -> bool {
        compound >= self.min && compound <= self.max
    }

    pub fn validate(&self) -> Result<()> {
        for (label, value) in [("min", self.min), ("max", self.max)] {
            if !value.is_finite() || !(-1.0..=1.0).contains(&value) {
                return Err(anyhow!(
                    "Sentiment {} bound must be in [-1, 1] (value: {})",
                    label,
                    value
                ));
            }
        }
        if self.min > self.max {
            return Err(anyhow!(
                "Sentiment min bound ({}) must be <= max bound ({})",
                self.min,
                self.max
            ));
        }
        Ok(())
    }
}

/// Full configuration for one backtest run. Validated up front; violations
/// are fatal before any fetch happens.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestConfig {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub bracket: BracketSpec,
    pub sentiment: SentimentBounds,
    pub max_holding_minutes: i64,
    pub allocation_per_ticker: f64,
    pub universe_file: PathBuf,
    pub report_dir: PathBuf,
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<()> {
        if self.start > self.end {
            return Err(anyhow!(
                "Start date ({}) must be on or before end date ({})",
                self.start,
                self.end
            ));
        }
        self.bracket.validate()?;
        self.sentiment.validate()?;
        if self.max_holding_minutes <= 0 {
            return Err(anyhow!(
                "Max holding minutes must be > 0 (value: {})",
                self.max_holding_minutes
            ));
        }
        if !self.allocation_per_ticker.is_finite() || self.allocation_per_ticker <= 0.0 {
            return Err(anyhow!(
                "Per-ticker allocation must be > 0 (value: {})",
                self.allocation_per_ticker
            ));
        }
        Ok(())
    }
}

/// Configuration for one live trading session.
#[derive(Debug, Clone)]
pub struct TradeConfig {
    pub bracket: BracketSpec,
    pub sentiment: SentimentBounds,
    pub buying_power_ratio: f64,
    pub universe_file: PathBuf,
}

impl TradeConfig {
    pub fn validate(&self) -> Result<()> {
        self.bracket.validate()?;
        self.sentiment.validate()?;
        if !(0.0..=1.0).contains(&self.buying_power_ratio) || self.buying_power_ratio == 0.0 {
            return Err(anyhow!(
                "Buying power ratio must be in (0, 1] (value: {})",
                self.buying_power_ratio
            ));
        }
        Ok(())
    }
}

/// API credentials and endpoint overrides, sourced from the process
/// environment (with `.env` loaded first). Keys stay optional here; each
/// command demands the ones it actually needs.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub finnhub_api_key: Option<String>,
    pub alpaca_key_id: Option<String>,
    pub alpaca_secret_key: Option<String>,
    pub finnhub_url: String,
    pub alpaca_data_url: String,
    pub alpaca_trading_url: String,
}

impl Credentials {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            finnhub_api_key: non_empty_env("FINNHUB_API_KEY"),
            alpaca_key_id: non_empty_env("APCA_API_KEY_ID"),
            alpaca_secret_key: non_empty_env("APCA_API_SECRET_KEY"),
            finnhub_url: non_empty_env("FINNHUB_BASE_URL")
                .unwrap_or_else(|| DEFAULT_FINNHUB_URL.to_string()),
            alpaca_data_url: non_empty_env("ALPACA_DATA_URL")
                .unwrap_or_else(|| DEFAULT_ALPACA_DATA_URL.to_string()),
            alpaca_trading_url: non_empty_env("ALPACA_TRADING_URL")
                .unwrap_or_else(|| DEFAULT_ALPACA_TRADING_URL.to_string()),
        }
    }

    pub fn finnhub_key(&self) -> Result<&str> {
        self.finnhub_api_key
            .as_deref()
            .ok_or_else(|| anyhow!("FINNHUB_API_KEY must be set to fetch company news."))
    }

    pub fn alpaca_keys(&self) -> Result<(&str, &str)> {
        match (self.alpaca_key_id.as_deref(), self.alpaca_secret_key.as_deref()) {
            (Some(key), Some(secret)) => Ok((key, secret)),
            _ => Err(anyhow!(
                "APCA_API_KEY_ID and APCA_API_SECRET_KEY must both be set for Alpaca access."
            )),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
