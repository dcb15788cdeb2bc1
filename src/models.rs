use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One fixed-interval OHLC price bar. `start` is the bar's opening
/// timestamp; series are ordered by strictly increasing `start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub start: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Compound news sentiment for one ticker on one day. Only materialized
/// when at least one article was scored, so a score never stands in for
/// "no news".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentScore {
    pub ticker: String,
    pub day: NaiveDate,
    pub compound: f64,
    pub article_count: usize,
}

/// A sentiment-qualified entry for one ticker-day. Take-profit and
/// stop-loss are absolute price levels derived from the entry candle's
/// open; `quantity` is the whole-share position size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntrySignal {
    pub ticker: String,
    pub day: NaiveDate,
    pub entry_time: DateTime<Utc>,
    pub sentiment: f64,
    pub take_profit: f64,
    pub stop_loss: f64,
    pub max_holding_minutes: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    TimeExpiry,
    NoData,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::TakeProfit => "TAKE_PROFIT",
            ExitReason::StopLoss => "STOP_LOSS",
            ExitReason::TimeExpiry => "TIME_EXPIRY",
            ExitReason::NoData => "NO_DATA",
        }
    }

    /// A trade that never filled carries no prices and no P&L.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, ExitReason::NoData)
    }
}

/// Terminal artifact of one simulated (or skipped) trade. Created exactly
/// once by the simulator and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    pub ticker: String,
    pub day: NaiveDate,
    pub sentiment: f64,
    pub entry_time: DateTime<Utc>,
    pub entry_price: Option<f64>,
    pub exit_time: DateTime<Utc>,
    pub exit_price: Option<f64>,
    pub exit_reason: ExitReason,
    pub quantity: i64,
    pub pnl: Option<f64>,
    pub holding_minutes: i64,
}

impl TradeRecord {
    /// Record for a trade that could not be filled or whose price series
    /// failed validation.
    pub fn no_data(signal: &EntrySignal) -> Self {
        Self {
            ticker: signal.ticker.clone(),
            day: signal.day,
            sentiment: signal.sentiment,
            entry_time: signal.entry_time,
            entry_price: None,
            exit_time: signal.entry_time,
            exit_price: None,
            exit_reason: ExitReason::NoData,
            quantity: 0,
            pnl: None,
            holding_minutes: 0,
        }
    }

    pub fn is_win(&self) -> bool {
        self.pnl.map(|pnl| pnl > 0.0).unwrap_or(false)
    }
}

/// Nominal US market open (09:30 America/New_York expressed in UTC during
/// daylight saving). Used as the requested entry time when a day has no
/// candles at all.
pub fn market_open_utc(day: NaiveDate) -> DateTime<Utc> {
    let open = day.and_hms_opt(13, 30, 0).unwrap_or_else(|| {
        day.and_time(chrono::NaiveTime::MIN)
    });
    Utc.from_utc_datetime(&open)
}

/// Normalizes a ticker string by trimming whitespace and uppercasing.
pub fn normalize_ticker_symbol(value: &str) -> Option<String> {
    let normalized = value.trim().to_uppercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_data_record_carries_no_prices() {
        let entry_time = Utc.with_ymd_and_hms(2024, 8, 5, 13, 30, 0).unwrap();
        let signal = EntrySignal {
            ticker: "AAPL".to_string(),
            day: entry_time.date_naive(),
            entry_time,
            sentiment: 0.42,
            take_profit: 105.0,
            stop_loss: 97.0,
            max_holding_minutes: 60,
            quantity: 10,
        };

        let record = TradeRecord::no_data(&signal);
        assert_eq!(record.exit_reason, ExitReason::NoData);
        assert!(record.entry_price.is_none());
        assert!(record.exit_price.is_none());
        assert!(record.pnl.is_none());
        assert_eq!(record.holding_minutes, 0);
        assert_eq!(record.exit_time, record.entry_time);
        assert!(!record.exit_reason.is_resolved());
        assert!(!record.is_win());
    }

    #[test]
    fn normalizes_ticker_symbols() {
        assert_eq!(normalize_ticker_symbol(" nvda "), Some("NVDA".to_string()));
        assert_eq!(normalize_ticker_symbol("   "), None);
    }
}
