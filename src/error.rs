use chrono::NaiveDate;
use thiserror::Error;

/// Failure taxonomy for the data path. Everything here degrades to a
/// per-unit skip; only configuration contract violations (checked in
/// `config`) abort a run.
#[derive(Debug, Error)]
pub enum DataError {
    /// Missing candles or news for a ticker-day. Recorded, never raised
    /// past the orchestrator.
    #[error("no data for {ticker} on {day}")]
    NoData { ticker: String, day: NaiveDate },

    /// A candle series violated its ordering or range invariants. The
    /// affected trade is skipped; the run continues.
    #[error("malformed candle series for {ticker}: {reason}")]
    MalformedSeries { ticker: String, reason: String },

    /// An upstream fetch kept failing after bounded retries.
    #[error("upstream unavailable after {attempts} attempt(s): {message}")]
    UpstreamUnavailable { attempts: u32, message: String },
}

impl DataError {
    pub fn no_data(ticker: &str, day: NaiveDate) -> Self {
        DataError::NoData {
            ticker: ticker.to_string(),
            day,
        }
    }

    pub fn malformed_series(ticker: &str, reason: impl Into<String>) -> Self {
        DataError::MalformedSeries {
            ticker: ticker.to_string(),
            reason: reason.into(),
        }
    }
}
