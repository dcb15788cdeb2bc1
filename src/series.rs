//! Shaping and validation of fetched price bars into the ordered candle
//! sequence the simulator consumes. Fetch payloads are normalized here so
//! malformed data never reaches simulation logic.

use crate::error::DataError;
use crate::models::Candle;
use chrono::{DateTime, NaiveDate, Utc};

pub const PRICE_EPSILON: f64 = 1e-6;

/// Sorts bars by start timestamp, drops duplicates and bars with
/// non-finite or non-positive prices. Gapped series are fine; only
/// unusable bars are removed.
pub fn normalize_bars(mut bars: Vec<Candle>) -> Vec<Candle> {
    bars.retain(|bar| {
        let prices = [bar.open, bar.high, bar.low, bar.close];
        prices.iter().all(|p| p.is_finite() && *p > 0.0)
    });
    bars.sort_by(|a, b| a.start.cmp(&b.start));
    bars.dedup_by(|a, b| a.start == b.start);
    bars
}

/// Restricts a series to candles starting on the given calendar day.
pub fn restrict_to_day(candles: &[Candle], day: NaiveDate) -> Vec<Candle> {
    candles
        .iter()
        .filter(|candle| candle.start.date_naive() == day)
        .cloned()
        .collect()
}

/// Checks the series invariants: strictly increasing start timestamps and
/// `low <= open, close <= high` per candle. An empty series is valid (it
/// simulates to a no-data record, not an error).
pub fn validate_series(ticker: &str, candles: &[Candle]) -> Result<(), DataError> {
    for candle in candles {
        if candle.low > candle.high + PRICE_EPSILON {
            return Err(DataError::malformed_series(
                ticker,
                format!(
                    "low {} above high {} at {}",
                    candle.low, candle.high, candle.start
                ),
            ));
        }
        let in_range = |price: f64| {
            price + PRICE_EPSILON >= candle.low && price <= candle.high + PRICE_EPSILON
        };
        if !in_range(candle.open) || !in_range(candle.close) {
            return Err(DataError::malformed_series(
                ticker,
                format!("open/close outside low-high range at {}", candle.start),
            ));
        }
    }

    for pair in candles.windows(2) {
        if pair[1].start <= pair[0].start {
            return Err(DataError::malformed_series(
                ticker,
                format!("non-increasing timestamps at {}", pair[1].start),
            ));
        }
    }

    Ok(())
}

/// Index of the first candle starting at or after `entry_time`.
pub fn entry_index(candles: &[Candle], entry_time: DateTime<Utc>) -> Option<usize> {
    candles.iter().position(|candle| candle.start >= entry_time)
}
