//! Candle-replay trade simulation.
//!
//! Given a sentiment-qualified entry signal and an ordered candle series,
//! reconstructs a plausible fill sequence: entry at the first candle at or
//! after the requested entry time, then a chronological scan for the first
//! take-profit or stop-loss crossing, with a forced exit once the holding
//! deadline passes. Produces exactly one immutable `TradeRecord` per
//! signal and never fails the surrounding run: malformed input degrades to
//! a `NO_DATA` record.

use crate::models::{Candle, EntrySignal, ExitReason, TradeRecord};
use crate::series;
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};

/// Resolution of the ambiguous candle whose range spans both thresholds.
///
/// The open-to-close direction decides which level the price plausibly
/// visited first within the bar: a down candle is assumed to have traded
/// the low before the high, so the stop-loss wins; an up candle the
/// reverse. A doji (open == close) resolves to the stop-loss: ambiguous
/// data never credits the trade with the optimistic outcome.
fn resolve_same_candle(candle: &Candle) -> ExitReason {
    if candle.close > candle.open {
        ExitReason::TakeProfit
    } else {
        ExitReason::StopLoss
    }
}

/// Simulates one trade. Infallible by contract: every outcome, including
/// missing or malformed data, is expressed as a `TradeRecord`.
pub fn simulate(signal: &EntrySignal, candles: &[Candle]) -> TradeRecord {
    if let Err(err) = series::validate_series(&signal.ticker, candles) {
        warn!("{}; skipping trade on {}", err, signal.day);
        return TradeRecord::no_data(signal);
    }

    let Some(entry_idx) = series::entry_index(candles, signal.entry_time) else {
        debug!(
            "No candle at or after {} for {}; recording NO_DATA",
            signal.entry_time, signal.ticker
        );
        return TradeRecord::no_data(signal);
    };

    let entry_price = candles[entry_idx].open;
    if entry_price <= 0.0 {
        warn!(
            "Non-positive entry price for {} on {}; recording NO_DATA",
            signal.ticker, signal.day
        );
        return TradeRecord::no_data(signal);
    }

    let deadline = signal.entry_time + Duration::minutes(signal.max_holding_minutes);
    let mut last_seen = &candles[entry_idx];

    for candle in &candles[entry_idx..] {
        // Deadline check comes first: a candle opening past the deadline
        // can no longer produce a threshold exit.
        if candle.start > deadline {
            return finish(signal, entry_price, deadline, candle.open, ExitReason::TimeExpiry);
        }

        let stop_hit = candle.low <= signal.stop_loss;
        let profit_hit = candle.high >= signal.take_profit;

        match (profit_hit, stop_hit) {
            (true, true) => {
                let reason = resolve_same_candle(candle);
                let exit_price = match reason {
                    ExitReason::TakeProfit => signal.take_profit,
                    _ => signal.stop_loss,
                };
                return finish(signal, entry_price, candle.start, exit_price, reason);
            }
            (true, false) => {
                return finish(
                    signal,
                    entry_price,
                    candle.start,
                    signal.take_profit,
                    ExitReason::TakeProfit,
                );
            }
            (false, true) => {
                return finish(
                    signal,
                    entry_price,
                    candle.start,
                    signal.stop_loss,
                    ExitReason::StopLoss,
                );
            }
            (false, false) => {}
        }

        last_seen = candle;
    }

    // Series exhausted with no threshold hit and the deadline not yet
    // reached: forced exit at the last known close.
    finish(
        signal,
        entry_price,
        last_seen.start.min(deadline),
        last_seen.close,
        ExitReason::TimeExpiry,
    )
}

fn finish(
    signal: &EntrySignal,
    entry_price: f64,
    exit_time: DateTime<Utc>,
    exit_price: f64,
    exit_reason: ExitReason,
) -> TradeRecord {
    let pnl = (exit_price - entry_price) * signal.quantity as f64;
    let holding_minutes = (exit_time - signal.entry_time).num_minutes();

    TradeRecord {
        ticker: signal.ticker.clone(),
        day: signal.day,
        sentiment: signal.sentiment,
        entry_time: signal.entry_time,
        entry_price: Some(entry_price),
        exit_time,
        exit_price: Some(exit_price),
        exit_reason,
        quantity: signal.quantity,
        pnl: Some(pnl),
        holding_minutes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 5, 13, 30, 0).unwrap()
    }

    fn signal(take_profit: f64, stop_loss: f64, max_holding_minutes: i64) -> EntrySignal {
        EntrySignal {
            ticker: "NVDA".to_string(),
            day: entry_time().date_naive(),
            entry_time: entry_time(),
            sentiment: 0.35,
            take_profit,
            stop_loss,
            max_holding_minutes,
            quantity: 1,
        }
    }

    fn candle(minute: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            start: entry_time() + Duration::minutes(minute),
            open,
            high,
            low,
            close,
            volume: 5_000,
        }
    }

    /// Steady rise to 106 by minute 40, never below 99.
    fn rising_series() -> Vec<Candle> {
        (0..=20)
            .map(|step| {
                let minute = step * 2;
                let price = 100.0 + 0.3 * step as f64;
                candle(minute, price, price + 0.2, price - 0.2, price + 0.15)
            })
            .collect()
    }

    #[test]
    fn take_profit_exit_at_threshold_level() {
        let record = simulate(&signal(105.0, 97.0, 60), &rising_series());

        assert_eq!(record.exit_reason, ExitReason::TakeProfit);
        assert_eq!(record.entry_price, Some(100.0));
        assert_eq!(record.exit_price, Some(105.0));
        assert_eq!(record.holding_minutes, 34);
        assert_eq!(record.pnl, Some(5.0));
    }

    #[test]
    fn down_candle_spanning_both_levels_resolves_to_stop_loss() {
        let mut candles = vec![candle(0, 100.0, 101.0, 99.5, 100.5)];
        candles.push(candle(10, 101.0, 105.5, 96.5, 99.0)); // closed down
        let record = simulate(&signal(105.0, 97.0, 60), &candles);

        assert_eq!(record.exit_reason, ExitReason::StopLoss);
        assert_eq!(record.exit_price, Some(97.0));
        assert_eq!(record.holding_minutes, 10);
        assert_eq!(record.pnl, Some(-3.0));
    }

    #[test]
    fn up_candle_spanning_both_levels_resolves_to_take_profit() {
        let candles = vec![
            candle(0, 100.0, 101.0, 99.5, 100.5),
            candle(10, 99.0, 105.5, 96.5, 103.0),
        ];
        let record = simulate(&signal(105.0, 97.0, 60), &candles);

        assert_eq!(record.exit_reason, ExitReason::TakeProfit);
        assert_eq!(record.exit_price, Some(105.0));
    }

    #[test]
    fn doji_spanning_both_levels_takes_the_conservative_exit() {
        let candles = vec![candle(0, 101.0, 105.5, 96.5, 101.0)];
        let record = simulate(&signal(105.0, 97.0, 60), &candles);

        assert_eq!(record.exit_reason, ExitReason::StopLoss);
        assert_eq!(record.exit_price, Some(97.0));
    }

    #[test]
    fn expires_at_deadline_when_no_threshold_hit() {
        // Flat series spanning two hours; levels never touched.
        let candles: Vec<Candle> = (0..=60)
            .map(|step| candle(step * 2, 100.0, 100.4, 99.6, 100.1))
            .collect();
        let record = simulate(&signal(105.0, 97.0, 60), &candles);

        assert_eq!(record.exit_reason, ExitReason::TimeExpiry);
        // First candle past the deadline opens at 100.0; exit is clocked
        // at the deadline itself.
        assert_eq!(record.exit_price, Some(100.0));
        assert_eq!(record.holding_minutes, 60);
        assert_eq!(record.exit_time, entry_time() + Duration::minutes(60));
    }

    #[test]
    fn expires_at_last_close_when_series_runs_out_early() {
        let candles = vec![
            candle(0, 100.0, 100.5, 99.5, 100.2),
            candle(2, 100.2, 100.6, 99.8, 100.4),
        ];
        let record = simulate(&signal(105.0, 97.0, 60), &candles);

        assert_eq!(record.exit_reason, ExitReason::TimeExpiry);
        assert_eq!(record.exit_price, Some(100.4));
        assert_eq!(record.exit_time, entry_time() + Duration::minutes(2));
        assert_eq!(record.holding_minutes, 2);
    }

    #[test]
    fn no_candles_at_or_after_entry_yields_no_data() {
        let record = simulate(&signal(105.0, 97.0, 60), &[]);
        assert_eq!(record.exit_reason, ExitReason::NoData);
        assert!(record.pnl.is_none());

        let before_entry = vec![candle(-10, 100.0, 101.0, 99.0, 100.5)];
        let record = simulate(&signal(105.0, 97.0, 60), &before_entry);
        assert_eq!(record.exit_reason, ExitReason::NoData);
    }

    #[test]
    fn malformed_series_degrades_to_no_data() {
        let unordered = vec![
            candle(4, 100.0, 101.0, 99.0, 100.5),
            candle(0, 100.0, 101.0, 99.0, 100.5),
        ];
        let record = simulate(&signal(105.0, 97.0, 60), &unordered);
        assert_eq!(record.exit_reason, ExitReason::NoData);

        let inverted = vec![candle(0, 100.0, 98.0, 102.0, 100.0)];
        let record = simulate(&signal(105.0, 97.0, 60), &inverted);
        assert_eq!(record.exit_reason, ExitReason::NoData);
    }

    #[test]
    fn simulation_is_idempotent() {
        let candles = rising_series();
        let sig = signal(105.0, 97.0, 60);
        let first = simulate(&sig, &candles);
        let second = simulate(&sig, &candles);
        assert_eq!(first, second);
    }

    #[test]
    fn exit_never_precedes_entry() {
        for candles in [rising_series(), vec![candle(0, 101.0, 105.5, 96.5, 101.0)]] {
            let record = simulate(&signal(105.0, 97.0, 60), &candles);
            assert!(record.exit_time >= record.entry_time);
            assert!(record.holding_minutes >= 0);
        }
    }

    #[test]
    fn quantity_scales_dollar_pnl() {
        let mut sig = signal(105.0, 97.0, 60);
        sig.quantity = 12;
        let record = simulate(&sig, &rising_series());
        assert_eq!(record.pnl, Some(60.0));
    }
}
