//! Backtest orchestration: day loop, screening, candle replay, aggregation.
//!
//! The loop is strictly sequential and deterministic: days in calendar
//! order, qualifiers in universe order, one simulation per qualifier.
//! Per-ticker failures degrade to NO_DATA records or skips; only
//! configuration errors abort the run.

use crate::config::BacktestConfig;
use crate::market_data::CandleSource;
use crate::models::{market_open_utc, Candle, EntrySignal, ExitReason, SentimentScore, TradeRecord};
use crate::news::NewsSource;
use crate::screener;
use crate::series;
use crate::simulator;
use anyhow::Result;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use serde::Serialize;
use statrs::statistics::Statistics;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExitReasonCounts {
    pub take_profit: usize,
    pub stop_loss: usize,
    pub time_expiry: usize,
    pub no_data: usize,
}

impl ExitReasonCounts {
    fn record(&mut self, reason: ExitReason) {
        match reason {
            ExitReason::TakeProfit => self.take_profit += 1,
            ExitReason::StopLoss => self.stop_loss += 1,
            ExitReason::TimeExpiry => self.time_expiry += 1,
            ExitReason::NoData => self.no_data += 1,
        }
    }
}

/// Aggregate statistics over one backtest run. Win rate and average
/// holding are computed over resolved trades only; NO_DATA records are
/// counted but excluded from those denominators.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestSummary {
    pub days_evaluated: usize,
    pub days_with_qualifiers: usize,
    pub total_trades: usize,
    pub resolved_trades: usize,
    pub wins: usize,
    pub win_rate: Option<f64>,
    pub total_pnl: f64,
    pub average_holding_minutes: Option<f64>,
    pub exit_reasons: ExitReasonCounts,
    pub best_trade: Option<TradeRecord>,
    pub worst_trade: Option<TradeRecord>,
}

#[derive(Debug)]
pub struct BacktestReport {
    pub records: Vec<TradeRecord>,
    pub summary: BacktestSummary,
}

pub async fn run(
    news: &dyn NewsSource,
    candles: &dyn CandleSource,
    universe: &[String],
    config: &BacktestConfig,
) -> Result<BacktestReport> {
    config.validate()?;

    let total_days = (config.end - config.start).num_days() + 1;
    let progress = ProgressBar::new(total_days as u64);
    progress.set_style(ProgressStyle::with_template(
        "{bar:40.cyan/blue} {pos}/{len} days {msg}",
    )?);

    let mut records = Vec::new();
    let mut days_evaluated = 0usize;
    let mut days_with_qualifiers = 0usize;

    let mut day = config.start;
    while day <= config.end {
        progress.set_message(day.to_string());
        if is_weekend(day) {
            progress.inc(1);
            day += Duration::days(1);
            continue;
        }
        days_evaluated += 1;

        let qualifiers = screener::screen(news, universe, day, &config.sentiment).await;
        if !qualifiers.is_empty() {
            days_with_qualifiers += 1;
        }

        for score in &qualifiers {
            let day_candles = match candles.day_candles(&score.ticker, day).await {
                Ok(day_candles) => day_candles,
                Err(err) => {
                    warn!("Candle fetch failed for {} on {}: {}", score.ticker, day, err);
                    records.push(TradeRecord::no_data(&fallback_signal(score, config)));
                    continue;
                }
            };

            let Some(signal) = build_signal(score, &day_candles, config) else {
                continue;
            };
            records.push(simulator::simulate(&signal, &day_candles));
        }

        progress.inc(1);
        day += Duration::days(1);
    }
    progress.finish_and_clear();

    let summary = summarize(&records, days_evaluated, days_with_qualifiers);
    info!(
        "Backtest complete: {} trade(s) over {} trading day(s)",
        summary.total_trades, summary.days_evaluated
    );
    Ok(BacktestReport { records, summary })
}

fn is_weekend(day: NaiveDate) -> bool {
    matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Signal for a qualifier whose candles never arrived; simulating it (or
/// recording it directly) yields a NO_DATA row.
fn fallback_signal(score: &SentimentScore, config: &BacktestConfig) -> EntrySignal {
    EntrySignal {
        ticker: score.ticker.clone(),
        day: score.day,
        entry_time: market_open_utc(score.day),
        sentiment: score.compound,
        take_profit: 0.0,
        stop_loss: 0.0,
        max_holding_minutes: config.max_holding_minutes,
        quantity: 0,
    }
}

/// Derives absolute bracket levels and a whole-share quantity from the
/// entry candle's open. Returns `None` only when the allocation buys zero
/// shares; a missing entry candle still produces a signal so the
/// simulator can record the NO_DATA outcome.
fn build_signal(
    score: &SentimentScore,
    candles: &[Candle],
    config: &BacktestConfig,
) -> Option<EntrySignal> {
    let entry_time = market_open_utc(score.day);
    let Some(entry_idx) = series::entry_index(candles, entry_time) else {
        return Some(fallback_signal(score, config));
    };

    let entry_price = candles[entry_idx].open;
    if entry_price <= 0.0 {
        return Some(fallback_signal(score, config));
    }

    let quantity = whole_share_quantity(config.allocation_per_ticker, entry_price);
    if quantity == 0 {
        warn!(
            "Allocation {:.2} buys zero shares of {} at {:.2}; skipping",
            config.allocation_per_ticker, score.ticker, entry_price
        );
        return None;
    }

    let (take_profit, stop_loss) = config.bracket.levels(entry_price);
    Some(EntrySignal {
        ticker: score.ticker.clone(),
        day: score.day,
        entry_time,
        sentiment: score.compound,
        take_profit,
        stop_loss,
        max_holding_minutes: config.max_holding_minutes,
        quantity,
    })
}

/// Whole shares affordable with `allocation` dollars at `price`.
pub fn whole_share_quantity(allocation: f64, price: f64) -> i64 {
    if price <= 0.0 || allocation <= 0.0 {
        return 0;
    }
    (allocation / price).floor() as i64
}

pub fn summarize(
    records: &[TradeRecord],
    days_evaluated: usize,
    days_with_qualifiers: usize,
) -> BacktestSummary {
    let mut exit_reasons = ExitReasonCounts::default();
    let mut wins = 0usize;
    let mut resolved_trades = 0usize;
    let mut total_pnl = 0.0;
    let mut holdings: Vec<f64> = Vec::new();
    let mut best_trade: Option<TradeRecord> = None;
    let mut worst_trade: Option<TradeRecord> = None;

    for record in records {
        exit_reasons.record(record.exit_reason);
        let Some(pnl) = record.pnl else {
            continue;
        };
        resolved_trades += 1;
        total_pnl += pnl;
        holdings.push(record.holding_minutes as f64);
        if record.is_win() {
            wins += 1;
        }
        if best_trade.as_ref().and_then(|t| t.pnl).map_or(true, |p| pnl > p) {
            best_trade = Some(record.clone());
        }
        if worst_trade.as_ref().and_then(|t| t.pnl).map_or(true, |p| pnl < p) {
            worst_trade = Some(record.clone());
        }
    }

    let win_rate = (resolved_trades > 0).then(|| wins as f64 / resolved_trades as f64);
    let average_holding_minutes = (!holdings.is_empty()).then(|| holdings.clone().mean());

    BacktestSummary {
        days_evaluated,
        days_with_qualifiers,
        total_trades: records.len(),
        resolved_trades,
        wins,
        win_rate,
        total_pnl,
        average_holding_minutes,
        exit_reasons,
        best_trade,
        worst_trade,
    }
}
