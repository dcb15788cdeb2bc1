use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use news_trader::backtester;
use news_trader::config::{
    BacktestConfig, BracketMode, BracketSpec, SentimentBounds,
};
use news_trader::error::DataError;
use news_trader::market_data::CandleSource;
use news_trader::models::{market_open_utc, Candle, ExitReason};
use news_trader::news::{NewsArticle, NewsSource};
use std::path::PathBuf;

/// Positive headlines for AAA and BBB and CCC every weekday; nothing for
/// anyone else.
struct FakeNews;

#[async_trait]
impl NewsSource for FakeNews {
    async fn daily_articles(
        &self,
        ticker: &str,
        day: NaiveDate,
    ) -> Result<Vec<NewsArticle>, DataError> {
        let headline = match ticker {
            "AAA" => "Shares surge on strong profit growth",
            "BBB" => "Solid gains and upbeat guidance",
            "CCC" => "Record momentum and robust demand",
            _ => return Ok(Vec::new()),
        };
        Ok(vec![NewsArticle {
            published: Utc.from_utc_datetime(&day.and_hms_opt(12, 0, 0).unwrap()),
            headline: headline.to_string(),
            summary: String::new(),
            source: "test".to_string(),
        }])
    }
}

/// AAA rises through the take-profit, BBB stays flat until the series
/// runs out, CCC returns a deliberately unordered series.
struct FakeCandles;

fn candle(day: NaiveDate, minute: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
    Candle {
        start: market_open_utc(day) + Duration::minutes(minute),
        open,
        high,
        low,
        close,
        volume: 2_000,
    }
}

#[async_trait]
impl CandleSource for FakeCandles {
    async fn day_candles(&self, ticker: &str, day: NaiveDate) -> Result<Vec<Candle>, DataError> {
        let series = match ticker {
            "AAA" => (0..30)
                .map(|step| {
                    let price = 100.0 + 0.05 * step as f64;
                    candle(day, step * 2, price, price + 0.03, price - 0.03, price + 0.02)
                })
                .collect(),
            "BBB" => (0..10)
                .map(|step| candle(day, step * 2, 50.0, 50.1, 49.9, 49.95))
                .collect(),
            "CCC" => vec![
                candle(day, 4, 10.0, 10.1, 9.9, 10.0),
                candle(day, 0, 10.0, 10.1, 9.9, 10.0),
            ],
            _ => Vec::new(),
        };
        Ok(series)
    }
}

fn config() -> BacktestConfig {
    BacktestConfig {
        // Mon 2024-08-05 through Mon 2024-08-12, spanning one weekend.
        start: NaiveDate::from_ymd_opt(2024, 8, 5).unwrap(),
        end: NaiveDate::from_ymd_opt(2024, 8, 12).unwrap(),
        bracket: BracketSpec {
            mode: BracketMode::Dollar,
            take_profit: 0.5,
            stop_loss: 1.5,
        },
        sentiment: SentimentBounds { min: 0.0, max: 1.0 },
        max_holding_minutes: 390,
        allocation_per_ticker: 1_000.0,
        universe_file: PathBuf::from("unused.csv"),
        report_dir: PathBuf::from("unused"),
    }
}

fn universe() -> Vec<String> {
    vec!["AAA".to_string(), "BBB".to_string(), "CCC".to_string()]
}

#[tokio::test]
async fn full_run_isolates_failures_and_stays_ordered() -> Result<()> {
    let outcome = backtester::run(&FakeNews, &FakeCandles, &universe(), &config()).await?;

    // 6 weekdays in the range, 3 qualifiers each.
    assert_eq!(outcome.summary.days_evaluated, 6);
    assert_eq!(outcome.summary.days_with_qualifiers, 6);
    assert_eq!(outcome.records.len(), 18);

    // Universe order within each day, days in calendar order.
    let first_day: Vec<&str> = outcome.records[..3]
        .iter()
        .map(|record| record.ticker.as_str())
        .collect();
    assert_eq!(first_day, vec!["AAA", "BBB", "CCC"]);
    let mut previous = outcome.records[0].day;
    for record in &outcome.records {
        assert!(record.day >= previous);
        previous = record.day;
    }

    for record in &outcome.records {
        match record.ticker.as_str() {
            // Entry 100.0, TP 100.5, first high >= 100.5 at step 10
            // (price 100.50 + 0.03); exits at the exact level.
            "AAA" => {
                assert_eq!(record.exit_reason, ExitReason::TakeProfit);
                assert_eq!(record.entry_price, Some(100.0));
                assert_eq!(record.exit_price, Some(100.5));
                assert_eq!(record.quantity, 10);
                assert_eq!(record.pnl, Some(5.0));
            }
            // Flat series ends before the deadline: forced exit at the
            // last close.
            "BBB" => {
                assert_eq!(record.exit_reason, ExitReason::TimeExpiry);
                assert_eq!(record.exit_price, Some(49.95));
                assert_eq!(record.holding_minutes, 18);
            }
            // Unordered series degrades to NO_DATA without aborting the
            // day or the run.
            "CCC" => {
                assert_eq!(record.exit_reason, ExitReason::NoData);
                assert!(record.pnl.is_none());
            }
            other => panic!("unexpected ticker {}", other),
        }
    }

    // NO_DATA is excluded from the win-rate denominator.
    assert_eq!(outcome.summary.resolved_trades, 12);
    assert_eq!(outcome.summary.wins, 6);
    assert_eq!(outcome.summary.win_rate, Some(0.5));
    assert_eq!(outcome.summary.exit_reasons.no_data, 6);

    Ok(())
}

#[tokio::test]
async fn repeated_runs_are_bit_identical() -> Result<()> {
    let first = backtester::run(&FakeNews, &FakeCandles, &universe(), &config()).await?;
    let second = backtester::run(&FakeNews, &FakeCandles, &universe(), &config()).await?;

    assert_eq!(first.records, second.records);
    assert_eq!(
        serde_json::to_value(&first.summary)?,
        serde_json::to_value(&second.summary)?
    );
    Ok(())
}

#[tokio::test]
async fn weekend_days_are_skipped() -> Result<()> {
    let mut weekend_config = config();
    weekend_config.start = NaiveDate::from_ymd_opt(2024, 8, 10).unwrap(); // Saturday
    weekend_config.end = NaiveDate::from_ymd_opt(2024, 8, 11).unwrap(); // Sunday

    let outcome =
        backtester::run(&FakeNews, &FakeCandles, &universe(), &weekend_config).await?;
    assert_eq!(outcome.summary.days_evaluated, 0);
    assert!(outcome.records.is_empty());
    Ok(())
}

#[tokio::test]
async fn invalid_config_is_fatal_before_any_fetch() {
    let mut bad = config();
    bad.bracket.take_profit = -1.0;
    let result = backtester::run(&FakeNews, &FakeCandles, &universe(), &bad).await;
    assert!(result.is_err());
}
