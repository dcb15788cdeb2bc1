//! Backtest report rendering: a CSV of trade rows plus a JSON summary
//! with the run configuration echoed in, both timestamped under the
//! reports directory.

use crate::backtester::{BacktestReport, BacktestSummary};
use crate::config::BacktestConfig;
use crate::models::TradeRecord;
use anyhow::{Context, Result};
use chrono::Utc;
use log::info;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub struct ReportSink {
    dir: PathBuf,
}

#[derive(Debug)]
pub struct ReportPaths {
    pub trades_csv: PathBuf,
    pub summary_json: PathBuf,
}

#[derive(Serialize)]
struct SummaryDocument<'a> {
    generated_at: String,
    config: &'a BacktestConfig,
    summary: &'a BacktestSummary,
}

impl ReportSink {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Writes both report files. Row order is the orchestrator's record
    /// order, so repeated runs over identical inputs produce identical
    /// files (modulo the timestamped names).
    pub fn write(&self, report: &BacktestReport, config: &BacktestConfig) -> Result<ReportPaths> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create report dir {}", self.dir.display()))?;

        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let trades_csv = self.dir.join(format!("backtest_trades_{}.csv", stamp));
        let summary_json = self.dir.join(format!("backtest_summary_{}.json", stamp));

        self.write_trades_csv(&trades_csv, &report.records)?;
        self.write_summary_json(&summary_json, &report.summary, config)?;

        info!(
            "Reports written: {} and {}",
            trades_csv.display(),
            summary_json.display()
        );
        Ok(ReportPaths {
            trades_csv,
            summary_json,
        })
    }

    fn write_trades_csv(&self, path: &Path, records: &[TradeRecord]) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        writer.write_record([
            "ticker",
            "day",
            "sentiment",
            "entry_time",
            "entry_price",
            "exit_time",
            "exit_price",
            "exit_reason",
            "quantity",
            "pnl",
            "holding_minutes",
        ])?;

        for record in records {
            writer.write_record([
                record.ticker.clone(),
                record.day.to_string(),
                format!("{:.4}", record.sentiment),
                record.entry_time.to_rfc3339(),
                optional_price(record.entry_price),
                record.exit_time.to_rfc3339(),
                optional_price(record.exit_price),
                record.exit_reason.as_str().to_string(),
                record.quantity.to_string(),
                record
                    .pnl
                    .map(|pnl| format!("{:.2}", pnl))
                    .unwrap_or_default(),
                record.holding_minutes.to_string(),
            ])?;
        }
        writer.flush().context("failed to flush trade CSV")?;
        Ok(())
    }

    fn write_summary_json(
        &self,
        path: &Path,
        summary: &BacktestSummary,
        config: &BacktestConfig,
    ) -> Result<()> {
        let document = SummaryDocument {
            generated_at: Utc::now().to_rfc3339(),
            config,
            summary,
        };
        let json =
            serde_json::to_string_pretty(&document).context("failed to serialize summary")?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

fn optional_price(value: Option<f64>) -> String {
    value.map(|price| format!("{:.4}", price)).unwrap_or_default()
}

/// Logs the headline numbers the way the interactive reporter prints them.
pub fn log_summary(summary: &BacktestSummary) {
    info!(
        "Days evaluated: {} ({} with qualifiers)",
        summary.days_evaluated, summary.days_with_qualifiers
    );
    info!(
        "Trades: {} total, {} resolved, {} NO_DATA",
        summary.total_trades, summary.resolved_trades, summary.exit_reasons.no_data
    );
    match summary.win_rate {
        Some(rate) => info!("Win rate: {:.1}% ({} wins)", rate * 100.0, summary.wins),
        None => info!("Win rate: n/a (no resolved trades)"),
    }
    info!("Total P&L: ${:.2}", summary.total_pnl);
    if let Some(avg) = summary.average_holding_minutes {
        info!("Average holding: {:.1} minutes", avg);
    }
    info!(
        "Exits: {} take-profit, {} stop-loss, {} time-expiry",
        summary.exit_reasons.take_profit,
        summary.exit_reasons.stop_loss,
        summary.exit_reasons.time_expiry
    );
    if let Some(best) = &summary.best_trade {
        if let Some(pnl) = best.pnl {
            info!("Best trade: {} on {} (${:.2})", best.ticker, best.day, pnl);
        }
    }
    if let Some(worst) = &summary.worst_trade {
        if let Some(pnl) = worst.pnl {
            info!("Worst trade: {} on {} (${:.2})", worst.ticker, worst.day, pnl);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtester;
    use crate::config::{BracketMode, BracketSpec, SentimentBounds};
    use crate::models::ExitReason;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn sample_report() -> BacktestReport {
        let entry_time = Utc.with_ymd_and_hms(2024, 8, 5, 13, 30, 0).unwrap();
        let records = vec![
            TradeRecord {
                ticker: "NVDA".to_string(),
                day: entry_time.date_naive(),
                sentiment: 0.41,
                entry_time,
                entry_price: Some(100.0),
                exit_time: entry_time + chrono::Duration::minutes(40),
                exit_price: Some(100.5),
                exit_reason: ExitReason::TakeProfit,
                quantity: 10,
                pnl: Some(5.0),
                holding_minutes: 40,
            },
            TradeRecord {
                ticker: "AAPL".to_string(),
                day: entry_time.date_naive(),
                sentiment: 0.2,
                entry_time,
                entry_price: None,
                exit_time: entry_time,
                exit_price: None,
                exit_reason: ExitReason::NoData,
                quantity: 0,
                pnl: None,
                holding_minutes: 0,
            },
        ];
        let summary = backtester::summarize(&records, 1, 1);
        BacktestReport { records, summary }
    }

    fn sample_config(dir: &Path) -> BacktestConfig {
        BacktestConfig {
            start: NaiveDate::from_ymd_opt(2024, 8, 5).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 8, 5).unwrap(),
            bracket: BracketSpec {
                mode: BracketMode::Dollar,
                take_profit: 0.5,
                stop_loss: 1.5,
            },
            sentiment: SentimentBounds { min: 0.0, max: 0.7 },
            max_holding_minutes: 390,
            allocation_per_ticker: 10_000.0,
            universe_file: PathBuf::from("technology_tickers.csv"),
            report_dir: dir.to_path_buf(),
        }
    }

    #[test]
    fn writes_csv_and_json_reports() {
        let dir = std::env::temp_dir().join(format!("report-test-{}", std::process::id()));
        let report = sample_report();
        let config = sample_config(&dir);

        let paths = ReportSink::new(&dir).write(&report, &config).unwrap();
        let csv_text = fs::read_to_string(&paths.trades_csv).unwrap();
        let json_text = fs::read_to_string(&paths.summary_json).unwrap();
        fs::remove_dir_all(&dir).ok();

        assert!(csv_text.starts_with("ticker,day,sentiment"));
        assert!(csv_text.contains("NVDA"));
        assert!(csv_text.contains("TAKE_PROFIT"));
        // NO_DATA rows carry empty price and pnl cells.
        assert!(csv_text.contains("NO_DATA,0,,0"));

        let parsed: serde_json::Value = serde_json::from_str(&json_text).unwrap();
        assert_eq!(parsed["summary"]["total_trades"], 2);
        assert_eq!(parsed["summary"]["resolved_trades"], 1);
        assert_eq!(parsed["config"]["bracket"]["mode"], "dollar");
    }
}
