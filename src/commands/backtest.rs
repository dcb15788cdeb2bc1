use crate::backtester;
use crate::config::BacktestConfig;
use crate::context::AppContext;
use crate::report::{self, ReportSink};
use crate::universe;
use anyhow::Result;
use log::info;

pub async fn run(context: &AppContext, config: &BacktestConfig) -> Result<()> {
    config.validate()?;
    let tickers = universe::load_universe(&config.universe_file)?;
    info!(
        "Backtesting {} ticker(s) from {} to {}",
        tickers.len(),
        config.start,
        config.end
    );

    let news = context.news_client()?;
    let candles = context.candle_client()?;

    let outcome = backtester::run(&news, &candles, &tickers, config).await?;
    report::log_summary(&outcome.summary);

    let paths = ReportSink::new(&config.report_dir).write(&outcome, config)?;
    info!("Trade detail: {}", paths.trades_csv.display());
    Ok(())
}
