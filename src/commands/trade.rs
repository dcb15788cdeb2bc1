use crate::alpaca::{round_to_penny, BracketOrder};
use crate::backtester::whole_share_quantity;
use crate::config::TradeConfig;
use crate::context::AppContext;
use crate::screener;
use crate::universe;
use anyhow::{anyhow, Result};
use chrono::{Datelike, Utc, Weekday};
use futures::future::join_all;
use log::{info, warn};

/// One live paper-trading pass: screen today's universe, split the
/// available buying power across qualifiers and submit bracket orders
/// concurrently.
pub async fn run(context: &AppContext, config: &TradeConfig) -> Result<()> {
    config.validate()?;
    let today = Utc::now().date_naive();
    if matches!(today.weekday(), Weekday::Sat | Weekday::Sun) {
        warn!("Market is closed on {} ({})", today, today.weekday());
        return Ok(());
    }

    let tickers = universe::load_universe(&config.universe_file)?;
    let broker = context.broker_client()?;
    let data = context.candle_client()?;
    let news = context.news_client()?;

    let account = broker.account().await?;
    if !account.status.eq_ignore_ascii_case("active") {
        return Err(anyhow!(
            "Alpaca account is not active (status: {})",
            account.status
        ));
    }
    info!(
        "Account active: buying power ${:.2}, cash ${:.2}",
        account.buying_power, account.cash
    );

    let qualifiers = screener::screen(&news, &tickers, today, &config.sentiment).await;
    if qualifiers.is_empty() {
        info!("No tickers qualified on {}; nothing to trade", today);
        return Ok(());
    }

    let budget = account.buying_power * config.buying_power_ratio;
    let per_ticker = budget / qualifiers.len() as f64;
    info!(
        "Allocating ${:.2} across {} qualifier(s) (${:.2} each)",
        budget,
        qualifiers.len(),
        per_ticker
    );

    let mut orders = Vec::new();
    for score in &qualifiers {
        let price = match data.latest_trade_price(&score.ticker).await {
            Ok(price) => price,
            Err(err) => {
                warn!("No tradable price for {}: {}", score.ticker, err);
                continue;
            }
        };
        let quantity = whole_share_quantity(per_ticker, price);
        if quantity == 0 {
            warn!(
                "${:.2} buys zero shares of {} at ${:.2}; skipping",
                per_ticker, score.ticker, price
            );
            continue;
        }

        let (take_profit, stop_loss) = config.bracket.levels(price);
        orders.push(BracketOrder {
            ticker: score.ticker.clone(),
            quantity,
            take_profit: round_to_penny(take_profit),
            stop_loss: round_to_penny(stop_loss),
        });
    }

    if orders.is_empty() {
        info!("All qualifiers were skipped; no orders placed");
        return Ok(());
    }

    let submissions = orders
        .iter()
        .map(|order| broker.place_bracket_order(order));
    let results = join_all(submissions).await;

    let mut placed = 0usize;
    for (order, result) in orders.iter().zip(results) {
        match result {
            Ok(ack) => {
                placed += 1;
                info!(
                    "{} x{}: {} ({})",
                    order.ticker, order.quantity, ack.status, ack.order_id
                );
            }
            Err(err) => warn!("{}: order failed: {:#}", order.ticker, err),
        }
    }
    info!("Placed {}/{} bracket order(s)", placed, orders.len());
    Ok(())
}
