use crate::context::AppContext;
use anyhow::Result;
use log::{info, warn};

/// Reports configuration completeness and broker connectivity.
pub async fn run(context: &AppContext) -> Result<()> {
    let credentials = context.credentials();

    match credentials.finnhub_key() {
        Ok(_) => info!("Finnhub API key: configured"),
        Err(err) => warn!("Finnhub API key: missing ({})", err),
    }

    match credentials.alpaca_keys() {
        Ok(_) => {
            info!("Alpaca credentials: configured");
            match context.broker_client()?.account().await {
                Ok(account) => info!(
                    "Alpaca account: {} (buying power ${:.2}, equity ${:.2})",
                    account.status, account.buying_power, account.equity
                ),
                Err(err) => warn!("Alpaca account unreachable: {:#}", err),
            }
        }
        Err(err) => warn!("Alpaca credentials: missing ({})", err),
    }

    info!("Trading endpoint: {}", credentials.alpaca_trading_url);
    info!("Data endpoint: {}", credentials.alpaca_data_url);
    Ok(())
}
