use crate::context::AppContext;
use anyhow::Result;
use log::info;

/// Liquidates every open position and cancels all open orders.
pub async fn run(context: &AppContext) -> Result<()> {
    let broker = context.broker_client()?;
    let closed = broker.close_all_positions().await?;
    if closed.is_empty() {
        info!("No positions to close");
    } else {
        info!("Closed {} position(s): {}", closed.len(), closed.join(", "));
    }
    Ok(())
}
