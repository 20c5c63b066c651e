//! The `withdraw-proceeds` command: pay the caller's accumulated sale
//! proceeds out of the marketplace.

use alloy::primitives::U256;
use anyhow::Result;
use tracing::debug;

use super::CommandContext;
use crate::chain::types::Eth;
use crate::engine::marketplace::MarketplaceClient;
use crate::output::formatter;

pub async fn run(network: Option<&str>) -> Result<()> {
    debug!("starting withdraw-proceeds command");

    let ctx = CommandContext::load(network)?;
    let client = ctx.connect()?;
    let market = ctx.marketplace(&client)?;

    let amount = withdraw_proceeds(&market).await?;

    debug!(%amount, "withdraw-proceeds command complete");
    Ok(())
}

/// Withdraw everything owed to the caller. Returns the amount paid out.
pub async fn withdraw_proceeds<M: MarketplaceClient>(market: &M) -> Result<U256> {
    let amount = market.get_proceeds(market.caller()).await?;
    formatter::print_info(&format!("Withdrawing {} of proceeds...", Eth(amount)));

    market.withdraw_proceeds().await?;
    formatter::print_success(&format!("Withdrew {}.", Eth(amount)));
    Ok(amount)
}
