//! The `listing` command: show a token's listing and the caller's proceeds.

use alloy::primitives::U256;
use anyhow::Result;
use tracing::debug;

use super::CommandContext;
use crate::engine::marketplace::{Listing, MarketplaceClient};
use crate::output::formatter;

pub async fn run(network: Option<&str>, token_id: U256) -> Result<()> {
    debug!(%token_id, "starting listing command");

    let ctx = CommandContext::load(network)?;
    let client = ctx.connect()?;
    let market = ctx.marketplace(&client)?;

    let (listing, proceeds) = show_listing(&market, token_id).await?;
    formatter::print_listing(market.nft_address(), token_id, &listing);
    formatter::print_proceeds(market.caller(), proceeds);

    Ok(())
}

/// The listing of `token_id` and the caller's proceeds.
pub async fn show_listing<M: MarketplaceClient>(
    market: &M,
    token_id: U256,
) -> Result<(Listing, U256)> {
    let listing = market.get_listing(market.nft_address(), token_id).await?;
    let proceeds = market.get_proceeds(market.caller()).await?;
    Ok((listing, proceeds))
}
