//! The `update-item` command: change the price of the caller's listing.

use alloy::primitives::U256;
use anyhow::Result;
use tracing::debug;

use super::CommandContext;
use crate::chain::types::Eth;
use crate::engine::blocks;
use crate::engine::marketplace::{MarketEvent, MarketplaceClient};
use crate::output::formatter;

pub async fn run(network: Option<&str>, token_id: U256, price: Eth) -> Result<()> {
    debug!(%token_id, %price, "starting update-item command");

    let ctx = CommandContext::load(network)?;
    let client = ctx.connect()?;
    let market = ctx.marketplace(&client)?;

    update_item(&market, token_id, price).await?;
    blocks::move_blocks_if_local(&client, blocks::SCRIPT_BLOCKS, blocks::SCRIPT_SLEEP).await?;

    debug!("update-item command complete");
    Ok(())
}

pub async fn update_item<M: MarketplaceClient>(
    market: &M,
    token_id: U256,
    price: Eth,
) -> Result<Vec<MarketEvent>> {
    let nft_address = market.nft_address();
    formatter::print_info(&format!(
        "Updating listing for {nft_address} token Id {token_id} to {price}...."
    ));
    let events = market.update_listing(nft_address, token_id, price.wei()).await?;
    formatter::print_info("Listing updated!");
    Ok(events)
}
