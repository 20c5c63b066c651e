//! The `cancel-item` command: remove the caller's listing.

use alloy::primitives::U256;
use anyhow::Result;
use tracing::debug;

use super::CommandContext;
use crate::engine::blocks;
use crate::engine::marketplace::{MarketEvent, MarketplaceClient};
use crate::output::formatter;

/// Token cancelled when `--token-id` is not given.
pub const DEFAULT_TOKEN_ID: u64 = 5;

pub async fn run(network: Option<&str>, token_id: U256) -> Result<()> {
    debug!(%token_id, "starting cancel-item command");

    let ctx = CommandContext::load(network)?;
    let client = ctx.connect()?;
    let market = ctx.marketplace(&client)?;

    cancel_item(&market, token_id).await?;
    blocks::move_blocks_if_local(&client, blocks::SCRIPT_BLOCKS, blocks::SCRIPT_SLEEP).await?;

    debug!("cancel-item command complete");
    Ok(())
}

pub async fn cancel_item<M: MarketplaceClient>(
    market: &M,
    token_id: U256,
) -> Result<Vec<MarketEvent>> {
    let nft_address = market.nft_address();
    formatter::print_info(&format!(
        "Deleting list for {nft_address} token Id {token_id}...."
    ));
    let events = market.cancel_listing(nft_address, token_id).await?;
    formatter::print_info("Listing cancelled!");
    Ok(events)
}
