//! The `mint-and-list` command: mint a BasicNft, approve the marketplace and
//! list the token.

use alloy::primitives::U256;
use anyhow::Result;
use tracing::debug;

use super::CommandContext;
use crate::chain::types::Eth;
use crate::engine::blocks;
use crate::engine::marketplace::MarketplaceClient;
use crate::output::formatter;

/// Listing price when `--price` is not given.
pub const DEFAULT_PRICE: &str = "0.1";

pub async fn run(network: Option<&str>, price: Eth) -> Result<()> {
    debug!(%price, "starting mint-and-list command");

    let ctx = CommandContext::load(network)?;
    let client = ctx.connect()?;
    let market = ctx.marketplace(&client)?;

    let token_id = mint_and_list(&market, price.wei()).await?;
    blocks::move_blocks_if_local(&client, blocks::SCRIPT_BLOCKS, blocks::SCRIPT_SLEEP).await?;

    debug!(%token_id, "mint-and-list command complete");
    Ok(())
}

/// Mint, approve and list at `price`. Returns the new token id.
pub async fn mint_and_list<M: MarketplaceClient>(market: &M, price: U256) -> Result<U256> {
    formatter::print_info("Minting BasicNft....");
    let token_id = market.mint_nft().await?;
    formatter::print_info(&format!("Nft minted with token id {token_id}!"));

    formatter::print_info("Approving Nft...");
    market.approve(market.marketplace_address(), token_id).await?;
    formatter::print_info("Nft approved!");

    formatter::print_info("Listing nft on market place...");
    market.list_item(market.nft_address(), token_id, price).await?;
    formatter::print_info("Nft listed");

    Ok(token_id)
}
