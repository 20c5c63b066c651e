//! The `buy-item` command: buy a listed BasicNft at its listed price.

use alloy::primitives::U256;
use anyhow::{bail, Result};
use tracing::debug;

use super::CommandContext;
use crate::engine::blocks;
use crate::engine::marketplace::{MarketEvent, MarketplaceClient, MarketplaceError};
use crate::output::formatter;

/// Token bought when `--token-id` is not given.
pub const DEFAULT_TOKEN_ID: u64 = 3;

pub async fn run(network: Option<&str>, token_id: U256) -> Result<()> {
    debug!(%token_id, "starting buy-item command");

    let ctx = CommandContext::load(network)?;
    let client = ctx.connect()?;
    let market = ctx.marketplace(&client)?;

    buy_item(&market, token_id).await?;
    blocks::move_blocks_if_local(&client, blocks::SCRIPT_BLOCKS, blocks::SCRIPT_SLEEP).await?;

    debug!("buy-item command complete");
    Ok(())
}

/// Read the listing and pay exactly its price.
pub async fn buy_item<M: MarketplaceClient>(market: &M, token_id: U256) -> Result<Vec<MarketEvent>> {
    let nft_address = market.nft_address();
    let listing = market.get_listing(nft_address, token_id).await?;
    if !listing.is_listed() {
        bail!(MarketplaceError::NotListed {
            nft_address,
            token_id,
        });
    }

    formatter::print_info(&format!(
        "Buying nft at {nft_address} token Id {token_id} for {}....",
        listing.price
    ));
    let events = market.buy_item(nft_address, token_id, listing.price).await?;
    formatter::print_info("Item bought!");

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::mint_and_list::mint_and_list;
    use crate::engine::local::{LocalChain, USER};

    #[tokio::test]
    async fn buys_at_listed_price() {
        let chain = LocalChain::new();
        let price = U256::from(1_000u64);
        let token_id = mint_and_list(&chain, price).await.unwrap();

        let buyer = chain.connect(USER);
        let events = buy_item(&buyer, token_id).await.unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name(), "ItemSold");
        assert_eq!(chain.owner_of(token_id).await.unwrap(), USER);
        assert_eq!(chain.get_proceeds(chain.caller()).await.unwrap(), price);
    }

    #[tokio::test]
    async fn unlisted_token_is_reported_as_not_listed() {
        let chain = LocalChain::new();

        let err = buy_item(&chain, U256::from(DEFAULT_TOKEN_ID)).await.unwrap_err();
        assert_eq!(
            MarketplaceError::from_anyhow(&err).map(|e| e.to_string()),
            Some("NftMarketplace__NftNotListed".to_string())
        );
    }
}
