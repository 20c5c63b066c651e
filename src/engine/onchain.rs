//! Marketplace client backed by deployed contracts.
//!
//! Every mutating call is sent from the client's signer and awaited for the
//! network's block confirmations. Custom-error reverts are decoded back into
//! [`MarketplaceError`], and `require` strings from the ERC-721 collection
//! into [`TokenError`].

use alloy::network::Ethereum;
use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, PendingTransactionBuilder};
use alloy::rpc::types::TransactionReceipt;
use alloy::sol_types::Revert;
use anyhow::{anyhow, bail, Context, Result};
use tracing::debug;

use crate::chain::client::ChainClient;
use crate::chain::contracts::NftMarketplace::NftMarketplaceErrors;
use crate::chain::contracts::{names, BasicNft, NftMarketplace};
use crate::engine::deployments::DeploymentStore;
use crate::engine::marketplace::{
    Listing, MarketEvent, MarketplaceClient, MarketplaceError, TokenError,
};

impl From<NftMarketplaceErrors> for MarketplaceError {
    fn from(err: NftMarketplaceErrors) -> Self {
        match err {
            NftMarketplaceErrors::NftMarketplace__PriceNotMet(e) => MarketplaceError::PriceNotMet {
                nft_address: e.nftAddress,
                token_id: e.tokenId,
                price: e.price,
            },
            NftMarketplaceErrors::NftMarketplace__NftNotListed(e) => MarketplaceError::NotListed {
                nft_address: e.nftAddress,
                token_id: e.tokenId,
            },
            NftMarketplaceErrors::NftMarketplace__NftAlreadyListed(e) => {
                MarketplaceError::AlreadyListed {
                    nft_address: e.nftAddress,
                    token_id: e.tokenId,
                }
            }
            NftMarketplaceErrors::NftMarketplace__NoProceeds(_) => MarketplaceError::NoProceeds,
            NftMarketplaceErrors::NftMarketplace__NotOwner(_) => MarketplaceError::NotOwner,
            NftMarketplaceErrors::NftMarketplace__NotApprovedForMarketplace(_) => {
                MarketplaceError::NotApprovedForMarketplace
            }
            NftMarketplaceErrors::NftMarketplace__PriceMustBeGreaterThanZero(_) => {
                MarketplaceError::PriceMustBeGreaterThanZero
            }
            NftMarketplaceErrors::NftMarketplace__TransferFailed(_) => {
                MarketplaceError::TransferFailed
            }
        }
    }
}

/// Map an OpenZeppelin ERC-721 `require` message.
fn token_error(reason: &str, token_id: U256) -> Option<TokenError> {
    match reason {
        "ERC721: invalid token ID" => Some(TokenError::InvalidTokenId { token_id }),
        "ERC721: approve caller is not token owner or approved for all" => {
            Some(TokenError::NotTokenOwner)
        }
        "ERC721: caller is not token owner or approved" => Some(TokenError::NotApproved),
        _ => None,
    }
}

/// Turn a contract call failure into the matching revert error if possible.
fn call_error(err: alloy::contract::Error, action: &str, token_id: U256) -> anyhow::Error {
    if let Some(decoded) = err.as_decoded_interface_error::<NftMarketplaceErrors>() {
        let revert = MarketplaceError::from(decoded);
        debug!(action, %revert, "marketplace reverted");
        return anyhow::Error::new(revert).context(format!("{action} reverted"));
    }
    if let Some(Revert { reason }) = err.as_decoded_error::<Revert>() {
        debug!(action, %reason, "call reverted with reason");
        return match token_error(&reason, token_id) {
            Some(token) => anyhow::Error::new(MarketplaceError::Token(token))
                .context(format!("{action} reverted")),
            None => anyhow!("{action} reverted: {reason}"),
        };
    }
    anyhow::Error::new(err).context(format!("{action} failed"))
}

/// Marketplace and BasicNft as deployed on a live node.
pub struct OnChainMarketplace {
    caller: Address,
    marketplace: NftMarketplace::NftMarketplaceInstance<DynProvider>,
    nft: BasicNft::BasicNftInstance<DynProvider>,
    confirmations: u64,
}

impl OnChainMarketplace {
    pub fn new(
        provider: DynProvider,
        caller: Address,
        marketplace: Address,
        nft: Address,
        confirmations: u64,
    ) -> Self {
        Self {
            caller,
            marketplace: NftMarketplace::new(marketplace, provider.clone()),
            nft: BasicNft::new(nft, provider),
            confirmations: confirmations.max(1),
        }
    }

    /// Resolve both contracts from the deployment records of the client's
    /// network. The client must carry a signer.
    pub fn from_deployments(
        client: &ChainClient,
        store: &DeploymentStore,
        confirmations: u64,
    ) -> Result<Self> {
        let caller = client.sender()?;
        let marketplace = store.address_of(names::NFT_MARKETPLACE)?;
        let nft = store.address_of(names::BASIC_NFT)?;
        debug!(%marketplace, %nft, %caller, "using deployed contracts");

        Ok(Self::new(
            client.provider().clone(),
            caller,
            marketplace,
            nft,
            confirmations,
        ))
    }

    async fn confirm(
        &self,
        pending: PendingTransactionBuilder<Ethereum>,
        action: &str,
    ) -> Result<TransactionReceipt> {
        let tx_hash = *pending.tx_hash();
        debug!(action, %tx_hash, "transaction submitted");

        let receipt = pending
            .with_required_confirmations(self.confirmations)
            .get_receipt()
            .await
            .with_context(|| format!("failed waiting for {action} transaction {tx_hash}"))?;

        if !receipt.status() {
            bail!("{action} transaction {tx_hash} reverted");
        }
        Ok(receipt)
    }

    /// Marketplace events in `receipt`, in log order.
    fn market_events(&self, receipt: &TransactionReceipt) -> Vec<MarketEvent> {
        let market = *self.marketplace.address();
        receipt
            .inner
            .logs()
            .iter()
            .filter(|log| log.inner.address == market)
            .filter_map(|log| {
                if let Ok(e) = log.log_decode::<NftMarketplace::ItemListed>() {
                    let e = e.inner.data;
                    Some(MarketEvent::ItemListed {
                        seller: e.seller,
                        nft_address: e.nftAddress,
                        token_id: e.tokenId,
                        price: e.price,
                    })
                } else if let Ok(e) = log.log_decode::<NftMarketplace::ItemSold>() {
                    let e = e.inner.data;
                    Some(MarketEvent::ItemSold {
                        buyer: e.buyer,
                        nft_address: e.nftAddress,
                        token_id: e.tokenId,
                        price: e.price,
                    })
                } else if let Ok(e) = log.log_decode::<NftMarketplace::ItemCancelled>() {
                    let e = e.inner.data;
                    Some(MarketEvent::ItemCancelled {
                        seller: e.seller,
                        nft_address: e.nftAddress,
                        token_id: e.tokenId,
                    })
                } else {
                    None
                }
            })
            .collect()
    }
}

impl MarketplaceClient for OnChainMarketplace {
    fn caller(&self) -> Address {
        self.caller
    }

    fn marketplace_address(&self) -> Address {
        *self.marketplace.address()
    }

    fn nft_address(&self) -> Address {
        *self.nft.address()
    }

    async fn mint_nft(&self) -> Result<U256> {
        let pending = self
            .nft
            .mintNft()
            .from(self.caller)
            .send()
            .await
            .map_err(|e| call_error(e, "mintNft", U256::ZERO))?;
        let receipt = self.confirm(pending, "mintNft").await?;

        let nft = *self.nft.address();
        receipt
            .inner
            .logs()
            .iter()
            .filter(|log| log.inner.address == nft)
            .find_map(|log| log.log_decode::<BasicNft::Transfer>().ok())
            .map(|transfer| transfer.inner.data.tokenId)
            .context("mintNft receipt has no Transfer event")
    }

    async fn approve(&self, to: Address, token_id: U256) -> Result<()> {
        let pending = self
            .nft
            .approve(to, token_id)
            .from(self.caller)
            .send()
            .await
            .map_err(|e| call_error(e, "approve", token_id))?;
        self.confirm(pending, "approve").await?;
        Ok(())
    }

    async fn owner_of(&self, token_id: U256) -> Result<Address> {
        self.nft
            .ownerOf(token_id)
            .call()
            .await
            .map_err(|e| call_error(e, "ownerOf", token_id))
    }

    async fn list_item(
        &self,
        nft_address: Address,
        token_id: U256,
        price: U256,
    ) -> Result<Vec<MarketEvent>> {
        let pending = self
            .marketplace
            .listItem(nft_address, token_id, price)
            .from(self.caller)
            .send()
            .await
            .map_err(|e| call_error(e, "listItem", token_id))?;
        let receipt = self.confirm(pending, "listItem").await?;
        Ok(self.market_events(&receipt))
    }

    async fn buy_item(
        &self,
        nft_address: Address,
        token_id: U256,
        value: U256,
    ) -> Result<Vec<MarketEvent>> {
        let pending = self
            .marketplace
            .buyItem(nft_address, token_id)
            .from(self.caller)
            .value(value)
            .send()
            .await
            .map_err(|e| call_error(e, "buyItem", token_id))?;
        let receipt = self.confirm(pending, "buyItem").await?;
        Ok(self.market_events(&receipt))
    }

    async fn cancel_listing(
        &self,
        nft_address: Address,
        token_id: U256,
    ) -> Result<Vec<MarketEvent>> {
        let pending = self
            .marketplace
            .cancelListing(nft_address, token_id)
            .from(self.caller)
            .send()
            .await
            .map_err(|e| call_error(e, "cancelListing", token_id))?;
        let receipt = self.confirm(pending, "cancelListing").await?;
        Ok(self.market_events(&receipt))
    }

    async fn update_listing(
        &self,
        nft_address: Address,
        token_id: U256,
        new_price: U256,
    ) -> Result<Vec<MarketEvent>> {
        let pending = self
            .marketplace
            .updateListing(nft_address, token_id, new_price)
            .from(self.caller)
            .send()
            .await
            .map_err(|e| call_error(e, "updateListing", token_id))?;
        let receipt = self.confirm(pending, "updateListing").await?;
        Ok(self.market_events(&receipt))
    }

    async fn withdraw_proceeds(&self) -> Result<()> {
        let pending = self
            .marketplace
            .withdrawProceeds()
            .from(self.caller)
            .send()
            .await
            .map_err(|e| call_error(e, "withdrawProceeds", U256::ZERO))?;
        self.confirm(pending, "withdrawProceeds").await?;
        Ok(())
    }

    async fn get_listing(&self, nft_address: Address, token_id: U256) -> Result<Listing> {
        let listing = self
            .marketplace
            .getListing(nft_address, token_id)
            .call()
            .await
            .map_err(|e| call_error(e, "getListing", token_id))?;
        Ok(Listing {
            price: listing.price,
            seller: listing.seller,
        })
    }

    async fn get_proceeds(&self, seller: Address) -> Result<U256> {
        self.marketplace
            .getProceeds(seller)
            .call()
            .await
            .map_err(|e| call_error(e, "getProceeds", U256::ZERO))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
