//! Marketplace listing lifecycle.
//!
//! A listing moves through a small state machine keyed by
//! `(nft_address, token_id)`:
//!
//!   Unlisted → Listed → Sold (terminal for the listing)
//!   Listed → Cancelled (terminal for the listing)
//!   Listed → Listed (price update)
//!
//! Proceeds accumulate per seller on every sale and are paid out on
//! withdrawal. [`ListingBook`] is the pure state machine; token ownership and
//! approvals are read through the [`Erc721`] trait. Callers drive either the
//! deployed contract or the in-process local chain through
//! [`MarketplaceClient`]; both report reverts as [`MarketplaceError`].

use std::collections::HashMap;

use alloy::primitives::{Address, U256};
use anyhow::Result;
use thiserror::Error;
use tracing::debug;

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// An active listing. Absent listings read back as [`Listing::NONE`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Listing {
    pub price: U256,
    pub seller: Address,
}

impl Listing {
    pub const NONE: Listing = Listing {
        price: U256::ZERO,
        seller: Address::ZERO,
    };

    /// A listing is active while its price is non-zero.
    pub fn is_listed(&self) -> bool {
        !self.price.is_zero()
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reverts raised by the ERC-721 collection.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("ERC721: invalid token ID")]
    InvalidTokenId { token_id: U256 },

    #[error("ERC721: approve caller is not token owner or approved for all")]
    NotTokenOwner,

    #[error("ERC721: caller is not token owner or approved")]
    NotApproved,

    #[error("no ERC721 contract at {address}")]
    NoContract { address: Address },
}

/// Marketplace reverts. `Display` yields the contract's custom error name,
/// which callers and tests match verbatim.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum MarketplaceError {
    #[error("NftMarketplace__PriceNotMet")]
    PriceNotMet {
        nft_address: Address,
        token_id: U256,
        price: U256,
    },

    #[error("NftMarketplace__NftNotListed")]
    NotListed { nft_address: Address, token_id: U256 },

    #[error("NftMarketplace__NftAlreadyListed")]
    AlreadyListed { nft_address: Address, token_id: U256 },

    #[error("NftMarketplace__NoProceeds")]
    NoProceeds,

    #[error("NftMarketplace__NotOwner")]
    NotOwner,

    #[error("NftMarketplace__NotApprovedForMarketplace")]
    NotApprovedForMarketplace,

    #[error("NftMarketplace__PriceMustBeGreaterThanZero")]
    PriceMustBeGreaterThanZero,

    #[error("NftMarketplace__TransferFailed")]
    TransferFailed,

    #[error(transparent)]
    Token(#[from] TokenError),
}

impl MarketplaceError {
    /// Recover the revert identifier from an arbitrary error chain.
    pub fn from_anyhow(err: &anyhow::Error) -> Option<&MarketplaceError> {
        err.chain().find_map(|cause| cause.downcast_ref::<MarketplaceError>())
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Events emitted by the marketplace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarketEvent {
    ItemListed {
        seller: Address,
        nft_address: Address,
        token_id: U256,
        price: U256,
    },
    ItemSold {
        buyer: Address,
        nft_address: Address,
        token_id: U256,
        price: U256,
    },
    ItemCancelled {
        seller: Address,
        nft_address: Address,
        token_id: U256,
    },
}

impl MarketEvent {
    /// The Solidity event name.
    pub fn name(&self) -> &'static str {
        match self {
            MarketEvent::ItemListed { .. } => "ItemListed",
            MarketEvent::ItemSold { .. } => "ItemSold",
            MarketEvent::ItemCancelled { .. } => "ItemCancelled",
        }
    }
}

/// Outcome of a successful purchase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Purchase {
    pub event: MarketEvent,
    pub seller: Address,
    /// Amount credited to the seller's proceeds.
    pub price: U256,
    /// Overpayment returned to the buyer.
    pub refund: U256,
}

// ---------------------------------------------------------------------------
// ERC-721 view
// ---------------------------------------------------------------------------

/// The slice of ERC-721 the marketplace relies on.
pub trait Erc721 {
    fn owner_of(&self, token_id: U256) -> Result<Address, TokenError>;

    fn get_approved(&self, token_id: U256) -> Result<Address, TokenError>;

    /// Move `token_id` from `from` to `to` on behalf of `operator`.
    fn transfer_from(
        &mut self,
        operator: Address,
        from: Address,
        to: Address,
        token_id: U256,
    ) -> Result<(), TokenError>;
}

// ---------------------------------------------------------------------------
// ListingBook
// ---------------------------------------------------------------------------

/// Listings and proceeds of one marketplace deployment.
#[derive(Clone, Debug, Default)]
pub struct ListingBook {
    address: Address,
    listings: HashMap<(Address, U256), Listing>,
    proceeds: HashMap<Address, U256>,
}

impl ListingBook {
    /// A book for the marketplace deployed at `address`. Listing requires the
    /// token to be approved for this address.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// List `token_id` at `price`.
    ///
    /// Checked in order: not already listed, caller owns the token, price is
    /// positive, marketplace is approved.
    pub fn list_item<T: Erc721>(
        &mut self,
        nft: &T,
        caller: Address,
        nft_address: Address,
        token_id: U256,
        price: U256,
    ) -> Result<MarketEvent, MarketplaceError> {
        if self.get_listing(nft_address, token_id).is_listed() {
            return Err(MarketplaceError::AlreadyListed {
                nft_address,
                token_id,
            });
        }
        ensure_owner(nft, caller, token_id)?;
        if price.is_zero() {
            return Err(MarketplaceError::PriceMustBeGreaterThanZero);
        }
        if nft.get_approved(token_id)? != self.address {
            return Err(MarketplaceError::NotApprovedForMarketplace);
        }

        self.listings.insert(
            (nft_address, token_id),
            Listing {
                price,
                seller: caller,
            },
        );
        debug!(%nft_address, %token_id, %price, seller = %caller, "item listed");

        Ok(MarketEvent::ItemListed {
            seller: caller,
            nft_address,
            token_id,
            price,
        })
    }

    /// Buy a listed token with `value` attached.
    ///
    /// The seller is credited exactly the listed price; any excess is
    /// returned in [`Purchase::refund`]. The token moves from seller to buyer
    /// before any book-keeping, so a failed transfer leaves the book
    /// untouched.
    pub fn buy_item<T: Erc721>(
        &mut self,
        nft: &mut T,
        buyer: Address,
        nft_address: Address,
        token_id: U256,
        value: U256,
    ) -> Result<Purchase, MarketplaceError> {
        let listing = self.get_listing(nft_address, token_id);
        if !listing.is_listed() {
            return Err(MarketplaceError::NotListed {
                nft_address,
                token_id,
            });
        }
        if value < listing.price {
            return Err(MarketplaceError::PriceNotMet {
                nft_address,
                token_id,
                price: listing.price,
            });
        }

        nft.transfer_from(self.address, listing.seller, buyer, token_id)?;

        self.listings.remove(&(nft_address, token_id));
        *self.proceeds.entry(listing.seller).or_default() += listing.price;
        debug!(%nft_address, %token_id, %buyer, price = %listing.price, "item sold");

        Ok(Purchase {
            event: MarketEvent::ItemSold {
                buyer,
                nft_address,
                token_id,
                price: listing.price,
            },
            seller: listing.seller,
            price: listing.price,
            refund: value - listing.price,
        })
    }

    /// Remove a listing. Caller must own the token; the listing must exist.
    pub fn cancel_listing<T: Erc721>(
        &mut self,
        nft: &T,
        caller: Address,
        nft_address: Address,
        token_id: U256,
    ) -> Result<MarketEvent, MarketplaceError> {
        ensure_owner(nft, caller, token_id)?;
        self.ensure_listed(nft_address, token_id)?;

        self.listings.remove(&(nft_address, token_id));
        debug!(%nft_address, %token_id, seller = %caller, "listing cancelled");

        Ok(MarketEvent::ItemCancelled {
            seller: caller,
            nft_address,
            token_id,
        })
    }

    /// Change the price of an active listing. Emits `ItemListed` again.
    pub fn update_listing<T: Erc721>(
        &mut self,
        nft: &T,
        caller: Address,
        nft_address: Address,
        token_id: U256,
        new_price: U256,
    ) -> Result<MarketEvent, MarketplaceError> {
        self.ensure_listed(nft_address, token_id)?;
        ensure_owner(nft, caller, token_id)?;
        if new_price.is_zero() {
            return Err(MarketplaceError::PriceMustBeGreaterThanZero);
        }

        if let Some(listing) = self.listings.get_mut(&(nft_address, token_id)) {
            listing.price = new_price;
        }
        debug!(%nft_address, %token_id, %new_price, "listing updated");

        Ok(MarketEvent::ItemListed {
            seller: caller,
            nft_address,
            token_id,
            price: new_price,
        })
    }

    /// Zero the caller's proceeds and return the amount to pay out.
    pub fn withdraw_proceeds(&mut self, caller: Address) -> Result<U256, MarketplaceError> {
        let amount = self.get_proceeds(caller);
        if amount.is_zero() {
            return Err(MarketplaceError::NoProceeds);
        }
        self.proceeds.insert(caller, U256::ZERO);
        debug!(seller = %caller, %amount, "proceeds withdrawn");
        Ok(amount)
    }

    pub fn get_listing(&self, nft_address: Address, token_id: U256) -> Listing {
        self.listings
            .get(&(nft_address, token_id))
            .copied()
            .unwrap_or(Listing::NONE)
    }

    pub fn get_proceeds(&self, seller: Address) -> U256 {
        self.proceeds.get(&seller).copied().unwrap_or_default()
    }

    fn ensure_listed(&self, nft_address: Address, token_id: U256) -> Result<(), MarketplaceError> {
        if self.get_listing(nft_address, token_id).is_listed() {
            Ok(())
        } else {
            Err(MarketplaceError::NotListed {
                nft_address,
                token_id,
            })
        }
    }
}

fn ensure_owner<T: Erc721>(nft: &T, caller: Address, token_id: U256) -> Result<(), MarketplaceError> {
    if nft.owner_of(token_id)? == caller {
        Ok(())
    } else {
        Err(MarketplaceError::NotOwner)
    }
}

// ---------------------------------------------------------------------------
// Client seam
// ---------------------------------------------------------------------------

/// Contract calls made by the scripts, acting as a single account.
///
/// Implemented by the deployed contracts ([`crate::engine::onchain`]) and the
/// in-process local chain ([`crate::engine::local`]). Mutating calls resolve
/// once the transaction is mined and return the marketplace events it
/// emitted. Reverts surface as [`MarketplaceError`] inside the
/// `anyhow::Error`.
#[allow(async_fn_in_trait)]
pub trait MarketplaceClient {
    /// The account calls are made from.
    fn caller(&self) -> Address;

    fn marketplace_address(&self) -> Address;

    /// The BasicNft collection.
    fn nft_address(&self) -> Address;

    /// Mint the next BasicNft token to the caller, returning its id.
    async fn mint_nft(&self) -> Result<U256>;

    async fn approve(&self, to: Address, token_id: U256) -> Result<()>;

    async fn owner_of(&self, token_id: U256) -> Result<Address>;

    async fn list_item(
        &self,
        nft_address: Address,
        token_id: U256,
        price: U256,
    ) -> Result<Vec<MarketEvent>>;

    async fn buy_item(
        &self,
        nft_address: Address,
        token_id: U256,
        value: U256,
    ) -> Result<Vec<MarketEvent>>;

    async fn cancel_listing(&self, nft_address: Address, token_id: U256)
        -> Result<Vec<MarketEvent>>;

    async fn update_listing(
        &self,
        nft_address: Address,
        token_id: U256,
        new_price: U256,
    ) -> Result<Vec<MarketEvent>>;

    async fn withdraw_proceeds(&self) -> Result<()>;

    async fn get_listing(&self, nft_address: Address, token_id: U256) -> Result<Listing>;

    async fn get_proceeds(&self, seller: Address) -> Result<U256>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const MARKET: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
    const NFT: Address = address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512");
    const SELLER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    const BUYER: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");

    /// One-token collection with a settable approval.
    struct SingleToken {
        owner: Address,
        approved: Address,
    }

    impl Erc721 for SingleToken {
        fn owner_of(&self, token_id: U256) -> Result<Address, TokenError> {
            if token_id.is_zero() {
                Ok(self.owner)
            } else {
                Err(TokenError::InvalidTokenId { token_id })
            }
        }

        fn get_approved(&self, token_id: U256) -> Result<Address, TokenError> {
            self.owner_of(token_id)?;
            Ok(self.approved)
        }

        fn transfer_from(
            &mut self,
            operator: Address,
            from: Address,
            to: Address,
            token_id: U256,
        ) -> Result<(), TokenError> {
            if self.owner_of(token_id)? != from {
                return Err(TokenError::NotApproved);
            }
            if operator != self.owner && operator != self.approved {
                return Err(TokenError::NotApproved);
            }
            self.owner = to;
            self.approved = Address::ZERO;
            Ok(())
        }
    }

    fn approved_token() -> SingleToken {
        SingleToken {
            owner: SELLER,
            approved: MARKET,
        }
    }

    fn price() -> U256 {
        U256::from(100_000_000_000_000_000u128)
    }

    #[test]
    fn list_then_read_back() {
        let token = approved_token();
        let mut book = ListingBook::new(MARKET);

        let event = book
            .list_item(&token, SELLER, NFT, U256::ZERO, price())
            .unwrap();
        assert_eq!(event.name(), "ItemListed");
        assert_eq!(
            book.get_listing(NFT, U256::ZERO),
            Listing {
                price: price(),
                seller: SELLER
            }
        );
    }

    #[test]
    fn already_listed_is_checked_before_ownership() {
        let token = approved_token();
        let mut book = ListingBook::new(MARKET);
        book.list_item(&token, SELLER, NFT, U256::ZERO, price())
            .unwrap();

        let err = book
            .list_item(&token, BUYER, NFT, U256::ZERO, price())
            .unwrap_err();
        assert_eq!(err.to_string(), "NftMarketplace__NftAlreadyListed");
    }

    #[test]
    fn zero_price_is_rejected_after_ownership() {
        let token = approved_token();
        let mut book = ListingBook::new(MARKET);

        let err = book
            .list_item(&token, BUYER, NFT, U256::ZERO, U256::ZERO)
            .unwrap_err();
        assert_eq!(err, MarketplaceError::NotOwner);

        let err = book
            .list_item(&token, SELLER, NFT, U256::ZERO, U256::ZERO)
            .unwrap_err();
        assert_eq!(err, MarketplaceError::PriceMustBeGreaterThanZero);
    }

    #[test]
    fn nonexistent_token_surfaces_token_error() {
        let token = approved_token();
        let mut book = ListingBook::new(MARKET);

        let err = book
            .list_item(&token, SELLER, NFT, U256::from(9u64), price())
            .unwrap_err();
        assert_eq!(err.to_string(), "ERC721: invalid token ID");
    }

    #[test]
    fn overpayment_is_refunded_not_credited() {
        let mut token = approved_token();
        let mut book = ListingBook::new(MARKET);
        book.list_item(&token, SELLER, NFT, U256::ZERO, price())
            .unwrap();

        let paid = price() * U256::from(3u64);
        let purchase = book
            .buy_item(&mut token, BUYER, NFT, U256::ZERO, paid)
            .unwrap();

        assert_eq!(purchase.price, price());
        assert_eq!(purchase.refund, price() * U256::from(2u64));
        assert_eq!(book.get_proceeds(SELLER), price());
        assert_eq!(token.owner, BUYER);
    }

    #[test]
    fn revoked_approval_fails_purchase_without_side_effects() {
        let mut token = approved_token();
        let mut book = ListingBook::new(MARKET);
        book.list_item(&token, SELLER, NFT, U256::ZERO, price())
            .unwrap();
        token.approved = Address::ZERO;

        let err = book
            .buy_item(&mut token, BUYER, NFT, U256::ZERO, price())
            .unwrap_err();
        assert_eq!(err, MarketplaceError::Token(TokenError::NotApproved));
        assert!(book.get_listing(NFT, U256::ZERO).is_listed());
        assert!(book.get_proceeds(SELLER).is_zero());
    }

    #[test]
    fn update_checks_listing_before_owner() {
        let token = approved_token();
        let mut book = ListingBook::new(MARKET);

        let err = book
            .update_listing(&token, BUYER, NFT, U256::ZERO, price())
            .unwrap_err();
        assert_eq!(err.to_string(), "NftMarketplace__NftNotListed");
    }

    #[test]
    fn cancel_checks_owner_before_listing() {
        let token = approved_token();
        let mut book = ListingBook::new(MARKET);

        let err = book
            .cancel_listing(&token, BUYER, NFT, U256::ZERO)
            .unwrap_err();
        assert_eq!(err.to_string(), "NftMarketplace__NotOwner");
    }

    #[test]
    fn update_to_zero_price_is_rejected() {
        let token = approved_token();
        let mut book = ListingBook::new(MARKET);
        book.list_item(&token, SELLER, NFT, U256::ZERO, price())
            .unwrap();

        let err = book
            .update_listing(&token, SELLER, NFT, U256::ZERO, U256::ZERO)
            .unwrap_err();
        assert_eq!(err, MarketplaceError::PriceMustBeGreaterThanZero);
        assert_eq!(book.get_listing(NFT, U256::ZERO).price, price());
    }

    #[test]
    fn withdraw_twice_fails_second_time() {
        let mut token = approved_token();
        let mut book = ListingBook::new(MARKET);
        book.list_item(&token, SELLER, NFT, U256::ZERO, price())
            .unwrap();
        book.buy_item(&mut token, BUYER, NFT, U256::ZERO, price())
            .unwrap();

        assert_eq!(book.withdraw_proceeds(SELLER).unwrap(), price());
        assert_eq!(
            book.withdraw_proceeds(SELLER).unwrap_err(),
            MarketplaceError::NoProceeds
        );
    }

    #[test]
    fn from_anyhow_finds_wrapped_revert() {
        let err = anyhow::Error::new(MarketplaceError::NotOwner).context("listItem failed");
        assert_eq!(
            MarketplaceError::from_anyhow(&err),
            Some(&MarketplaceError::NotOwner)
        );
    }
}
