//! In-process local chain.
//!
//! A simulated development chain with both contracts already deployed by the
//! deployer account, the equivalent of running the `all` deploy fixture
//! against a fresh Hardhat network. Every mutating call mines one block.
//! Handles returned by [`LocalChain::connect`] share state and act as
//! different accounts.
//!
//! Native balances are tracked without gas, so payouts can be asserted
//! exactly.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use alloy::primitives::{address, Address, U256};
use anyhow::{anyhow, bail, Result};
use tracing::debug;

use crate::config::store::LOCAL_CHAIN_ID;
use crate::engine::blocks::BlockMiner;
use crate::engine::marketplace::{
    Erc721, Listing, ListingBook, MarketEvent, MarketplaceClient, MarketplaceError, TokenError,
};

/// Dev account #0, the `deployer` named account.
pub const DEPLOYER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

/// Dev account #1, the `user` named account.
pub const USER: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");

/// Starting balance of each funded account: 10 000 ETH.
const INITIAL_BALANCE_WEI: u128 = 10_000 * 1_000_000_000_000_000_000;

// ---------------------------------------------------------------------------
// BasicNft state
// ---------------------------------------------------------------------------

/// ERC-721 state of the BasicNft collection.
#[derive(Clone, Debug, Default)]
pub struct BasicNftState {
    owners: BTreeMap<U256, Address>,
    approvals: HashMap<U256, Address>,
    token_counter: U256,
}

impl BasicNftState {
    /// Mint the next token id to `to`.
    pub fn mint(&mut self, to: Address) -> U256 {
        let token_id = self.token_counter;
        self.owners.insert(token_id, to);
        self.token_counter += U256::from(1u64);
        token_id
    }

    /// Set the approved address for `token_id`. Only the owner may approve.
    pub fn approve(&mut self, caller: Address, to: Address, token_id: U256) -> Result<(), TokenError> {
        if self.owner_of(token_id)? != caller {
            return Err(TokenError::NotTokenOwner);
        }
        self.approvals.insert(token_id, to);
        Ok(())
    }
}

impl Erc721 for BasicNftState {
    fn owner_of(&self, token_id: U256) -> Result<Address, TokenError> {
        self.owners
            .get(&token_id)
            .copied()
            .ok_or(TokenError::InvalidTokenId { token_id })
    }

    fn get_approved(&self, token_id: U256) -> Result<Address, TokenError> {
        self.owner_of(token_id)?;
        Ok(self.approvals.get(&token_id).copied().unwrap_or(Address::ZERO))
    }

    fn transfer_from(
        &mut self,
        operator: Address,
        from: Address,
        to: Address,
        token_id: U256,
    ) -> Result<(), TokenError> {
        let owner = self.owner_of(token_id)?;
        let approved = self.get_approved(token_id)?;
        if owner != from || (operator != owner && operator != approved) {
            return Err(TokenError::NotApproved);
        }
        self.owners.insert(token_id, to);
        self.approvals.remove(&token_id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Chain state
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct ChainState {
    block_number: u64,
    balances: HashMap<Address, U256>,
    nft_address: Address,
    nft: BasicNftState,
    book: ListingBook,
    events: Vec<MarketEvent>,
}

impl ChainState {
    fn balance(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    fn debit(&mut self, account: Address, amount: U256) -> Result<()> {
        let balance = self.balance(account);
        if balance < amount {
            bail!("insufficient funds for transfer: {account} has {balance} wei, needs {amount}");
        }
        self.balances.insert(account, balance - amount);
        Ok(())
    }

    fn credit(&mut self, account: Address, amount: U256) {
        *self.balances.entry(account).or_default() += amount;
    }

    fn nft_for(&self, nft_address: Address) -> Result<(), MarketplaceError> {
        if nft_address == self.nft_address {
            Ok(())
        } else {
            Err(TokenError::NoContract {
                address: nft_address,
            }
            .into())
        }
    }

    /// Commit a transaction: mine a block and record its events.
    fn mine(&mut self, events: &[MarketEvent]) {
        self.block_number += 1;
        self.events.extend_from_slice(events);
    }
}

// ---------------------------------------------------------------------------
// LocalChain
// ---------------------------------------------------------------------------

/// Handle to the shared local chain, acting as [`LocalChain::caller`].
#[derive(Clone, Debug)]
pub struct LocalChain {
    state: Arc<Mutex<ChainState>>,
    caller: Address,
}

impl Default for LocalChain {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalChain {
    /// Fresh chain with `DEPLOYER` and `USER` funded and both contracts
    /// deployed by `DEPLOYER` (NftMarketplace at nonce 0, BasicNft at 1).
    /// The returned handle acts as `DEPLOYER`.
    pub fn new() -> Self {
        let marketplace = DEPLOYER.create(0);
        let nft_address = DEPLOYER.create(1);

        let mut balances = HashMap::new();
        for account in [DEPLOYER, USER] {
            balances.insert(account, U256::from(INITIAL_BALANCE_WEI));
        }

        debug!(%marketplace, %nft_address, "local chain created");

        Self {
            state: Arc::new(Mutex::new(ChainState {
                // Two deployment blocks.
                block_number: 2,
                balances,
                nft_address,
                nft: BasicNftState::default(),
                book: ListingBook::new(marketplace),
                events: Vec::new(),
            })),
            caller: DEPLOYER,
        }
    }

    /// A handle on the same chain acting as `account`.
    pub fn connect(&self, account: Address) -> Self {
        Self {
            state: Arc::clone(&self.state),
            caller: account,
        }
    }

    pub fn balance_of(&self, account: Address) -> Result<U256> {
        Ok(self.state()?.balance(account))
    }

    pub fn block_number(&self) -> Result<u64> {
        Ok(self.state()?.block_number)
    }

    /// All marketplace events emitted so far, in order.
    pub fn events(&self) -> Result<Vec<MarketEvent>> {
        Ok(self.state()?.events.clone())
    }

    fn state(&self) -> Result<MutexGuard<'_, ChainState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("local chain state lock poisoned"))
    }
}

impl MarketplaceClient for LocalChain {
    fn caller(&self) -> Address {
        self.caller
    }

    fn marketplace_address(&self) -> Address {
        DEPLOYER.create(0)
    }

    fn nft_address(&self) -> Address {
        DEPLOYER.create(1)
    }

    async fn mint_nft(&self) -> Result<U256> {
        let mut state = self.state()?;
        let token_id = state.nft.mint(self.caller);
        state.mine(&[]);
        debug!(%token_id, owner = %self.caller, "token minted");
        Ok(token_id)
    }

    async fn approve(&self, to: Address, token_id: U256) -> Result<()> {
        let mut state = self.state()?;
        state.nft.approve(self.caller, to, token_id)?;
        state.mine(&[]);
        Ok(())
    }

    async fn owner_of(&self, token_id: U256) -> Result<Address> {
        Ok(self.state()?.nft.owner_of(token_id)?)
    }

    async fn list_item(
        &self,
        nft_address: Address,
        token_id: U256,
        price: U256,
    ) -> Result<Vec<MarketEvent>> {
        let mut state = self.state()?;
        state.nft_for(nft_address)?;

        let ChainState { nft, book, .. } = &mut *state;
        let event = book.list_item(nft, self.caller, nft_address, token_id, price)?;

        let events = vec![event];
        state.mine(&events);
        Ok(events)
    }

    async fn buy_item(
        &self,
        nft_address: Address,
        token_id: U256,
        value: U256,
    ) -> Result<Vec<MarketEvent>> {
        let mut state = self.state()?;
        state.nft_for(nft_address)?;
        state.debit(self.caller, value)?;

        let ChainState { nft, book, .. } = &mut *state;
        let purchase = match book.buy_item(nft, self.caller, nft_address, token_id, value) {
            Ok(purchase) => purchase,
            Err(err) => {
                state.credit(self.caller, value);
                return Err(err.into());
            }
        };

        let marketplace = state.book.address();
        state.credit(marketplace, purchase.price);
        state.credit(self.caller, purchase.refund);

        let events = vec![purchase.event];
        state.mine(&events);
        Ok(events)
    }

    async fn cancel_listing(
        &self,
        nft_address: Address,
        token_id: U256,
    ) -> Result<Vec<MarketEvent>> {
        let mut state = self.state()?;
        state.nft_for(nft_address)?;

        let ChainState { nft, book, .. } = &mut *state;
        let event = book.cancel_listing(nft, self.caller, nft_address, token_id)?;

        let events = vec![event];
        state.mine(&events);
        Ok(events)
    }

    async fn update_listing(
        &self,
        nft_address: Address,
        token_id: U256,
        new_price: U256,
    ) -> Result<Vec<MarketEvent>> {
        let mut state = self.state()?;
        state.nft_for(nft_address)?;

        let ChainState { nft, book, .. } = &mut *state;
        let event = book.update_listing(nft, self.caller, nft_address, token_id, new_price)?;

        let events = vec![event];
        state.mine(&events);
        Ok(events)
    }

    async fn withdraw_proceeds(&self) -> Result<()> {
        let mut state = self.state()?;
        let amount = state.book.get_proceeds(self.caller);
        if amount.is_zero() {
            return Err(MarketplaceError::NoProceeds.into());
        }

        // Proceeds stay credited when the payout cannot be made.
        let marketplace = state.book.address();
        if state.debit(marketplace, amount).is_err() {
            return Err(MarketplaceError::TransferFailed.into());
        }
        state.book.withdraw_proceeds(self.caller)?;
        state.credit(self.caller, amount);
        state.mine(&[]);
        Ok(())
    }

    async fn get_listing(&self, nft_address: Address, token_id: U256) -> Result<Listing> {
        Ok(self.state()?.book.get_listing(nft_address, token_id))
    }

    async fn get_proceeds(&self, seller: Address) -> Result<U256> {
        Ok(self.state()?.book.get_proceeds(seller))
    }
}

impl BlockMiner for LocalChain {
    async fn chain_id(&self) -> Result<u64> {
        Ok(LOCAL_CHAIN_ID)
    }

    async fn mine_block(&self) -> Result<()> {
        self.state()?.mine(&[]);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
