//! End-to-end tests against a live local node.
//!
//! **All tests are `#[ignore]` by default** because they require a running
//! anvil (or `hardhat node`) and, for the deploy flow, compiled artifacts.
//!
//! Run with:
//!   cargo test --test e2e_anvil -- --ignored --test-threads=1
//!
//! Requires:
//!   anvil running on localhost:8545
//!   NFTMARKET_E2E_ARTIFACTS pointing at a Hardhat `artifacts/` directory
//!   containing NftMarketplace and BasicNft (for `e2e_deploy_and_trade`)

use std::path::PathBuf;
use std::time::Duration;

use alloy::primitives::U256;

use nftmarket::chain::client::ChainClient;
use nftmarket::chain::signer::TransactionSigner;
use nftmarket::chain::types::Eth;
use nftmarket::commands::buy_item::buy_item;
use nftmarket::commands::mint_and_list::mint_and_list;
use nftmarket::commands::withdraw::withdraw_proceeds;
use nftmarket::config::store::{Network, LOCAL_CHAIN_ID};
use nftmarket::engine::blocks::{self, BlockMiner};
use nftmarket::engine::deploy::DeployRunner;
use nftmarket::engine::deployments::DeploymentStore;
use nftmarket::engine::marketplace::{MarketplaceClient, MarketplaceError};
use nftmarket::engine::onchain::OnChainMarketplace;
use nftmarket::engine::verify::EtherscanVerifier;

const ANVIL_RPC: &str = "http://127.0.0.1:8545";

fn anvil_network() -> Network {
    Network {
        name: "localhost".to_string(),
        chain_id: LOCAL_CHAIN_ID,
        rpc_url: ANVIL_RPC.to_string(),
        block_confirmations: 1,
        is_development: true,
    }
}

#[tokio::test]
#[ignore]
async fn e2e_mine_advances_blocks() {
    let client = ChainClient::new(ANVIL_RPC).unwrap();
    assert!(client.is_connected().await, "anvil is not running on {ANVIL_RPC}");
    assert_eq!(client.chain_id().await.unwrap(), LOCAL_CHAIN_ID);

    let before = client.get_block_number().await.unwrap();
    let mined = blocks::move_blocks_if_local(&client, 2, Duration::from_millis(10))
        .await
        .unwrap();
    assert!(mined);
    assert!(client.get_block_number().await.unwrap() >= before + 2);
}

#[tokio::test]
#[ignore]
async fn e2e_deploy_and_trade() {
    let artifacts = PathBuf::from(
        std::env::var("NFTMARKET_E2E_ARTIFACTS").expect("NFTMARKET_E2E_ARTIFACTS not set"),
    );
    let tmp = tempfile::tempdir().unwrap();
    let network = anvil_network();

    let deployer_signer = TransactionSigner::dev_account(0).unwrap();
    let user_signer = TransactionSigner::dev_account(1).unwrap();
    let deployer = ChainClient::with_signer(ANVIL_RPC, &deployer_signer).unwrap();
    let user = ChainClient::with_signer(ANVIL_RPC, &user_signer).unwrap();

    let store = DeploymentStore::new(tmp.path().join("localhost"));
    let runner =
        DeployRunner::<_, EtherscanVerifier>::new(&deployer, &network, artifacts, store.clone());
    let report = runner.run(&["all".to_string()]).await.unwrap();
    assert_eq!(report.deployed.len(), 2);

    let seller = OnChainMarketplace::from_deployments(&deployer, &store, 1).unwrap();
    let buyer = OnChainMarketplace::from_deployments(&user, &store, 1).unwrap();

    let price = Eth::parse("0.1").unwrap().wei();
    let token_id = mint_and_list(&seller, price).await.unwrap();
    assert_eq!(token_id, U256::ZERO);

    let err = seller
        .list_item(seller.nft_address(), token_id, price)
        .await
        .unwrap_err();
    assert!(matches!(
        MarketplaceError::from_anyhow(&err),
        Some(MarketplaceError::AlreadyListed { .. })
    ));

    let events = buy_item(&buyer, token_id).await.unwrap();
    assert_eq!(events[0].name(), "ItemSold");
    assert_eq!(seller.owner_of(token_id).await.unwrap(), user_signer.address());

    assert_eq!(withdraw_proceeds(&seller).await.unwrap(), price);
    assert!(seller
        .get_proceeds(deployer_signer.address())
        .await
        .unwrap()
        .is_zero());
}
