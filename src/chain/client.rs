//! JSON-RPC chain client.
//!
//! Thin wrapper around an alloy provider. With a signer attached the provider
//! fills nonce, gas and chain id and signs locally, so the node does not need
//! unlocked accounts. Also exposes the `evm_mine` administrative call
//! supported by Hardhat and anvil.

use std::time::Duration;

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use anyhow::{bail, Context, Result};
use tracing::debug;

use crate::chain::signer::TransactionSigner;
use crate::engine::blocks::BlockMiner;

/// Per-request HTTP timeout.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// ChainClient
// ---------------------------------------------------------------------------

/// Result of a mined contract creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeployReceipt {
    pub address: Address,
    pub transaction_hash: B256,
    pub block_number: u64,
}

/// Client for one network endpoint, optionally signing as one account.
#[derive(Clone)]
pub struct ChainClient {
    provider: DynProvider,
    rpc_url: String,
    sender: Option<Address>,
}

impl ChainClient {
    /// Read-only client. No network call is made during construction; use
    /// [`ChainClient::is_connected`] to verify reachability.
    pub fn new(rpc_url: &str) -> Result<Self> {
        debug!(rpc_url, "creating read-only chain client");

        let (http_client, url) = http_transport(rpc_url)?;
        let provider = ProviderBuilder::default()
            .connect_reqwest(http_client, url)
            .erased();

        Ok(Self {
            provider,
            rpc_url: rpc_url.to_string(),
            sender: None,
        })
    }

    /// Client that signs transactions with `signer`.
    pub fn with_signer(rpc_url: &str, signer: &TransactionSigner) -> Result<Self> {
        debug!(rpc_url, sender = %signer.address(), "creating signing chain client");

        let (http_client, url) = http_transport(rpc_url)?;
        let wallet = EthereumWallet::from(signer.inner().clone());
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect_reqwest(http_client, url)
            .erased();

        Ok(Self {
            provider,
            rpc_url: rpc_url.to_string(),
            sender: Some(signer.address()),
        })
    }

    /// The underlying provider, for contract bindings.
    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    /// The signing account.
    pub fn sender(&self) -> Result<Address> {
        self.sender
            .context("chain client has no signer; transactions cannot be sent")
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    pub async fn get_chain_id(&self) -> Result<u64> {
        let chain_id = self
            .provider
            .get_chain_id()
            .await
            .with_context(|| format!("unable to read chain id from {}", self.rpc_url))?;
        debug!(chain_id, "chain id retrieved");
        Ok(chain_id)
    }

    pub async fn get_block_number(&self) -> Result<u64> {
        let block_number = self
            .provider
            .get_block_number()
            .await
            .with_context(|| format!("unable to reach the node at {}", self.rpc_url))?;
        debug!(block_number, "block number retrieved");
        Ok(block_number)
    }

    /// `true` when the node answers a block number request.
    pub async fn is_connected(&self) -> bool {
        let connected = self.get_block_number().await.is_ok();
        debug!(rpc_url = %self.rpc_url, connected, "connectivity check");
        connected
    }

    /// Send a contract creation transaction and wait for `confirmations`.
    pub async fn deploy_code(&self, code: Bytes, confirmations: u64) -> Result<DeployReceipt> {
        let from = self.sender()?;
        let tx = TransactionRequest::default()
            .with_from(from)
            .with_deploy_code(code);

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .context("failed to submit deployment transaction")?;
        let transaction_hash = *pending.tx_hash();
        debug!(%transaction_hash, confirmations, "deployment submitted");

        let receipt = pending
            .with_required_confirmations(confirmations.max(1))
            .get_receipt()
            .await
            .with_context(|| format!("failed waiting for deployment {transaction_hash}"))?;

        if !receipt.status() {
            bail!("deployment transaction {transaction_hash} reverted");
        }

        let address = receipt
            .contract_address
            .context("deployment receipt has no contract address")?;

        Ok(DeployReceipt {
            address,
            transaction_hash,
            block_number: receipt.block_number.unwrap_or_default(),
        })
    }
}

impl BlockMiner for ChainClient {
    async fn chain_id(&self) -> Result<u64> {
        self.get_chain_id().await
    }

    async fn mine_block(&self) -> Result<()> {
        self.provider
            .raw_request::<_, serde_json::Value>("evm_mine".into(), serde_json::json!([]))
            .await
            .context("evm_mine request failed; is this a local development node?")?;
        Ok(())
    }
}

fn http_transport(rpc_url: &str) -> Result<(reqwest::Client, reqwest::Url)> {
    let url: reqwest::Url = rpc_url
        .parse()
        .with_context(|| format!("invalid rpc url: {rpc_url}"))?;

    let http_client = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("failed to build HTTP client for chain provider")?;

    Ok((http_client, url))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_with_valid_url() {
        let client = ChainClient::new("http://127.0.0.1:8545").unwrap();
        assert_eq!(client.rpc_url(), "http://127.0.0.1:8545");
        assert!(client.sender().is_err());
    }

    #[test]
    fn new_with_invalid_url() {
        let err = ChainClient::new("not a url").err().unwrap();
        assert!(err.to_string().contains("invalid rpc url"));
    }

    #[test]
    fn signing_client_reports_sender() {
        let signer = TransactionSigner::dev_account(0).unwrap();
        let client = ChainClient::with_signer("http://127.0.0.1:8545", &signer).unwrap();
        assert_eq!(client.sender().unwrap(), signer.address());
    }

    #[tokio::test]
    async fn unreachable_node_is_not_connected() {
        let client = ChainClient::new("http://127.0.0.1:1").unwrap();
        assert!(!client.is_connected().await);
    }
}
