use anyhow::Result;
use tracing::debug;

use crate::chain::client::ChainClient;
use crate::chain::signer::TransactionSigner;
use crate::config;
use crate::config::env::EnvSettings;
use crate::config::store::Network;
use crate::engine::deployments::DeploymentStore;
use crate::engine::onchain::OnChainMarketplace;

pub mod buy_item;
pub mod cancel_item;
pub mod deploy;
pub mod listing;
pub mod mine;
pub mod mint_and_list;
pub mod update_item;
pub mod withdraw;

/// Shared setup for commands that talk to a network.
///
/// Encapsulates the repeated pattern of merging `.env`, loading config,
/// selecting the network and picking the signer.
pub struct CommandContext {
    pub cfg: config::store::Config,
    pub network: Network,
    pub env: EnvSettings,
    pub signer: TransactionSigner,
}

impl CommandContext {
    /// Load everything for `network` (or the configured default).
    pub fn load(network: Option<&str>) -> Result<Self> {
        let dir = config::store::project_dir()?;
        config::env::load_dotenv(&dir)?;

        let cfg = config::store::load_from(&dir)?;
        let name = network.unwrap_or(&cfg.default_network).to_string();
        let network = cfg.network(&name)?;
        let env = EnvSettings::from_env();
        let signer = TransactionSigner::for_network(&network, &env)?;

        debug!(
            network = %network.name,
            chain_id = network.chain_id,
            sender = %signer.address(),
            "command context loaded"
        );

        Ok(Self {
            cfg,
            network,
            env,
            signer,
        })
    }

    /// Signing client for the selected network.
    pub fn connect(&self) -> Result<ChainClient> {
        ChainClient::with_signer(&self.network.rpc_url, &self.signer)
    }

    /// Deployment records of the selected network.
    pub fn store(&self) -> DeploymentStore {
        DeploymentStore::new(self.cfg.deployments_dir(&self.network.name))
    }

    /// The deployed marketplace, acting as the signer.
    pub fn marketplace(&self, client: &ChainClient) -> Result<OnChainMarketplace> {
        OnChainMarketplace::from_deployments(client, &self.store(), self.network.block_confirmations)
    }
}
