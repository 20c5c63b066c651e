//! Deployment orchestration.
//!
//! Deploys the compiled Hardhat artifacts as an ordered list of tagged steps:
//!
//!   01-deploy-nftmarketplace   [all, marketplace]
//!   02-deploy-basic-nft        [all, basicnft, main]
//!   99-update-frontend         [all, frontend]
//!
//! Every run deploys fresh contracts; the newest record per network wins.
//! Verification runs only on non-development networks with an explorer API
//! key, and a failed verification does not fail the deployment.

use std::fs;
use std::path::{Path, PathBuf};

use alloy::dyn_abi::{DynSolValue, JsonAbiExt};
use alloy::json_abi::JsonAbi;
use alloy::primitives::{Address, Bytes};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::chain::client::{ChainClient, DeployReceipt};
use crate::chain::contracts::names;
use crate::config::env::EnvSettings;
use crate::config::store::Network;
use crate::engine::deployments::{Deployment, DeploymentStore};
use crate::engine::frontend::FrontendSync;
use crate::engine::verify::{SourceVerifier, VerifyOutcome};
use crate::output::formatter;

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

/// A Hardhat compilation artifact.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub contract_name: String,
    pub source_name: String,
    pub abi: JsonAbi,
    pub bytecode: Bytes,
    /// Where the artifact was read from.
    #[serde(skip)]
    pub path: PathBuf,
}

impl Artifact {
    /// `artifacts/contracts/<Name>.sol/<Name>.json`
    pub fn path_for(artifacts_dir: &Path, name: &str) -> PathBuf {
        artifacts_dir
            .join("contracts")
            .join(format!("{name}.sol"))
            .join(format!("{name}.json"))
    }

    pub fn load(artifacts_dir: &Path, name: &str) -> Result<Self> {
        let path = Self::path_for(artifacts_dir, name);
        debug!(path = %path.display(), "loading artifact");

        let contents = fs::read_to_string(&path).with_context(|| {
            format!(
                "failed to read artifact for {name} at {} (compile the contracts first)",
                path.display()
            )
        })?;
        let mut artifact: Artifact = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse artifact: {}", path.display()))?;
        artifact.path = path;
        Ok(artifact)
    }

    /// ABI-encode constructor arguments. Empty when there are none.
    pub fn encode_constructor_args(&self, args: &[DynSolValue]) -> Result<Bytes> {
        match self.abi.constructor() {
            Some(constructor) => {
                let encoded = constructor.abi_encode_input(args).with_context(|| {
                    format!("invalid constructor arguments for {}", self.contract_name)
                })?;
                Ok(Bytes::from(encoded))
            }
            None if args.is_empty() => Ok(Bytes::new()),
            None => bail!(
                "{} has no constructor but {} arguments were given",
                self.contract_name,
                args.len()
            ),
        }
    }

    /// Creation bytecode followed by the encoded constructor arguments.
    pub fn creation_code(&self, encoded_args: &Bytes) -> Result<Bytes> {
        if self.bytecode.is_empty() {
            bail!(
                "{} has no bytecode (abstract contract or interface?)",
                self.contract_name
            );
        }
        let mut code = self.bytecode.to_vec();
        code.extend_from_slice(encoded_args);
        Ok(Bytes::from(code))
    }
}

// ---------------------------------------------------------------------------
// Deployer seam
// ---------------------------------------------------------------------------

/// Submits contract creation transactions.
#[allow(async_fn_in_trait)]
pub trait ContractDeployer {
    /// The `deployer` account.
    fn deployer(&self) -> Result<Address>;

    async fn chain_id(&self) -> Result<u64>;

    async fn deploy(&self, code: Bytes, confirmations: u64) -> Result<DeployReceipt>;
}

impl ContractDeployer for ChainClient {
    fn deployer(&self) -> Result<Address> {
        self.sender()
    }

    async fn chain_id(&self) -> Result<u64> {
        self.get_chain_id().await
    }

    async fn deploy(&self, code: Bytes, confirmations: u64) -> Result<DeployReceipt> {
        self.deploy_code(code, confirmations).await
    }
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// What a deploy step does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepAction {
    /// Deploy the named artifact without constructor arguments.
    DeployContract(&'static str),
    /// Mirror addresses and ABIs into the frontend.
    UpdateFrontend,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeployStep {
    pub id: &'static str,
    pub tags: &'static [&'static str],
    pub action: StepAction,
}

/// All deploy steps, in execution order.
pub const DEPLOY_STEPS: [DeployStep; 3] = [
    DeployStep {
        id: "01-deploy-nftmarketplace",
        tags: &["all", "marketplace"],
        action: StepAction::DeployContract(names::NFT_MARKETPLACE),
    },
    DeployStep {
        id: "02-deploy-basic-nft",
        tags: &["all", "basicnft", "main"],
        action: StepAction::DeployContract(names::BASIC_NFT),
    },
    DeployStep {
        id: "99-update-frontend",
        tags: &["all", "frontend"],
        action: StepAction::UpdateFrontend,
    },
];

/// Steps carrying any of `tags`, in order. No tags selects every step.
pub fn select_steps(tags: &[String]) -> Vec<DeployStep> {
    DEPLOY_STEPS
        .iter()
        .filter(|step| tags.is_empty() || step.tags.iter().any(|t| tags.iter().any(|r| r == t)))
        .copied()
        .collect()
}

/// Verification needs a public network and an explorer key.
pub fn should_verify(network: &Network, env: &EnvSettings) -> bool {
    !network.is_development && env.etherscan_api_key.is_some()
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// What a deploy run did.
#[derive(Clone, Debug, Default)]
pub struct DeployReport {
    pub deployed: Vec<(String, Deployment)>,
    pub verified: Vec<String>,
    pub frontend_updated: bool,
}

/// Runs deploy steps against one network.
pub struct DeployRunner<'a, D, V> {
    deployer: &'a D,
    verifier: Option<&'a V>,
    network: &'a Network,
    artifacts_dir: PathBuf,
    store: DeploymentStore,
    frontend: Option<FrontendSync>,
}

impl<'a, D: ContractDeployer, V: SourceVerifier> DeployRunner<'a, D, V> {
    pub fn new(
        deployer: &'a D,
        network: &'a Network,
        artifacts_dir: impl Into<PathBuf>,
        store: DeploymentStore,
    ) -> Self {
        Self {
            deployer,
            verifier: None,
            network,
            artifacts_dir: artifacts_dir.into(),
            store,
            frontend: None,
        }
    }

    /// Verify each deployed contract with `verifier`.
    pub fn with_verifier(mut self, verifier: &'a V) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Enable the frontend step.
    pub fn with_frontend(mut self, frontend: FrontendSync) -> Self {
        self.frontend = Some(frontend);
        self
    }

    /// Run every step matching `tags`.
    pub async fn run(&self, tags: &[String]) -> Result<DeployReport> {
        let steps = select_steps(tags);
        if steps.is_empty() {
            bail!("no deploy steps match tags: {}", tags.join(", "));
        }

        let chain_id = self.deployer.chain_id().await?;
        self.store.write_chain_id(chain_id)?;
        info!(network = %self.network.name, chain_id, steps = steps.len(), "starting deployment");

        let mut report = DeployReport::default();
        for step in steps {
            debug!(step = step.id, "running deploy step");
            match step.action {
                StepAction::DeployContract(name) => {
                    formatter::print_info(&format!("------ Start {name} deployment script"));
                    let deployment = self.deploy_contract(name, &[]).await?;
                    if self.verify_contract(name, &deployment).await {
                        report.verified.push(name.to_string());
                    }
                    formatter::print_info(&format!("------ Completed {name} deployment script"));
                    report.deployed.push((name.to_string(), deployment));
                }
                StepAction::UpdateFrontend => match &self.frontend {
                    Some(frontend) => {
                        frontend.sync(chain_id, &self.store)?;
                        report.frontend_updated = true;
                    }
                    None => debug!("frontend update disabled"),
                },
            }
        }

        Ok(report)
    }

    /// Deploy one artifact and record it.
    pub async fn deploy_contract(&self, name: &str, args: &[DynSolValue]) -> Result<Deployment> {
        let artifact = Artifact::load(&self.artifacts_dir, name)?;
        let constructor_args = artifact.encode_constructor_args(args)?;
        let code = artifact.creation_code(&constructor_args)?;
        let from = self.deployer.deployer()?;

        formatter::print_info(&format!("deploying \"{name}\" from {from}..."));
        let receipt = self
            .deployer
            .deploy(code, self.network.block_confirmations)
            .await
            .with_context(|| format!("failed to deploy {name}"))?;

        formatter::print_info(&format!(
            "deployed \"{name}\" at {} (tx: {})",
            receipt.address, receipt.transaction_hash
        ));

        let deployment = Deployment {
            address: receipt.address,
            abi: artifact.abi,
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            deployer: from,
            constructor_args,
        };
        self.store.save(name, &deployment)?;
        Ok(deployment)
    }

    /// Returns `true` when the explorer accepted or already had the source.
    async fn verify_contract(&self, name: &str, deployment: &Deployment) -> bool {
        let Some(verifier) = self.verifier else {
            return false;
        };

        formatter::print_info("Verifying...");
        let outcome = match Artifact::load(&self.artifacts_dir, name) {
            Ok(artifact) => {
                verifier
                    .verify(&artifact, deployment.address, &deployment.constructor_args)
                    .await
            }
            Err(err) => Err(err),
        };

        match outcome {
            Ok(VerifyOutcome::Submitted { guid }) => {
                formatter::print_success(&format!("{name} submitted for verification ({guid})"));
                true
            }
            Ok(VerifyOutcome::AlreadyVerified) => {
                formatter::print_info("Already verified!");
                true
            }
            Err(err) => {
                formatter::print_warning(&format!("verification of {name} failed: {err:#}"));
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|t| t.to_string()).collect()
    }

    fn ids(steps: &[DeployStep]) -> Vec<&'static str> {
        steps.iter().map(|s| s.id).collect()
    }

    fn network(is_development: bool) -> Network {
        Network {
            name: "n".to_string(),
            chain_id: 1,
            rpc_url: "http://x".to_string(),
            block_confirmations: 1,
            is_development,
        }
    }

    #[test]
    fn all_tag_selects_every_step_in_order() {
        assert_eq!(
            ids(&select_steps(&tags(&["all"]))),
            vec!["01-deploy-nftmarketplace", "02-deploy-basic-nft", "99-update-frontend"]
        );
        assert_eq!(select_steps(&[]).len(), 3);
    }

    #[test]
    fn single_tag_selects_matching_step() {
        assert_eq!(ids(&select_steps(&tags(&["main"]))), vec!["02-deploy-basic-nft"]);
        assert_eq!(ids(&select_steps(&tags(&["frontend"]))), vec!["99-update-frontend"]);
    }

    #[test]
    fn multiple_tags_union_without_duplicates() {
        assert_eq!(
            ids(&select_steps(&tags(&["basicnft", "marketplace", "main"]))),
            vec!["01-deploy-nftmarketplace", "02-deploy-basic-nft"]
        );
    }

    #[test]
    fn unknown_tag_selects_nothing() {
        assert!(select_steps(&tags(&["nope"])).is_empty());
    }

    #[test]
    fn verification_requires_public_network_and_key() {
        let keyed = EnvSettings {
            etherscan_api_key: Some("key".to_string()),
            ..EnvSettings::default()
        };
        assert!(should_verify(&network(false), &keyed));
        assert!(!should_verify(&network(true), &keyed));
        assert!(!should_verify(&network(false), &EnvSettings::default()));
    }

    fn artifact(abi: JsonAbi, bytecode: &str) -> Artifact {
        Artifact {
            contract_name: "Sample".to_string(),
            source_name: "contracts/Sample.sol".to_string(),
            abi,
            bytecode: bytecode.parse().unwrap(),
            path: PathBuf::new(),
        }
    }

    #[test]
    fn no_constructor_no_args_encodes_empty() {
        let a = artifact(JsonAbi::new(), "0x6080");
        assert!(a.encode_constructor_args(&[]).unwrap().is_empty());
    }

    #[test]
    fn no_constructor_with_args_fails() {
        let a = artifact(JsonAbi::new(), "0x6080");
        let err = a
            .encode_constructor_args(&[DynSolValue::Uint(U256::from(1u64), 256)])
            .unwrap_err();
        assert!(err.to_string().contains("has no constructor"));
    }

    #[test]
    fn constructor_args_are_appended_to_bytecode() {
        let abi = JsonAbi::parse(["constructor(uint256 fee)"]).unwrap();
        let a = artifact(abi, "0x6080");

        let args = a
            .encode_constructor_args(&[DynSolValue::Uint(U256::from(7u64), 256)])
            .unwrap();
        assert_eq!(args.len(), 32);
        assert_eq!(args[31], 7);

        let code = a.creation_code(&args).unwrap();
        assert_eq!(code.len(), 34);
        assert_eq!(&code[..2], &[0x60, 0x80]);
    }

    #[test]
    fn empty_bytecode_is_rejected() {
        let a = artifact(JsonAbi::new(), "0x");
        let err = a.creation_code(&Bytes::new()).unwrap_err();
        assert!(err.to_string().contains("no bytecode"));
    }

    #[test]
    fn artifact_path_follows_hardhat_layout() {
        assert_eq!(
            Artifact::path_for(Path::new("artifacts"), "BasicNft"),
            PathBuf::from("artifacts/contracts/BasicNft.sol/BasicNft.json")
        );
    }

    #[test]
    fn missing_artifact_suggests_compiling() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Artifact::load(tmp.path(), "NftMarketplace").unwrap_err();
        assert!(err.to_string().contains("compile the contracts first"));
    }
}
