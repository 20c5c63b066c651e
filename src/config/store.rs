//! Project configuration for the nftmarket CLI.
//!
//! Reads `nftmarket.toml` from the project directory (the path specified by
//! `NFTMARKET_HOME`, or the current working directory). A missing file is not
//! an error: the defaults describe a Hardhat/anvil node on `localhost:8545`
//! plus Sepolia. Precedence follows:
//!
//!   nftmarket.toml < NFTMARKET_* env vars < CLI flags
//!
//! CLI-flag overrides are handled at the command layer, not here.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

/// Top-level configuration persisted in `nftmarket.toml`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network used when `--network` is not given.
    pub default_network: String,
    /// Networks on which deployments are never verified.
    pub development_chains: Vec<String>,
    pub networks: BTreeMap<String, NetworkConfig>,
    pub paths: PathsConfig,
    pub verify: VerifyConfig,

    /// Directory the config was loaded from. Relative paths resolve here.
    #[serde(skip)]
    pub root: PathBuf,
}

/// A single JSON-RPC network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub rpc_url: String,
    /// Confirmations to wait for on deployment transactions.
    pub block_confirmations: u64,
}

/// Filesystem locations, relative to the project directory unless absolute.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub artifacts: PathBuf,
    pub deployments: PathBuf,
    pub frontend_network_mapping: PathBuf,
    pub frontend_abi_dir: PathBuf,
}

/// Block explorer used for source verification.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    pub api_url: String,
}

/// A network selected for this run, with env overrides applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Network {
    pub name: String,
    pub chain_id: u64,
    pub rpc_url: String,
    pub block_confirmations: u64,
    pub is_development: bool,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Chain id of Hardhat network and anvil.
pub const LOCAL_CHAIN_ID: u64 = 31337;

const SEPOLIA_CHAIN_ID: u64 = 11155111;

const LOCAL_RPC_URL: &str = "http://127.0.0.1:8545";

impl Default for Config {
    fn default() -> Self {
        let local = NetworkConfig {
            chain_id: LOCAL_CHAIN_ID,
            rpc_url: LOCAL_RPC_URL.to_string(),
            block_confirmations: 1,
        };

        let mut networks = BTreeMap::new();
        networks.insert("hardhat".to_string(), local.clone());
        networks.insert("localhost".to_string(), local);
        networks.insert(
            "sepolia".to_string(),
            NetworkConfig {
                chain_id: SEPOLIA_CHAIN_ID,
                rpc_url: String::new(),
                block_confirmations: 6,
            },
        );

        Self {
            default_network: "localhost".to_string(),
            development_chains: vec!["hardhat".to_string(), "localhost".to_string()],
            networks,
            paths: PathsConfig::default(),
            verify: VerifyConfig::default(),
            root: PathBuf::from("."),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            artifacts: PathBuf::from("artifacts"),
            deployments: PathBuf::from("deployments"),
            frontend_network_mapping: PathBuf::from(
                "../nft-marketplace-frontend-moralis/constants/networkMapping.json",
            ),
            frontend_abi_dir: PathBuf::from("../nft-marketplace-frontend-moralis/constants"),
        }
    }
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.etherscan.io/api".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Name of the configuration file inside the project directory.
pub const CONFIG_FILE: &str = "nftmarket.toml";

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Returns the project directory.
///
/// Resolution order:
/// 1. `NFTMARKET_HOME` environment variable (if set and non-empty).
/// 2. The current working directory.
pub fn project_dir() -> Result<PathBuf> {
    match std::env::var("NFTMARKET_HOME") {
        Ok(val) if !val.is_empty() => {
            debug!(path = %val, "using NFTMARKET_HOME as project directory");
            Ok(PathBuf::from(val))
        }
        _ => std::env::current_dir().context("unable to determine current directory"),
    }
}

/// Loads the configuration rooted at `dir`.
pub fn load_from(dir: &Path) -> Result<Config> {
    let path = dir.join(CONFIG_FILE);

    let mut config = if path.exists() {
        debug!(path = %path.display(), "loading config");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        toml::from_str::<Config>(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?
    } else {
        debug!(path = %path.display(), "no config file, using defaults");
        Config::default()
    };

    config.root = dir.to_path_buf();
    Ok(config)
}

impl Config {
    /// Resolves a configured network by name.
    ///
    /// `NFTMARKET_RPC_URL`, when set and non-empty, replaces the network's
    /// RPC endpoint.
    pub fn network(&self, name: &str) -> Result<Network> {
        let Some(net) = self.networks.get(name) else {
            let known: Vec<&str> = self.networks.keys().map(String::as_str).collect();
            bail!("unknown network \"{name}\" (configured: {})", known.join(", "));
        };

        let mut rpc_url = net.rpc_url.clone();
        if let Ok(val) = std::env::var("NFTMARKET_RPC_URL") {
            if !val.is_empty() {
                debug!(rpc_url = %val, "overriding rpc_url from NFTMARKET_RPC_URL");
                rpc_url = val;
            }
        }

        if rpc_url.is_empty() {
            bail!("network \"{name}\" has no rpc_url configured");
        }

        Ok(Network {
            name: name.to_string(),
            chain_id: net.chain_id,
            rpc_url,
            block_confirmations: net.block_confirmations,
            is_development: self.development_chains.iter().any(|c| c == name),
        })
    }

    /// Resolves a configured path against the project directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.resolve(&self.paths.artifacts)
    }

    /// Deployment records for one network live in `deployments/<network>/`.
    pub fn deployments_dir(&self, network: &str) -> PathBuf {
        self.resolve(&self.paths.deployments).join(network)
    }

    pub fn frontend_network_mapping(&self) -> PathBuf {
        self.resolve(&self.paths.frontend_network_mapping)
    }

    pub fn frontend_abi_dir(&self) -> PathBuf {
        self.resolve(&self.paths.frontend_abi_dir)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
