//! Deployment records.
//!
//! Each deployed contract is recorded as `deployments/<network>/<Name>.json`
//! (address, ABI, creation transaction, encoded constructor args) next to a
//! `.chainId` file. Scripts resolve contracts by name from here, so they
//! always talk to the latest deployment on the selected network.

use std::fs;
use std::path::{Path, PathBuf};

use alloy::json_abi::JsonAbi;
use alloy::primitives::{Address, Bytes, B256};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Name of the file holding the chain id of a network directory.
const CHAIN_ID_FILE: &str = ".chainId";

/// A deployed contract.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub address: Address,
    pub abi: JsonAbi,
    pub transaction_hash: B256,
    pub block_number: u64,
    pub deployer: Address,
    /// ABI-encoded constructor arguments.
    #[serde(default)]
    pub constructor_args: Bytes,
}

/// Deployment records of one network.
#[derive(Clone, Debug)]
pub struct DeploymentStore {
    dir: PathBuf,
}

impl DeploymentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            debug!(path = %self.dir.display(), "creating deployments directory");
            fs::create_dir_all(&self.dir).with_context(|| {
                format!("failed to create deployments directory: {}", self.dir.display())
            })?;
        }
        Ok(())
    }

    /// Write (or overwrite) the record for `name`.
    pub fn save(&self, name: &str, deployment: &Deployment) -> Result<()> {
        self.ensure_dir()?;
        let path = self.record_path(name);
        debug!(path = %path.display(), address = %deployment.address, "saving deployment");

        let json = serde_json::to_string_pretty(deployment)
            .context("failed to serialise deployment record")?;
        fs::write(&path, json)
            .with_context(|| format!("failed to write deployment record: {}", path.display()))?;
        Ok(())
    }

    /// Read the record for `name`.
    pub fn load(&self, name: &str) -> Result<Deployment> {
        let path = self.record_path(name);
        let contents = fs::read_to_string(&path).with_context(|| {
            format!(
                "no deployment of {name} found at {} (run `nftmarket deploy` first)",
                path.display()
            )
        })?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse deployment record: {}", path.display()))
    }

    /// Address of the deployed contract `name`.
    pub fn address_of(&self, name: &str) -> Result<Address> {
        Ok(self.load(name)?.address)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.record_path(name).exists()
    }

    /// Names of all recorded contracts, sorted.
    pub fn names(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("failed to read deployments directory: {}", self.dir.display()))?
        {
            let path = entry.context("failed to read directory entry")?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn write_chain_id(&self, chain_id: u64) -> Result<()> {
        self.ensure_dir()?;
        let path = self.dir.join(CHAIN_ID_FILE);
        fs::write(&path, chain_id.to_string())
            .with_context(|| format!("failed to write {}", path.display()))
    }

    /// The chain id recorded for this network, if any.
    pub fn read_chain_id(&self) -> Result<Option<u64>> {
        let path = self.dir.join(CHAIN_ID_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let chain_id = contents
            .trim()
            .parse()
            .with_context(|| format!("failed to parse chain id in {}", path.display()))?;
        Ok(Some(chain_id))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
