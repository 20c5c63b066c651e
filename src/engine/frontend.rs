//! Frontend address and ABI sync.
//!
//! Keeps a sibling frontend project pointed at the latest deployments:
//! `networkMapping.json` maps chain id to contract name to every address the
//! contract has been deployed at, and `<Name>.json` holds each contract's
//! ABI. Files are rewritten in place; a failure part-way leaves whatever was
//! already written.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use alloy::json_abi::JsonAbi;
use alloy::primitives::Address;
use anyhow::{Context, Result};
use tracing::debug;

use crate::chain::contracts::names;
use crate::engine::deployments::DeploymentStore;
use crate::output::formatter;

/// `chainId -> contractName -> [address, ...]`
pub type NetworkMapping = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// Contracts whose addresses are published to the network mapping.
const MAPPED_CONTRACTS: [&str; 1] = [names::NFT_MARKETPLACE];

/// Contracts whose ABIs are published.
const ABI_CONTRACTS: [&str; 2] = [names::NFT_MARKETPLACE, names::BASIC_NFT];

/// Read the mapping file. A missing file is an empty mapping.
pub fn read_mapping(path: &Path) -> Result<NetworkMapping> {
    if !path.exists() {
        debug!(path = %path.display(), "network mapping missing, starting empty");
        return Ok(NetworkMapping::new());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read network mapping: {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse network mapping: {}", path.display()))
}

/// Record `address` for `contract` on `chain_id` unless already present.
///
/// Returns `true` when the mapping changed. Comparison ignores address
/// checksum casing.
pub fn add_address(
    mapping: &mut NetworkMapping,
    chain_id: u64,
    contract: &str,
    address: Address,
) -> bool {
    let addresses = mapping
        .entry(chain_id.to_string())
        .or_default()
        .entry(contract.to_string())
        .or_default();

    let known = addresses
        .iter()
        .any(|existing| existing.parse::<Address>().ok() == Some(address));
    if known {
        return false;
    }

    addresses.push(address.to_string());
    true
}

/// Writes deployment results into the frontend project.
#[derive(Clone, Debug)]
pub struct FrontendSync {
    mapping_path: PathBuf,
    abi_dir: PathBuf,
}

impl FrontendSync {
    pub fn new(mapping_path: impl Into<PathBuf>, abi_dir: impl Into<PathBuf>) -> Self {
        Self {
            mapping_path: mapping_path.into(),
            abi_dir: abi_dir.into(),
        }
    }

    /// Add the marketplace address for `chain_id` to the network mapping.
    pub fn update_contract_addresses(&self, chain_id: u64, store: &DeploymentStore) -> Result<()> {
        let mut mapping = read_mapping(&self.mapping_path)?;

        let mut changed = false;
        for name in MAPPED_CONTRACTS {
            let address = store.address_of(name)?;
            changed |= add_address(&mut mapping, chain_id, name, address);
        }

        if !changed {
            debug!(chain_id, "network mapping already up to date");
        }

        ensure_parent(&self.mapping_path)?;
        let json = serde_json::to_string(&mapping).context("failed to serialise network mapping")?;
        fs::write(&self.mapping_path, json).with_context(|| {
            format!("failed to write network mapping: {}", self.mapping_path.display())
        })?;
        Ok(())
    }

    /// Write `<abi_dir>/<Name>.json` for every published contract that has
    /// a deployment record. Returns the names written.
    pub fn update_abis(&self, store: &DeploymentStore) -> Result<Vec<&'static str>> {
        let mut written = Vec::new();
        for name in ABI_CONTRACTS {
            if !store.exists(name) {
                debug!(contract = name, "no deployment record, skipping ABI");
                continue;
            }
            let deployment = store.load(name)?;
            self.write_abi(name, &deployment.abi)?;
            written.push(name);
        }
        Ok(written)
    }

    pub fn write_abi(&self, name: &str, abi: &JsonAbi) -> Result<PathBuf> {
        fs::create_dir_all(&self.abi_dir).with_context(|| {
            format!("failed to create ABI directory: {}", self.abi_dir.display())
        })?;

        let path = self.abi_dir.join(format!("{name}.json"));
        let json = serde_json::to_string(abi).context("failed to serialise ABI")?;
        fs::write(&path, json)
            .with_context(|| format!("failed to write ABI file: {}", path.display()))?;
        debug!(path = %path.display(), "ABI written");
        Ok(path)
    }

    /// Addresses, then ABIs.
    pub fn sync(&self, chain_id: u64, store: &DeploymentStore) -> Result<()> {
        formatter::print_info("updating frontend...");
        self.update_contract_addresses(chain_id, store)?;
        let written = self.update_abis(store)?;
        debug!(?written, "ABIs written");
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const FIRST: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
    const SECOND: Address = address!("Cf7Ed3AccA5a467e9e704C703E8D87F634fB0Fc9");

    #[test]
    fn new_chain_gets_its_own_entry() {
        let mut mapping = NetworkMapping::new();
        assert!(add_address(&mut mapping, 31337, "NftMarketplace", FIRST));

        assert_eq!(
            mapping["31337"]["NftMarketplace"],
            vec![FIRST.to_string()]
        );
    }

    #[test]
    fn duplicate_address_is_not_appended() {
        let mut mapping = NetworkMapping::new();
        add_address(&mut mapping, 31337, "NftMarketplace", FIRST);
        assert!(!add_address(&mut mapping, 31337, "NftMarketplace", FIRST));
        assert_eq!(mapping["31337"]["NftMarketplace"].len(), 1);
    }

    #[test]
    fn lowercase_entry_counts_as_known() {
        let mut mapping = NetworkMapping::new();
        mapping
            .entry("31337".to_string())
            .or_default()
            .insert(
                "NftMarketplace".to_string(),
                vec![FIRST.to_string().to_lowercase()],
            );

        assert!(!add_address(&mut mapping, 31337, "NftMarketplace", FIRST));
    }

    #[test]
    fn redeploy_appends_in_order() {
        let mut mapping = NetworkMapping::new();
        add_address(&mut mapping, 11155111, "NftMarketplace", FIRST);
        add_address(&mut mapping, 11155111, "NftMarketplace", SECOND);

        assert_eq!(
            mapping["11155111"]["NftMarketplace"],
            vec![FIRST.to_string(), SECOND.to_string()]
        );
    }

    #[test]
    fn existing_chain_without_contract_key_is_extended() {
        let mut mapping = NetworkMapping::new();
        add_address(&mut mapping, 31337, "BasicNft", SECOND);
        add_address(&mut mapping, 31337, "NftMarketplace", FIRST);

        assert_eq!(mapping["31337"].len(), 2);
    }

    #[test]
    fn missing_mapping_reads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let mapping = read_mapping(&tmp.path().join("networkMapping.json")).unwrap();
        assert!(mapping.is_empty());
    }

    #[test]
    fn corrupt_mapping_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("networkMapping.json");
        fs::write(&path, "{not json").unwrap();

        let err = read_mapping(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse network mapping"));
    }

    #[test]
    fn abis_are_written_only_for_recorded_contracts() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DeploymentStore::new(tmp.path().join("deployments"));
        store
            .save(
                names::NFT_MARKETPLACE,
                &crate::engine::deployments::Deployment {
                    address: FIRST,
                    abi: JsonAbi::parse(["function withdrawProceeds() external"]).unwrap(),
                    transaction_hash: alloy::primitives::B256::ZERO,
                    block_number: 1,
                    deployer: SECOND,
                    constructor_args: alloy::primitives::Bytes::new(),
                },
            )
            .unwrap();
        let abi_dir = tmp.path().join("constants");
        let sync = FrontendSync::new(tmp.path().join("networkMapping.json"), &abi_dir);

        sync.sync(31337, &store).unwrap();

        assert!(abi_dir.join("NftMarketplace.json").exists());
        assert!(!abi_dir.join("BasicNft.json").exists());
        let mapping = read_mapping(&tmp.path().join("networkMapping.json")).unwrap();
        assert_eq!(mapping["31337"]["NftMarketplace"], vec![FIRST.to_string()]);
    }

    #[test]
    fn write_abi_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let sync = FrontendSync::new(
            tmp.path().join("networkMapping.json"),
            tmp.path().join("constants"),
        );
        let abi = JsonAbi::parse(["function mintNft() external returns (uint256)"]).unwrap();

        let path = sync.write_abi("BasicNft", &abi).unwrap();
        let written: JsonAbi = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written, abi);
    }
}
