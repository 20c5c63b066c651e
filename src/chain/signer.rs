//! Transaction signing for the deployer account.
//!
//! Wraps alloy's [`PrivateKeySigner`]. The key comes from `PRIVATE_KEY`; on
//! development networks the well-known local dev accounts are used when no
//! key is configured. Decoded key bytes are zeroed after signer construction.

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{bail, Context, Result};
use tracing::debug;
use zeroize::Zeroize;

use crate::config::env::EnvSettings;
use crate::config::store::Network;

/// Private keys of the first accounts of the default Hardhat/anvil mnemonic.
/// Public knowledge; only ever valid on a local chain.
const DEV_ACCOUNT_KEYS: [&str; 2] = [
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
    "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
];

// ---------------------------------------------------------------------------
// TransactionSigner
// ---------------------------------------------------------------------------

/// A transaction signer backed by a secp256k1 private key.
#[derive(Clone, Debug)]
pub struct TransactionSigner {
    signer: PrivateKeySigner,
}

impl TransactionSigner {
    /// Pick the signer for `network`.
    ///
    /// `PRIVATE_KEY` wins. Without it, development networks fall back to dev
    /// account #0 (the `deployer` named account); other networks fail.
    pub fn for_network(network: &Network, env: &EnvSettings) -> Result<Self> {
        if let Some(key) = &env.private_key {
            debug!(network = %network.name, "using PRIVATE_KEY signer");
            return Self::from_hex(key);
        }

        if network.is_development {
            debug!(network = %network.name, "using local dev account #0");
            return Self::dev_account(0);
        }

        bail!(
            "no signing key for network \"{}\": set PRIVATE_KEY in the environment or .env",
            network.name
        )
    }

    /// One of the default local dev accounts (`0` = deployer, `1` = user).
    pub fn dev_account(index: usize) -> Result<Self> {
        let Some(key) = DEV_ACCOUNT_KEYS.get(index) else {
            bail!("no local dev account with index {index}");
        };
        Self::from_hex(key)
    }

    /// Build from a hex private key, with or without `0x` prefix.
    pub fn from_hex(key: &str) -> Result<Self> {
        let trimmed = key.trim();
        let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);

        let mut key_bytes = hex::decode(hex_part).context("private key is not valid hex")?;
        Self::from_bytes(&mut key_bytes)
    }

    /// Build from raw private key bytes (must be exactly 32 bytes).
    ///
    /// The input vector is zeroed after construction regardless of success or
    /// failure.
    pub fn from_bytes(key_bytes: &mut Vec<u8>) -> Result<Self> {
        let result = Self::from_bytes_inner(key_bytes);
        key_bytes.zeroize();
        result
    }

    fn from_bytes_inner(key_bytes: &[u8]) -> Result<Self> {
        if key_bytes.len() != 32 {
            bail!(
                "private key must be exactly 32 bytes, got {}",
                key_bytes.len()
            );
        }

        let signer = PrivateKeySigner::from_slice(key_bytes)
            .context("failed to construct signer from private key bytes")?;

        debug!(address = %signer.address(), "transaction signer created");

        Ok(Self { signer })
    }

    /// Returns the address derived from the signing key.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Returns a reference to the inner alloy signer, for provider wallets.
    pub fn inner(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    fn network(is_development: bool) -> Network {
        Network {
            name: if is_development { "localhost" } else { "sepolia" }.to_string(),
            chain_id: 1,
            rpc_url: "http://127.0.0.1:8545".to_string(),
            block_confirmations: 1,
            is_development,
        }
    }

    #[test]
    fn dev_accounts_match_known_addresses() {
        let deployer = TransactionSigner::dev_account(0).unwrap();
        let user = TransactionSigner::dev_account(1).unwrap();

        assert_eq!(
            deployer.address(),
            address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
        );
        assert_eq!(
            user.address(),
            address!("70997970C51812dc3A010C7d01b50e0d17dc79C8")
        );
    }

    #[test]
    fn dev_account_out_of_range_fails() {
        assert!(TransactionSigner::dev_account(7).is_err());
    }

    #[test]
    fn from_hex_accepts_prefix() {
        let with = TransactionSigner::from_hex(&format!("0x{}", DEV_ACCOUNT_KEYS[0])).unwrap();
        let without = TransactionSigner::from_hex(DEV_ACCOUNT_KEYS[0]).unwrap();
        assert_eq!(with.address(), without.address());
    }

    #[test]
    fn from_hex_rejects_garbage() {
        let err = TransactionSigner::from_hex("0xnothex").unwrap_err();
        assert!(err.to_string().contains("not valid hex"));
    }

    #[test]
    fn from_bytes_wrong_length_zeroes_input() {
        let mut key = vec![0xffu8; 16];
        assert!(TransactionSigner::from_bytes(&mut key).is_err());
        assert!(key.iter().all(|&b| b == 0));
    }

    #[test]
    fn development_network_falls_back_to_deployer() {
        let signer = TransactionSigner::for_network(&network(true), &EnvSettings::default())
            .expect("dev fallback");
        assert_eq!(
            signer.address(),
            TransactionSigner::dev_account(0).unwrap().address()
        );
    }

    #[test]
    fn live_network_requires_private_key() {
        let err = TransactionSigner::for_network(&network(false), &EnvSettings::default())
            .unwrap_err();
        assert!(err.to_string().contains("PRIVATE_KEY"));
    }

    #[test]
    fn private_key_wins_over_dev_fallback() {
        let env = EnvSettings {
            private_key: Some(DEV_ACCOUNT_KEYS[1].to_string()),
            ..EnvSettings::default()
        };
        let signer = TransactionSigner::for_network(&network(true), &env).unwrap();
        assert_eq!(
            signer.address(),
            TransactionSigner::dev_account(1).unwrap().address()
        );
    }
}
