//! Source verification on an Etherscan-compatible explorer.
//!
//! Submits the Hardhat build-info standard JSON input for a deployed
//! contract. The explorer verifies asynchronously; this module only reports
//! whether the submission was accepted.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy::primitives::{Address, Bytes};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::engine::deploy::Artifact;

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Outcome of a verification request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Queued by the explorer under `guid`.
    Submitted { guid: String },
    AlreadyVerified,
}

/// Something that can verify a deployed contract's source.
#[allow(async_fn_in_trait)]
pub trait SourceVerifier {
    async fn verify(
        &self,
        artifact: &Artifact,
        address: Address,
        constructor_args: &Bytes,
    ) -> Result<VerifyOutcome>;
}

// ---------------------------------------------------------------------------
// Build info
// ---------------------------------------------------------------------------

/// `<Name>.dbg.json`, written by Hardhat next to each artifact.
#[derive(Deserialize)]
struct DebugFile {
    #[serde(rename = "buildInfo")]
    build_info: PathBuf,
}

/// The parts of a Hardhat build-info file needed for verification.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub solc_long_version: String,
    pub input: serde_json::Value,
}

impl BuildInfo {
    /// Load the build info referenced by the artifact's debug file.
    pub fn for_artifact(artifact_path: &Path) -> Result<Self> {
        let dbg_path = artifact_path.with_extension("dbg.json");
        let contents = fs::read_to_string(&dbg_path)
            .with_context(|| format!("failed to read debug file: {}", dbg_path.display()))?;
        let dbg: DebugFile = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse debug file: {}", dbg_path.display()))?;

        let base = dbg_path.parent().unwrap_or_else(|| Path::new("."));
        let path = base.join(&dbg.build_info);
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read build info: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse build info: {}", path.display()))
    }
}

// ---------------------------------------------------------------------------
// Etherscan
// ---------------------------------------------------------------------------

/// Etherscan API envelope.
#[derive(Clone, Debug, Deserialize)]
pub struct EtherscanResponse {
    pub status: String,
    pub message: String,
    pub result: String,
}

/// Interpret a `verifysourcecode` response.
pub fn interpret_response(response: &EtherscanResponse) -> Result<VerifyOutcome> {
    if response.result.to_lowercase().contains("already verified") {
        return Ok(VerifyOutcome::AlreadyVerified);
    }
    if response.status == "1" {
        return Ok(VerifyOutcome::Submitted {
            guid: response.result.clone(),
        });
    }
    bail!(
        "verification rejected: {} ({})",
        response.result,
        response.message
    )
}

/// Verifier backed by the Etherscan `verifysourcecode` endpoint.
pub struct EtherscanVerifier {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl EtherscanVerifier {
    pub fn new(api_url: &str, api_key: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed to build HTTP client for verification")?;

        Ok(Self {
            http,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

impl SourceVerifier for EtherscanVerifier {
    async fn verify(
        &self,
        artifact: &Artifact,
        address: Address,
        constructor_args: &Bytes,
    ) -> Result<VerifyOutcome> {
        let build_info = BuildInfo::for_artifact(&artifact.path)?;
        let source_code = serde_json::to_string(&build_info.input)
            .context("failed to serialise compiler input")?;

        let contract_name = format!("{}:{}", artifact.source_name, artifact.contract_name);
        let compiler_version = format!("v{}", build_info.solc_long_version);
        let address = address.to_string();
        let args_hex = hex::encode(constructor_args);

        debug!(
            contract = %contract_name,
            %address,
            compiler = %compiler_version,
            "submitting source verification"
        );

        let params = [
            ("apikey", self.api_key.as_str()),
            ("module", "contract"),
            ("action", "verifysourcecode"),
            ("contractaddress", address.as_str()),
            ("sourceCode", source_code.as_str()),
            ("codeformat", "solidity-standard-json-input"),
            ("contractname", contract_name.as_str()),
            ("compilerversion", compiler_version.as_str()),
            // Etherscan's spelling.
            ("constructorArguements", args_hex.as_str()),
        ];

        let response: EtherscanResponse = self
            .http
            .post(&self.api_url)
            .form(&params)
            .send()
            .await
            .context("verification request failed")?
            .error_for_status()
            .context("verification endpoint returned an error status")?
            .json()
            .await
            .context("failed to parse verification response")?;

        debug!(status = %response.status, result = %response.result, "verification response");
        interpret_response(&response)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
