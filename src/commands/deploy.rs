//! The `deploy` command: run the tagged deploy steps.

use anyhow::Result;
use tracing::debug;

use super::CommandContext;
use crate::engine::deploy::{self, DeployRunner};
use crate::engine::frontend::FrontendSync;
use crate::engine::verify::EtherscanVerifier;
use crate::output::formatter;

pub async fn run(network: Option<&str>, tags: Vec<String>) -> Result<()> {
    debug!(?tags, "starting deploy command");

    let ctx = CommandContext::load(network)?;
    let client = ctx.connect()?;

    let verifier = match (&ctx.env.etherscan_api_key, deploy::should_verify(&ctx.network, &ctx.env)) {
        (Some(key), true) => Some(EtherscanVerifier::new(&ctx.cfg.verify.api_url, key)?),
        _ => None,
    };

    let mut runner = DeployRunner::new(&client, &ctx.network, ctx.cfg.artifacts_dir(), ctx.store());
    if let Some(verifier) = &verifier {
        runner = runner.with_verifier(verifier);
    }
    if ctx.env.update_front_end {
        runner = runner.with_frontend(FrontendSync::new(
            ctx.cfg.frontend_network_mapping(),
            ctx.cfg.frontend_abi_dir(),
        ));
    }

    let report = runner.run(&tags).await?;

    for (name, deployment) in &report.deployed {
        formatter::print_success(&format!("{name}: {}", deployment.address));
    }
    if report.frontend_updated {
        formatter::print_success("Frontend updated.");
    }

    debug!(deployed = report.deployed.len(), "deploy command complete");
    Ok(())
}
