//! The `mine` command: advance the local chain by a couple of blocks.

use anyhow::Result;
use tracing::debug;

use super::CommandContext;
use crate::engine::blocks;
use crate::output::formatter;

pub async fn run(network: Option<&str>) -> Result<()> {
    debug!("starting mine command");

    let ctx = CommandContext::load(network)?;
    let client = ctx.connect()?;

    let mined =
        blocks::move_blocks_if_local(&client, blocks::SCRIPT_BLOCKS, blocks::SCRIPT_SLEEP).await?;
    if !mined {
        formatter::print_info(&format!(
            "Not a local chain ({}), no blocks mined.",
            ctx.network.name
        ));
    }

    Ok(())
}
