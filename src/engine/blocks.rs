//! Block advancement on the local development chain.
//!
//! Frontends and indexers wait for a number of confirmations before they
//! show a transaction. On a local node nothing else produces blocks, so the
//! scripts mine a couple of empty ones after they are done.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;

use crate::config::store::LOCAL_CHAIN_ID;
use crate::output::formatter;

/// Blocks mined by the scripts after their last transaction.
pub const SCRIPT_BLOCKS: u32 = 2;

/// Pause between mined blocks in the scripts.
pub const SCRIPT_SLEEP: Duration = Duration::from_millis(1000);

/// A chain that accepts the administrative "mine one block" request.
#[allow(async_fn_in_trait)]
pub trait BlockMiner {
    async fn chain_id(&self) -> Result<u64>;

    async fn mine_block(&self) -> Result<()>;
}

/// Mine `amount` blocks one after another, pausing `sleep` after each when
/// `sleep` is non-zero.
pub async fn move_blocks<M: BlockMiner>(miner: &M, amount: u32, sleep: Duration) -> Result<()> {
    debug!(amount, ?sleep, "moving blocks");

    for index in 0..amount {
        miner
            .mine_block()
            .await
            .with_context(|| format!("failed to mine block {} of {amount}", index + 1))?;

        if !sleep.is_zero() {
            formatter::print_info(&format!("Sleeping for {} milliseconds", sleep.as_millis()));
            tokio::time::sleep(sleep).await;
        }
    }

    Ok(())
}

/// Mine blocks only when connected to the local development chain.
///
/// Returns `true` when blocks were mined.
pub async fn move_blocks_if_local<M: BlockMiner>(
    miner: &M,
    amount: u32,
    sleep: Duration,
) -> Result<bool> {
    let chain_id = miner.chain_id().await?;
    if chain_id != LOCAL_CHAIN_ID {
        debug!(chain_id, "not a local chain, skipping block advancement");
        return Ok(false);
    }

    move_blocks(miner, amount, sleep).await?;
    Ok(true)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
