use std::fmt;

use alloy::primitives::utils::parse_ether;
use alloy::primitives::U256;
use anyhow::{bail, Context, Result};

// ---------------------------------------------------------------------------
// Eth
// ---------------------------------------------------------------------------

/// An amount of the native currency, in wei.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Eth(pub U256);

const WEI_PER_ETH: u128 = 1_000_000_000_000_000_000; // 1e18

/// Digits shown after the decimal point.
const DISPLAY_DECIMALS: u32 = 4;

impl Eth {
    /// Parse a decimal ETH string such as `"0.1"`.
    pub fn parse(value: &str) -> Result<Self> {
        let wei = parse_ether(value.trim())
            .with_context(|| format!("failed to parse ETH amount: \"{value}\""))?;
        Ok(Self(wei))
    }

    /// Parse a price, which must be strictly positive.
    pub fn parse_price(value: &str) -> Result<Self> {
        let amount = Self::parse(value)?;
        if amount.0.is_zero() {
            bail!("price must be greater than zero");
        }
        Ok(amount)
    }

    pub fn wei(&self) -> U256 {
        self.0
    }
}

/// Human-readable ETH with four decimals, e.g. `"0.1000 ETH"`.
/// Sub-display remainders are truncated.
impl fmt::Display for Eth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let eth = U256::from(WEI_PER_ETH);
        let whole = self.0 / eth;
        let remainder = self.0 % eth;

        let scale = U256::from(10u64.pow(DISPLAY_DECIMALS));
        let frac = (remainder * scale) / eth;

        write!(
            f,
            "{}.{:0width$} ETH",
            whole,
            frac.to::<u64>(),
            width = DISPLAY_DECIMALS as usize
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
