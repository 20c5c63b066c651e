//! User-facing output formatter.
//!
//! Script progress goes to stdout; warnings and errors to stderr. Reverts are
//! reported by their contract error name so they can be matched in logs and
//! CI output.

use alloy::primitives::{Address, U256};
use anyhow::Error;

use crate::chain::types::Eth;
use crate::engine::marketplace::{Listing, MarketplaceError};

// ---------------------------------------------------------------------------
// Success / info / warning primitives
// ---------------------------------------------------------------------------

/// Print a success message to stdout: "✓ {msg}"
pub fn print_success(msg: &str) {
    println!("\u{2713} {msg}");
}

/// Print an informational message to stdout.
pub fn print_info(msg: &str) {
    println!("{msg}");
}

/// Print a warning to stderr: "⚠ {msg}"
pub fn print_warning(msg: &str) {
    eprintln!("\u{26A0} {msg}");
}

// ---------------------------------------------------------------------------
// Error formatting
// ---------------------------------------------------------------------------

/// Render an error for the terminal.
///
/// Contract reverts anywhere in the chain win over everything else; then
/// unreachable nodes; anything else keeps its full context chain.
pub fn format_error(err: &Error) -> String {
    if let Some(revert) = MarketplaceError::from_anyhow(err) {
        return format!("Transaction reverted: {revert}");
    }

    let msg = format!("{err:#}");
    let lower = msg.to_lowercase();

    if lower.contains("connection refused")
        || lower.contains("unable to reach the node")
        || lower.contains("error sending request")
    {
        format!("Node unreachable. Is the network running? ({msg})")
    } else if lower.contains("insufficient funds") {
        "Insufficient funds for this transaction.".to_string()
    } else {
        msg
    }
}

/// Format and print an error to stderr.
pub fn print_error(err: &Error) {
    eprintln!("{}", format_error(err));
}

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

/// Print a listing, or that there is none.
pub fn print_listing(nft_address: Address, token_id: U256, listing: &Listing) {
    if !listing.is_listed() {
        println!("Token {token_id} of {nft_address} is not listed.");
        return;
    }
    println!("NFT:     {nft_address}");
    println!("Token:   {token_id}");
    println!("Price:   {}", Eth(listing.price));
    println!("Seller:  {}", listing.seller);
}

/// Print an account's proceeds.
pub fn print_proceeds(seller: Address, amount: U256) {
    println!("Proceeds of {seller}: {}", Eth(amount));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_format_error_revert() {
        let err = Error::new(MarketplaceError::NotOwner).context("listItem reverted");
        assert_eq!(
            format_error(&err),
            "Transaction reverted: NftMarketplace__NotOwner"
        );
    }

    #[test]
    fn test_format_error_token_revert() {
        let err = Error::new(MarketplaceError::Token(
            crate::engine::marketplace::TokenError::NotApproved,
        ));
        assert_eq!(
            format_error(&err),
            "Transaction reverted: ERC721: caller is not token owner or approved"
        );
    }

    #[test]
    fn test_format_error_connection() {
        let err = anyhow!("connection refused").context("unable to reach the node at http://x");
        assert!(format_error(&err).starts_with("Node unreachable."));
    }

    #[test]
    fn test_format_error_insufficient_funds() {
        let err = anyhow!("sender doesn't have enough funds: insufficient funds for gas");
        assert_eq!(format_error(&err), "Insufficient funds for this transaction.");
    }

    #[test]
    fn test_format_error_default_keeps_context() {
        let err = anyhow!("file missing").context("failed to read artifact");
        assert_eq!(format_error(&err), "failed to read artifact: file missing");
    }
}
