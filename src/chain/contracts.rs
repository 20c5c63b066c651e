//! ABI bindings for the marketplace contracts.
//!
//! Uses alloy's `sol!` macro to generate type-safe Rust bindings for the
//! Solidity interfaces the scripts interact with:
//!
//! - **NftMarketplace**: listings, purchases, proceeds.
//! - **BasicNft**: the ERC-721 collection listed on the marketplace.
//!
//! Only the interfaces live here. Bytecode comes from the Hardhat artifacts
//! at deploy time (see [`crate::engine::deploy`]).

use alloy::sol;

// ---------------------------------------------------------------------------
// NftMarketplace
// ---------------------------------------------------------------------------

sol! {
    /// Fixed-price NFT marketplace with pull-payment proceeds.
    #[sol(rpc)]
    contract NftMarketplace {
        struct Listing {
            uint256 price;
            address seller;
        }

        error NftMarketplace__PriceNotMet(address nftAddress, uint256 tokenId, uint256 price);
        error NftMarketplace__NftNotListed(address nftAddress, uint256 tokenId);
        error NftMarketplace__NftAlreadyListed(address nftAddress, uint256 tokenId);
        error NftMarketplace__NoProceeds();
        error NftMarketplace__NotOwner();
        error NftMarketplace__NotApprovedForMarketplace();
        error NftMarketplace__PriceMustBeGreaterThanZero();
        error NftMarketplace__TransferFailed();

        event ItemListed(
            address indexed seller,
            address indexed nftAddress,
            uint256 indexed tokenId,
            uint256 price
        );

        event ItemSold(
            address indexed buyer,
            address indexed nftAddress,
            uint256 indexed tokenId,
            uint256 price
        );

        event ItemCancelled(
            address indexed seller,
            address indexed nftAddress,
            uint256 indexed tokenId
        );

        function listItem(address nftAddress, uint256 tokenId, uint256 price) external;

        function buyItem(address nftAddress, uint256 tokenId) external payable;

        function cancelListing(address nftAddress, uint256 tokenId) external;

        function updateListing(address nftAddress, uint256 tokenId, uint256 newPrice) external;

        function withdrawProceeds() external;

        function getListing(address nftAddress, uint256 tokenId) external view returns (Listing memory);

        function getProceeds(address seller) external view returns (uint256);
    }
}

// ---------------------------------------------------------------------------
// BasicNft (ERC-721)
// ---------------------------------------------------------------------------

sol! {
    /// Minimal ERC-721 collection with an open mint.
    #[sol(rpc)]
    contract BasicNft {
        /// Mint the next token to `msg.sender`.
        function mintNft() external returns (uint256);

        function approve(address to, uint256 tokenId) external;

        function getApproved(uint256 tokenId) external view returns (address);

        function ownerOf(uint256 tokenId) external view returns (address);

        event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);

        event Approval(address indexed owner, address indexed approved, uint256 indexed tokenId);
    }
}

/// Artifact names, as compiled by Hardhat.
pub mod names {
    pub const NFT_MARKETPLACE: &str = "NftMarketplace";
    pub const BASIC_NFT: &str = "BasicNft";
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
