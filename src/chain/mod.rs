pub mod client;
pub mod contracts;
pub mod signer;
pub mod types;
