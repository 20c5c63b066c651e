pub mod blocks;
pub mod deploy;
pub mod deployments;
pub mod frontend;
pub mod local;
pub mod marketplace;
pub mod onchain;
pub mod verify;
