//! neodapps-chain: chain model and project-local chain state
//!
//! This crate provides:
//! - The `Chain` / `ConsensusNode` model for public and neo-express chains
//! - Cached reading of `.neo-express` config files keyed by modification time
//! - Discovery of the chains available to a project directory
//! - Invoke files (JSON scripts of contract calls) with stable per-item ids

pub mod chain;
pub mod discovery;
pub mod error;
pub mod express;
pub mod invoke;
mod stamp;

pub use chain::{
    Chain, ChainKey, ChainType, ConsensusNode, ExpressNode, PrivateChain, PublicChain, PublicNode,
    LOOPBACK_ENDPOINT,
};
pub use discovery::{ChainDiscovery, RetryPolicy, EXPRESS_EXTENSION, TESTNET_RPC_PORT, TESTNET_SEEDS};
pub use error::{ChainError, Result};
pub use express::{
    ExpressAccountContract, ExpressConfig, ExpressConfigReader, ExpressConsensusNode,
    ExpressWallet, ExpressWalletAccount, DEFAULT_ADDRESS_VERSION,
};
pub use invoke::{InvokeFile, InvokeFileItem, ItemId};
