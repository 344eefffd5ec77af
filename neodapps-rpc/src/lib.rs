//! neodapps-rpc: talking to Neo N3 nodes over JSON-RPC
//!
//! - `RpcClient`: typed JSON-RPC 2.0 calls (block count, blocks, version,
//!   contracts, NEP-17 balances, test invocations, network fees, raw
//!   transactions)
//! - `LivenessProbe`: classifies a chain's nodes as running or not, comparing
//!   the network magic of private nodes against their neo-express config

pub mod client;
pub mod error;
pub mod models;
pub mod probe;

pub use client::RpcClient;
pub use error::{Result, RpcError};
pub use models::{
    Amount, BlockInfo, BlockTransaction, ContractInfo, ContractMethod, ContractParameter,
    InvokeResult, Nep17Balance, Nep17Balances, NetworkFee, ParameterDefinition, RpcProtocol,
    RpcSigner, RpcVersion,
};
pub use probe::{HttpNodeRpc, LivenessProbe, NodeRpc, NodeRunningState};
