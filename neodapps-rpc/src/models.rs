//! Response shapes for the RPC methods this workspace uses.
//!
//! Only the fields read somewhere are modelled; anything else a node sends is
//! ignored. Numbers that nodes encode as strings (amounts, gas) stay strings.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RpcVersion {
    #[serde(default)]
    pub tcpport: Option<u16>,
    #[serde(default)]
    pub wsport: Option<u16>,
    #[serde(default)]
    pub nonce: Option<u64>,
    #[serde(default)]
    pub useragent: Option<String>,
    pub protocol: RpcProtocol,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RpcProtocol {
    /// Network magic. Older nodes report it as `magic`.
    #[serde(alias = "magic")]
    pub network: u32,
    #[serde(default)]
    pub addressversion: Option<u8>,
    #[serde(default)]
    pub msperblock: Option<u64>,
    #[serde(default)]
    pub validatorscount: Option<u32>,
    #[serde(default)]
    pub maxvaliduntilblockincrement: Option<u32>,
}

/// A deployed contract as listed by `getnativecontracts` or neo-express'
/// `expresslistcontracts`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContractInfo {
    #[serde(default)]
    pub id: Option<i64>,
    pub hash: String,
    #[serde(default)]
    pub manifest: Value,
}

impl ContractInfo {
    pub fn name(&self) -> Option<&str> {
        self.manifest.get("name").and_then(Value::as_str)
    }

    /// ABI methods from the manifest. A manifest without a readable ABI has
    /// no methods.
    pub fn methods(&self) -> Vec<ContractMethod> {
        self.manifest
            .get("abi")
            .and_then(|abi| abi.get("methods"))
            .and_then(|methods| serde_json::from_value(methods.clone()).ok())
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContractMethod {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDefinition>,
    #[serde(default)]
    pub returntype: Option<String>,
    #[serde(default)]
    pub safe: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Typed argument of `invokefunction`. Integers travel as decimal strings,
/// byte arrays as base64 and hashes as `0x` hex.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum ContractParameter {
    Any,
    Boolean(bool),
    Integer(String),
    ByteArray(String),
    String(String),
    Hash160(String),
    Hash256(String),
    PublicKey(String),
    Signature(String),
    Array(Vec<ContractParameter>),
}

/// Signer object of `invokefunction`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RpcSigner {
    pub account: String,
    pub scopes: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Nep17Balances {
    pub address: String,
    #[serde(default)]
    pub balance: Vec<Nep17Balance>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Nep17Balance {
    pub assethash: String,
    pub amount: String,
    #[serde(default)]
    pub lastupdatedblock: u32,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub decimals: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvokeResult {
    pub script: String,
    pub state: String,
    pub gasconsumed: String,
    #[serde(default)]
    pub exception: Option<String>,
    #[serde(default)]
    pub stack: Vec<Value>,
}

impl InvokeResult {
    pub fn halted(&self) -> bool {
        self.state == "HALT"
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub hash: String,
    pub index: u32,
    /// Milliseconds since the unix epoch.
    pub time: u64,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub nextconsensus: Option<String>,
    #[serde(default)]
    pub tx: Vec<BlockTransaction>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockTransaction {
    pub hash: String,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub sysfee: Option<String>,
    #[serde(default)]
    pub netfee: Option<String>,
}

/// Amount nodes send either as a JSON number or as a decimal string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Number(i64),
    Text(String),
}

impl Amount {
    pub fn value(&self) -> Option<i64> {
        match self {
            Amount::Number(n) => Some(*n),
            Amount::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkFee {
    pub networkfee: Amount,
}
