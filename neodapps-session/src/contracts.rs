//! Contract listings and invoke file steps, run through the chain's selected
//! node
//!
//! A step names its contract by manifest name (or hash) and its operation by
//! ABI method name. Arguments are plain JSON in the file and get their Neo
//! type from the method's parameter list; an argument written as
//! `{"type": ..., "value": ...}` is taken as is.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use neodapps_chain::{Chain, InvokeFileItem, DEFAULT_ADDRESS_VERSION};
use neodapps_crypto::{
    address_to_script_hash, script_hash_to_hex, tx::DEFAULT_MAX_VALID_UNTIL_BLOCK_INCREMENT, KeyPair,
    Signer, Transaction, Witness, WitnessScope,
};
use neodapps_rpc::{
    ContractInfo, ContractMethod, ContractParameter, InvokeResult, RpcClient, RpcSigner,
};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, SessionError};

/// An invoke file step matched against what the chain has deployed.
#[derive(Clone, Debug, PartialEq)]
pub struct ContractCall {
    pub contract: ContractInfo,
    pub method: ContractMethod,
    pub args: Vec<ContractParameter>,
}

pub struct ContractService {
    rpc_timeout: Duration,
}

impl ContractService {
    pub fn new(rpc_timeout: Duration) -> Self {
        Self { rpc_timeout }
    }

    /// Deployed contracts. Only neo-express can list them; public chains
    /// yield an empty list.
    pub async fn get_contracts(&self, chain: &Chain) -> Result<Vec<ContractInfo>> {
        deployed(&self.client(chain)?, chain).await
    }

    pub async fn get_native_contracts(&self, chain: &Chain) -> Result<Vec<ContractInfo>> {
        Ok(self.client(chain)?.get_native_contracts().await?)
    }

    pub async fn resolve(&self, chain: &Chain, item: &InvokeFileItem) -> Result<ContractCall> {
        resolve_with(&self.client(chain)?, chain, item).await
    }

    /// Runs `item` without persisting anything, optionally on behalf of
    /// `signer` (a script hash) with `CalledByEntry` scope.
    pub async fn test_invoke(
        &self,
        chain: &Chain,
        item: &InvokeFileItem,
        signer: Option<&[u8; 20]>,
    ) -> Result<InvokeResult> {
        let client = self.client(chain)?;
        let call = resolve_with(&client, chain, item).await?;
        let signers: Vec<RpcSigner> = signer.into_iter().map(rpc_signer).collect();
        let result = client
            .invoke_function(&call.contract.hash, &call.method.name, &call.args, &signers)
            .await?;
        debug!(
            contract = %call.contract.hash,
            operation = %call.method.name,
            state = %result.state,
            gas = %result.gasconsumed,
            "test invocation"
        );
        Ok(result)
    }

    /// Builds, signs and sends a transaction running `item` with `key` as the
    /// sender. Returns the transaction hash reported by the node.
    ///
    /// The script and system fee come from a test invocation first; a test run
    /// that does not end in `HALT` sends nothing.
    pub async fn invoke(&self, chain: &Chain, item: &InvokeFileItem, key: &KeyPair) -> Result<String> {
        let client = self.client(chain)?;
        let call = resolve_with(&client, chain, item).await?;
        let account = key.script_hash();

        let result = client
            .invoke_function(
                &call.contract.hash,
                &call.method.name,
                &call.args,
                &[rpc_signer(&account)],
            )
            .await?;
        if !result.halted() {
            return Err(SessionError::InvocationFault {
                state: result.state,
                exception: result.exception,
            });
        }
        let script = STANDARD
            .decode(result.script.as_bytes())
            .map_err(|e| SessionError::UnexpectedResponse(format!("invocation script: {e}")))?;
        let system_fee: i64 = result.gasconsumed.trim().parse().map_err(|_| {
            SessionError::UnexpectedResponse(format!("gasconsumed {}", result.gasconsumed))
        })?;

        let version = client.get_version().await?;
        let increment = version
            .protocol
            .maxvaliduntilblockincrement
            .unwrap_or(DEFAULT_MAX_VALID_UNTIL_BLOCK_INCREMENT);
        let height = client.get_block_count().await?;
        let valid_until = height.saturating_add(increment).saturating_sub(1);

        let signer = Signer {
            account,
            scopes: WitnessScope::CalledByEntry,
        };
        let mut tx = Transaction::new(script, vec![signer], nonce(), valid_until);
        tx.system_fee = system_fee;
        tx.witnesses = vec![Witness::unsigned(key)];
        tx.network_fee = client.calculate_network_fee(&tx.to_base64()).await?;
        tx.sign(key, version.protocol.network);

        let hash = client.send_raw_transaction(&tx.to_base64()).await?;
        info!(
            contract = %call.contract.hash,
            operation = %call.method.name,
            %hash,
            system_fee,
            network_fee = tx.network_fee,
            "transaction sent"
        );
        Ok(hash)
    }

    fn client(&self, chain: &Chain) -> Result<RpcClient> {
        let node = chain.selected_node()?;
        Ok(RpcClient::new(node.rpc_url(), self.rpc_timeout)?)
    }
}

async fn deployed(client: &RpcClient, chain: &Chain) -> Result<Vec<ContractInfo>> {
    match chain {
        Chain::Public(_) => Ok(Vec::new()),
        Chain::Private(_) => Ok(client.express_list_contracts().await?),
    }
}

/// Native contracts first, then deployed ones; the last contract matching the
/// step wins, so a redeployed contract shadows its older versions.
async fn resolve_with(client: &RpcClient, chain: &Chain, item: &InvokeFileItem) -> Result<ContractCall> {
    let mut contracts = client.get_native_contracts().await?;
    contracts.extend(deployed(client, chain).await?);
    let contract = contracts
        .into_iter()
        .rev()
        .find(|c| names_contract(c, &item.contract))
        .ok_or_else(|| SessionError::UnknownContract(item.contract.clone()))?;

    let methods = contract.methods();
    let method = methods
        .iter()
        .find(|m| m.name == item.operation && m.parameters.len() == item.args.len())
        .or_else(|| methods.iter().find(|m| m.name == item.operation))
        .cloned()
        .ok_or_else(|| SessionError::UnknownOperation {
            contract: item.contract.clone(),
            operation: item.operation.clone(),
        })?;

    if item.args.len() > method.parameters.len() {
        warn!(
            operation = %method.name,
            expected = method.parameters.len(),
            given = item.args.len(),
            "extra arguments ignored"
        );
    }
    let version = address_version(chain)?;
    let args = method
        .parameters
        .iter()
        .enumerate()
        .map(|(i, parameter)| {
            let invalid = |reason: String| SessionError::InvalidArgument {
                parameter: parameter.name.clone(),
                reason,
            };
            let value = item.args.get(i).ok_or_else(|| invalid("missing".to_string()))?;
            to_parameter(&parameter.kind, value, version).map_err(invalid)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ContractCall {
        contract,
        method,
        args,
    })
}

fn names_contract(contract: &ContractInfo, name: &str) -> bool {
    let bare = |h: &str| h.trim_start_matches("0x").to_ascii_lowercase();
    contract.name() == Some(name) || bare(&contract.hash) == bare(name)
}

fn address_version(chain: &Chain) -> Result<u8> {
    match chain {
        Chain::Private(private) => Ok(private.config()?.address_version),
        Chain::Public(_) => Ok(DEFAULT_ADDRESS_VERSION),
    }
}

fn rpc_signer(account: &[u8; 20]) -> RpcSigner {
    RpcSigner {
        account: script_hash_to_hex(account),
        scopes: WitnessScope::CalledByEntry.as_str().to_string(),
    }
}

fn nonce() -> u32 {
    Uuid::new_v4().as_u128() as u32
}

/// Converts one invoke file argument to the ABI type `kind`.
fn to_parameter(kind: &str, value: &Value, version: u8) -> std::result::Result<ContractParameter, String> {
    if let Some(explicit) = explicit(value) {
        return Ok(explicit);
    }
    match kind {
        "Boolean" => to_bool(value).map(ContractParameter::Boolean),
        "Integer" => to_integer(value).map(ContractParameter::Integer),
        "ByteArray" => Ok(ContractParameter::ByteArray(STANDARD.encode(text(value)))),
        "String" => Ok(ContractParameter::String(text(value))),
        "Hash160" => to_hash160(value, version).map(ContractParameter::Hash160),
        "Hash256" => Ok(ContractParameter::Hash256(text(value))),
        "PublicKey" => Ok(ContractParameter::PublicKey(text(value))),
        "Signature" => Ok(ContractParameter::Signature(text(value))),
        "Array" => match value {
            Value::Array(items) => Ok(ContractParameter::Array(items.iter().map(infer).collect())),
            _ => Err("expected a JSON array".to_string()),
        },
        _ => Ok(infer(value)),
    }
}

fn explicit(value: &Value) -> Option<ContractParameter> {
    value.get("type")?;
    serde_json::from_value(value.clone()).ok()
}

/// Type from the JSON value alone, for `Any` parameters and array items.
fn infer(value: &Value) -> ContractParameter {
    if let Some(explicit) = explicit(value) {
        return explicit;
    }
    match value {
        Value::Null => ContractParameter::Any,
        Value::Bool(b) => ContractParameter::Boolean(*b),
        Value::Number(n) if n.is_i64() || n.is_u64() => ContractParameter::Integer(n.to_string()),
        Value::Array(items) => ContractParameter::Array(items.iter().map(infer).collect()),
        other => ContractParameter::String(text(other)),
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_bool(value: &Value) -> std::result::Result<bool, String> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(n.as_f64().unwrap_or(0.0) != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "y" | "t" | "1" => Ok(true),
            "false" | "no" | "off" | "n" | "f" | "0" => Ok(false),
            other => Err(format!("{other} is not a boolean")),
        },
        other => Err(format!("{other} is not a boolean")),
    }
}

fn to_integer(value: &Value) -> std::result::Result<String, String> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        Value::String(s) => s
            .trim()
            .parse::<i128>()
            .map(|n| n.to_string())
            .map_err(|_| format!("{s} is not an integer")),
        other => Err(format!("{other} is not an integer")),
    }
}

/// Addresses and `0x` script hashes.
fn to_hash160(value: &Value, version: u8) -> std::result::Result<String, String> {
    let Value::String(s) = value else {
        return Err(format!("{value} is not an address"));
    };
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x") {
        if hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Ok(s.to_ascii_lowercase());
        }
    }
    address_to_script_hash(s, version)
        .map(|hash| script_hash_to_hex(&hash))
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use neodapps_chain::{ChainType, PrivateChain, PublicChain, PublicNode};
    use serde_json::json;

    const KEY: &str = "1dd37fba80fec4e6a6f13fd708d8dcb3b29def768017052f6c930fa1c5d90bbb";

    #[tokio::test]
    async fn public_chains_list_no_deployed_contracts() {
        let chain = Chain::Public(
            PublicChain::new(ChainType::Main, vec![PublicNode::new("http://127.0.0.1", 9)]).unwrap(),
        );
        let service = ContractService::new(Duration::from_secs(1));
        assert!(service.get_contracts(&chain).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreachable_private_node_is_an_rpc_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dev.neo-express");
        let body = json!({ "magic": 1, "consensus-nodes": [{ "rpc-port": port }] });
        std::fs::write(&path, body.to_string()).unwrap();

        let chain = Chain::Private(PrivateChain::new(path));
        let service = ContractService::new(Duration::from_secs(1));
        assert!(matches!(
            service.get_contracts(&chain).await,
            Err(SessionError::Rpc(_))
        ));
    }

    #[test]
    fn arguments_follow_the_abi_type() {
        let key = KeyPair::from_hex(KEY).unwrap();
        let address = key.address(53);
        let hash = script_hash_to_hex(&key.script_hash());

        assert_eq!(
            to_parameter("Hash160", &json!(address), 53).unwrap(),
            ContractParameter::Hash160(hash.clone())
        );
        assert_eq!(
            to_parameter("Hash160", &json!(hash.to_uppercase().replace("0X", "0x")), 53).unwrap(),
            ContractParameter::Hash160(hash)
        );
        assert!(to_parameter("Hash160", &json!(address), 23).is_err());
        assert!(to_parameter("Hash160", &json!(5), 53).is_err());

        assert_eq!(
            to_parameter("Integer", &json!(10), 53).unwrap(),
            ContractParameter::Integer("10".into())
        );
        assert_eq!(
            to_parameter("Integer", &json!(" 100000000000000000000 "), 53).unwrap(),
            ContractParameter::Integer("100000000000000000000".into())
        );
        assert!(to_parameter("Integer", &json!("ten"), 53).is_err());
        assert!(to_parameter("Integer", &json!(1.5), 53).is_err());

        assert_eq!(
            to_parameter("Boolean", &json!("Yes"), 53).unwrap(),
            ContractParameter::Boolean(true)
        );
        assert!(to_parameter("Boolean", &json!("maybe"), 53).is_err());

        assert_eq!(
            to_parameter("String", &json!(7), 53).unwrap(),
            ContractParameter::String("7".into())
        );
        assert_eq!(
            to_parameter("ByteArray", &json!("hi"), 53).unwrap(),
            ContractParameter::ByteArray("aGk=".into())
        );
        assert!(to_parameter("Array", &json!("x"), 53).is_err());
    }

    #[test]
    fn untyped_and_explicit_arguments() {
        assert_eq!(to_parameter("Any", &json!(null), 53).unwrap(), ContractParameter::Any);
        assert_eq!(
            to_parameter("Any", &json!([1, "a", true, null]), 53).unwrap(),
            ContractParameter::Array(vec![
                ContractParameter::Integer("1".into()),
                ContractParameter::String("a".into()),
                ContractParameter::Boolean(true),
                ContractParameter::Any,
            ])
        );
        // An explicit type wins over the ABI type.
        assert_eq!(
            to_parameter("Integer", &json!({ "type": "String", "value": "x" }), 53).unwrap(),
            ContractParameter::String("x".into())
        );
    }

    #[test]
    fn contracts_match_by_name_or_hash() {
        let contract: ContractInfo = serde_json::from_value(json!({
            "hash": "0xD2a4cff31913016155e38e474a2c06d08be276cf",
            "manifest": { "name": "GasToken" }
        }))
        .unwrap();
        assert!(names_contract(&contract, "GasToken"));
        assert!(names_contract(&contract, "0xd2a4cff31913016155e38e474a2c06d08be276cf"));
        assert!(names_contract(&contract, "d2a4cff31913016155e38e474a2c06d08be276cf"));
        assert!(!names_contract(&contract, "gastoken"));
    }
}
