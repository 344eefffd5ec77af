use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::trace;

use crate::error::{Result, RpcError};
use crate::models::{
    BlockInfo, ContractInfo, ContractParameter, InvokeResult, Nep17Balances, NetworkFee, RpcSigner,
    RpcVersion,
};

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

/// JSON-RPC 2.0 client bound to one node URL.
#[derive(Clone, Debug)]
pub struct RpcClient {
    url: String,
    http: reqwest::Client,
}

impl RpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::transport("client", e))?;
        Ok(Self::with_client(http, url))
    }

    /// Shares an existing connection pool.
    pub fn with_client(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        trace!(url = %self.url, method, "rpc request");

        let response: RpcResponse = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RpcError::transport(method, e))?
            .json()
            .await
            .map_err(|e| RpcError::transport(method, e))?;

        if let Some(error) = response.error {
            return Err(RpcError::Server {
                method: method.to_string(),
                code: error.code,
                message: error.message,
            });
        }
        let result = response
            .result
            .ok_or_else(|| RpcError::MissingResult(method.to_string()))?;
        serde_json::from_value(result).map_err(|e| RpcError::decode(method, e))
    }

    pub async fn get_block_count(&self) -> Result<u32> {
        self.call("getblockcount", json!([])).await
    }

    pub async fn get_version(&self) -> Result<RpcVersion> {
        self.call("getversion", json!([])).await
    }

    /// Network magic as the node reports it, read as an unsigned 32 bit value.
    pub async fn get_network_magic(&self) -> Result<u32> {
        Ok(self.get_version().await?.protocol.network)
    }

    pub async fn get_native_contracts(&self) -> Result<Vec<ContractInfo>> {
        self.call("getnativecontracts", json!([])).await
    }

    /// neo-express only.
    pub async fn express_list_contracts(&self) -> Result<Vec<ContractInfo>> {
        self.call("expresslistcontracts", json!([])).await
    }

    pub async fn get_nep17_balances(&self, address: &str) -> Result<Nep17Balances> {
        self.call("getnep17balances", json!([address])).await
    }

    pub async fn invoke_function(
        &self,
        script_hash: &str,
        operation: &str,
        args: &[ContractParameter],
        signers: &[RpcSigner],
    ) -> Result<InvokeResult> {
        self.call("invokefunction", json!([script_hash, operation, args, signers]))
            .await
    }

    /// Verbose block at `index`.
    pub async fn get_block(&self, index: u32) -> Result<BlockInfo> {
        self.call("getblock", json!([index, true])).await
    }

    /// Network fee for a base64 encoded transaction whose witnesses carry the
    /// verification scripts.
    pub async fn calculate_network_fee(&self, tx_base64: &str) -> Result<i64> {
        let fee: NetworkFee = self.call("calculatenetworkfee", json!([tx_base64])).await?;
        fee.networkfee
            .value()
            .ok_or_else(|| RpcError::decode("calculatenetworkfee", "networkfee is not an integer"))
    }

    /// Broadcasts a base64 encoded transaction and returns its hash.
    pub async fn send_raw_transaction(&self, tx_base64: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct Sent {
            hash: String,
        }
        let sent: Sent = self.call("sendrawtransaction", json!([tx_base64])).await?;
        Ok(sent.hash)
    }
}
