//! Node liveness
//!
//! A node counts as running when it answers `getblockcount`. For neo-express
//! nodes the reported network magic must also match the chain's config, so a
//! different private net listening on the same port reads as not running.
//! Transport failures are never errors here; they are the "not running" signal.

use async_trait::async_trait;
use futures_util::future::join_all;
use neodapps_chain::{Chain, ChainError, ConsensusNode};
use std::{fmt, sync::Arc, time::Duration};
use tracing::debug;

use crate::client::RpcClient;
use crate::error::{Result, RpcError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum NodeRunningState {
    Running,
    NotRunning,
    /// Placeholder before the first probe; never returned by a probe.
    #[default]
    Unknown,
}

impl fmt::Display for NodeRunningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NodeRunningState::Running => "running",
            NodeRunningState::NotRunning => "not running",
            NodeRunningState::Unknown => "unknown",
        })
    }
}

/// The two RPC calls a probe needs.
#[async_trait]
pub trait NodeRpc: Send + Sync {
    async fn block_count(&self, url: &str) -> Result<u32>;
    async fn network_magic(&self, url: &str) -> Result<u32>;
}

pub struct HttpNodeRpc {
    http: reqwest::Client,
}

impl HttpNodeRpc {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::transport("client", e))?;
        Ok(Self { http })
    }

    fn client(&self, url: &str) -> RpcClient {
        RpcClient::with_client(self.http.clone(), url)
    }
}

#[async_trait]
impl NodeRpc for HttpNodeRpc {
    async fn block_count(&self, url: &str) -> Result<u32> {
        self.client(url).get_block_count().await
    }

    async fn network_magic(&self, url: &str) -> Result<u32> {
        self.client(url).get_network_magic().await
    }
}

#[derive(Clone)]
pub struct LivenessProbe {
    rpc: Arc<dyn NodeRpc>,
}

impl LivenessProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self::with_rpc(Arc::new(HttpNodeRpc::new(timeout)?)))
    }

    pub fn with_rpc(rpc: Arc<dyn NodeRpc>) -> Self {
        Self { rpc }
    }

    /// Probes one node of `chain`.
    ///
    /// Only a private chain's config read can fail; RPC failures of any kind
    /// become [`NodeRunningState::NotRunning`].
    pub async fn check_node_status(
        &self,
        chain: &Chain,
        node: &ConsensusNode,
    ) -> std::result::Result<NodeRunningState, ChainError> {
        let url = node.rpc_url();
        if let Err(e) = self.rpc.block_count(&url).await {
            debug!(%url, error = %e, "node did not answer getblockcount");
            return Ok(NodeRunningState::NotRunning);
        }

        let private = match chain {
            Chain::Public(_) => return Ok(NodeRunningState::Running),
            Chain::Private(private) => private,
        };

        let expected = private.magic()?;
        let state = match self.rpc.network_magic(&url).await {
            Ok(reported) if i64::from(reported) == expected => NodeRunningState::Running,
            Ok(reported) => {
                debug!(%url, reported, expected, "node answers for a different network");
                NodeRunningState::NotRunning
            }
            Err(e) => {
                debug!(%url, error = %e, "cannot read network magic");
                NodeRunningState::NotRunning
            }
        };
        Ok(state)
    }

    /// Every node of a private chain, probed concurrently, or just the selected
    /// node of a public chain. Returns `(node index, state)` pairs.
    pub async fn check_chain(
        &self,
        chain: &Chain,
    ) -> std::result::Result<Vec<(usize, NodeRunningState)>, ChainError> {
        let targets: Vec<(usize, ConsensusNode)> = match chain {
            Chain::Private(_) => chain.nodes()?.into_iter().enumerate().collect(),
            Chain::Public(_) => vec![(chain.selected_index()?, chain.selected_node()?)],
        };

        let probes = targets.iter().map(|(index, node)| async move {
            self.check_node_status(chain, node)
                .await
                .map(|state| (*index, state))
        });
        join_all(probes).await.into_iter().collect()
    }
}
