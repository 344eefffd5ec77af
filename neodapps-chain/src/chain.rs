//! Public and private (neo-express) chains and their consensus nodes

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tracing::warn;

use crate::error::{ChainError, Result};
use crate::express::{ExpressConfig, ExpressConfigReader, ExpressConsensusNode, ExpressWallet};

/// neo-express nodes always listen on loopback.
pub const LOOPBACK_ENDPOINT: &str = "http://127.0.0.1";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChainType {
    Main,
    Test,
    Private,
}

impl fmt::Display for ChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChainType::Main => "Main Net",
            ChainType::Test => "Test Net",
            ChainType::Private => "Private",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicNode {
    endpoint: String,
    rpc_port: u16,
}

impl PublicNode {
    pub fn new(endpoint: impl Into<String>, rpc_port: u16) -> Self {
        Self {
            endpoint: endpoint.into(),
            rpc_port,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn rpc_port(&self) -> u16 {
        self.rpc_port
    }

    pub fn rpc_url(&self) -> String {
        format!("{}:{}", self.endpoint.trim_end_matches('/'), self.rpc_port)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExpressNode {
    pub rpc_port: u16,
    pub tcp_port: Option<u16>,
    pub ws_port: Option<u16>,
    pub debug_port: Option<u16>,
    pub wallet: Option<ExpressWallet>,
}

impl ExpressNode {
    pub fn rpc_url(&self) -> String {
        format!("{}:{}", LOOPBACK_ENDPOINT, self.rpc_port)
    }
}

impl From<&ExpressConsensusNode> for ExpressNode {
    fn from(node: &ExpressConsensusNode) -> Self {
        Self {
            rpc_port: node.rpc_port,
            tcp_port: node.tcp_port,
            ws_port: node.ws_port,
            debug_port: node.debug_port,
            wallet: node.wallet.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ConsensusNode {
    Public(PublicNode),
    Express(ExpressNode),
}

impl ConsensusNode {
    pub fn rpc_url(&self) -> String {
        match self {
            ConsensusNode::Public(node) => node.rpc_url(),
            ConsensusNode::Express(node) => node.rpc_url(),
        }
    }
}

impl fmt::Display for ConsensusNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rpc_url())
    }
}

/// Checks `index` against `len` and stores it.
fn store_selection(selected: &AtomicUsize, index: usize, len: usize) -> Result<()> {
    if index >= len {
        return Err(ChainError::InvalidSelection { index, len });
    }
    selected.store(index, Ordering::Relaxed);
    Ok(())
}

#[derive(Debug)]
pub struct PublicChain {
    chain_type: ChainType,
    nodes: Vec<PublicNode>,
    selected: AtomicUsize,
}

impl PublicChain {
    pub fn new(chain_type: ChainType, nodes: Vec<PublicNode>) -> Result<Self> {
        if nodes.is_empty() {
            return Err(ChainError::NoNodes);
        }
        Ok(Self::with_nodes(chain_type, nodes))
    }

    pub(crate) fn with_nodes(chain_type: ChainType, nodes: Vec<PublicNode>) -> Self {
        Self {
            chain_type,
            nodes,
            selected: AtomicUsize::new(0),
        }
    }

    pub fn chain_type(&self) -> ChainType {
        self.chain_type
    }

    pub fn nodes(&self) -> &[PublicNode] {
        &self.nodes
    }

    pub fn selected_index(&self) -> usize {
        self.selected.load(Ordering::Relaxed)
    }

    pub fn set_selected_index(&self, index: usize) -> Result<()> {
        store_selection(&self.selected, index, self.nodes.len())
    }

    pub fn selected_node(&self) -> &PublicNode {
        &self.nodes[self.selected_index()]
    }
}

/// A private net backed by a `.neo-express` file in the project directory.
///
/// The config is read lazily on first use; every node, wallet and magic
/// lookup goes through the owned [`ExpressConfigReader`].
pub struct PrivateChain {
    reader: ExpressConfigReader,
    selected: AtomicUsize,
}

impl PrivateChain {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            reader: ExpressConfigReader::new(config_path),
            selected: AtomicUsize::new(0),
        }
    }

    pub fn config_path(&self) -> &Path {
        self.reader.path()
    }

    /// File name including the extension, as passed to `neo-express -i`.
    pub fn file_name(&self) -> String {
        self.config_path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File name without the `.neo-express` extension.
    pub fn name(&self) -> String {
        self.config_path()
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn config(&self) -> Result<Arc<ExpressConfig>> {
        self.reader.get_config()
    }

    pub fn reader(&self) -> &ExpressConfigReader {
        &self.reader
    }

    pub fn magic(&self) -> Result<i64> {
        Ok(self.config()?.magic)
    }

    pub fn nodes(&self) -> Result<Vec<ExpressNode>> {
        Ok(self
            .config()?
            .consensus_nodes
            .iter()
            .map(ExpressNode::from)
            .collect())
    }

    /// Stored selection, reset to 0 if the config no longer has that many nodes.
    pub fn selected_index(&self) -> Result<usize> {
        Ok(self.selected_index_in(&*self.config()?))
    }

    /// Selection checked against one config snapshot.
    fn selected_index_in(&self, config: &ExpressConfig) -> usize {
        let len = config.consensus_nodes.len();
        let index = self.selected.load(Ordering::Relaxed);
        if index >= len {
            warn!(
                chain = %self.name(),
                index,
                len,
                "selected node vanished from config, falling back to node 0"
            );
            self.selected.store(0, Ordering::Relaxed);
            return 0;
        }
        index
    }

    pub fn set_selected_index(&self, index: usize) -> Result<()> {
        let len = self.config()?.consensus_nodes.len();
        store_selection(&self.selected, index, len)
    }

    pub fn selected_node(&self) -> Result<ExpressNode> {
        let config = self.config()?;
        self.selected_node_in(&config)
    }

    fn selected_node_in(&self, config: &ExpressConfig) -> Result<ExpressNode> {
        let index = self.selected_index_in(config);
        config
            .consensus_nodes
            .get(index)
            .map(ExpressNode::from)
            .ok_or(ChainError::NoNodes)
    }
}

impl fmt::Debug for PrivateChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateChain")
            .field("config_path", &self.config_path())
            .field("selected", &self.selected.load(Ordering::Relaxed))
            .finish()
    }
}

/// Identity of a chain within one project.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChainKey {
    Public(ChainType),
    Private(PathBuf),
}

#[derive(Debug)]
pub enum Chain {
    Public(PublicChain),
    Private(PrivateChain),
}

impl Chain {
    pub fn chain_type(&self) -> ChainType {
        match self {
            Chain::Public(chain) => chain.chain_type(),
            Chain::Private(_) => ChainType::Private,
        }
    }

    pub fn key(&self) -> ChainKey {
        match self {
            Chain::Public(chain) => ChainKey::Public(chain.chain_type()),
            Chain::Private(chain) => ChainKey::Private(chain.config_path().to_path_buf()),
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self, Chain::Private(_))
    }

    pub fn as_private(&self) -> Option<&PrivateChain> {
        match self {
            Chain::Private(chain) => Some(chain),
            Chain::Public(_) => None,
        }
    }

    pub fn nodes(&self) -> Result<Vec<ConsensusNode>> {
        match self {
            Chain::Public(chain) => Ok(chain
                .nodes()
                .iter()
                .cloned()
                .map(ConsensusNode::Public)
                .collect()),
            Chain::Private(chain) => Ok(chain
                .nodes()?
                .into_iter()
                .map(ConsensusNode::Express)
                .collect()),
        }
    }

    pub fn selected_index(&self) -> Result<usize> {
        match self {
            Chain::Public(chain) => Ok(chain.selected_index()),
            Chain::Private(chain) => chain.selected_index(),
        }
    }

    pub fn set_selected_index(&self, index: usize) -> Result<()> {
        match self {
            Chain::Public(chain) => chain.set_selected_index(index),
            Chain::Private(chain) => chain.set_selected_index(index),
        }
    }

    pub fn selected_node(&self) -> Result<ConsensusNode> {
        match self {
            Chain::Public(chain) => Ok(ConsensusNode::Public(chain.selected_node().clone())),
            Chain::Private(chain) => Ok(ConsensusNode::Express(chain.selected_node()?)),
        }
    }
}

impl PartialEq for Chain {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Chain {}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chain::Public(chain) => write!(f, "{}", chain.chain_type()),
            Chain::Private(chain) => f.write_str(&chain.name()),
        }
    }
}
