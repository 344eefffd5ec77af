//! neo-express private chain configuration
//!
//! The config file is owned by neo-express; this side only reads it. Reads go
//! through [`ExpressConfigReader`], which reparses the file only when its
//! modification time moves forward.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tracing::debug;

use crate::error::{ChainError, Result};
use crate::stamp::FileStamp;

/// Address version used by neo-express for N3 networks.
pub const DEFAULT_ADDRESS_VERSION: u8 = 53;

fn default_address_version() -> u8 {
    DEFAULT_ADDRESS_VERSION
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExpressConfig {
    pub magic: i64,
    #[serde(default = "default_address_version")]
    pub address_version: u8,
    pub consensus_nodes: Vec<ExpressConsensusNode>,
    #[serde(default)]
    pub wallets: Vec<ExpressWallet>,
    #[serde(default)]
    pub settings: HashMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExpressConsensusNode {
    pub rpc_port: u16,
    #[serde(default)]
    pub tcp_port: Option<u16>,
    #[serde(default)]
    pub ws_port: Option<u16>,
    #[serde(default)]
    pub debug_port: Option<u16>,
    /// Consensus ("genesis") wallet of this node.
    #[serde(default)]
    pub wallet: Option<ExpressWallet>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpressWallet {
    pub name: String,
    #[serde(default)]
    pub accounts: Vec<ExpressWalletAccount>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExpressWalletAccount {
    /// Hex encoded private key, stored in the clear by neo-express.
    pub private_key: String,
    pub script_hash: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub contract: Option<ExpressAccountContract>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpressAccountContract {
    pub script: String,
    #[serde(default)]
    pub parameters: Vec<String>,
}

impl ExpressConfig {
    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let config: ExpressConfig =
            serde_json::from_str(text).map_err(|e| ChainError::config_read(path, e))?;
        if config.consensus_nodes.is_empty() {
            return Err(ChainError::config_read(path, "config declares no consensus nodes"));
        }
        Ok(config)
    }

    pub fn wallet(&self, name: &str) -> Option<&ExpressWallet> {
        self.wallets.iter().find(|w| w.name == name)
    }
}

struct CachedConfig {
    config: Option<Arc<ExpressConfig>>,
    stamp: FileStamp,
}

/// Single read path for a private chain's config file.
pub struct ExpressConfigReader {
    path: PathBuf,
    cache: Mutex<CachedConfig>,
    reloads: AtomicUsize,
}

impl ExpressConfigReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(CachedConfig {
                config: None,
                stamp: FileStamp::default(),
            }),
            reloads: AtomicUsize::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the cached config, reparsing when the file changed since the
    /// last successful parse.
    ///
    /// A missing or unreadable file is an error even if an older config is
    /// cached. A failed reparse leaves the previous cache in place.
    pub fn get_config(&self) -> Result<Arc<ExpressConfig>> {
        let mut cached = self.cache.lock();
        let modified =
            FileStamp::observe(&self.path).map_err(|e| ChainError::config_read(&self.path, e))?;

        if let Some(config) = cached.config.as_ref() {
            if !cached.stamp.is_stale(modified) {
                return Ok(config.clone());
            }
        }

        let text =
            fs::read_to_string(&self.path).map_err(|e| ChainError::config_read(&self.path, e))?;
        let config = Arc::new(ExpressConfig::parse(&self.path, &text)?);
        self.reloads.fetch_add(1, Ordering::Relaxed);
        debug!(path = %self.path.display(), magic = config.magic, ?modified, "parsed neo-express config");

        cached.config = Some(config.clone());
        cached.stamp.record(modified);
        Ok(config)
    }

    /// Number of successful parses so far.
    pub fn reload_count(&self) -> usize {
        self.reloads.load(Ordering::Relaxed)
    }
}
