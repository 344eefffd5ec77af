//! Project chain discovery
//!
//! A project always sees the public test net first, followed by one private
//! chain per `*.neo-express` file directly inside the project root.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::chain::{Chain, ChainType, PrivateChain, PublicChain, PublicNode};

pub const EXPRESS_EXTENSION: &str = "neo-express";

pub const TESTNET_SEEDS: &[&str] = &[
    "http://seed1t.neo.org",
    "http://seed2t.neo.org",
    "http://seed3t.neo.org",
    "http://seed4t.neo.org",
    "http://seed5t.neo.org",
];
pub const TESTNET_RPC_PORT: u16 = 20332;

pub fn testnet() -> PublicChain {
    PublicChain::with_nodes(
        ChainType::Test,
        TESTNET_SEEDS
            .iter()
            .map(|seed| PublicNode::new(*seed, TESTNET_RPC_PORT))
            .collect(),
    )
}

/// Bounded wait for a freshly created config file to show up in listings.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            pause: Duration::from_secs(1),
        }
    }
}

pub struct ChainDiscovery {
    root: PathBuf,
    retry: RetryPolicy,
}

impl ChainDiscovery {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn discover_chains(&self) -> Vec<Chain> {
        Self::assemble(self.scan())
    }

    /// Like [`discover_chains`](Self::discover_chains), but rescans until a
    /// config named `expected` appears or the retry budget runs out. The last
    /// listing is returned either way.
    pub async fn discover_chains_awaiting(&self, expected: &str) -> Vec<Chain> {
        let mut files = Vec::new();
        for attempt in 1..=self.retry.attempts.max(1) {
            files = self.scan();
            if files.iter().any(|f| base_name(f) == expected) {
                debug!(expected, attempt, "found new neo-express config");
                return Self::assemble(files);
            }
            if attempt < self.retry.attempts {
                sleep(self.retry.pause).await;
            }
        }
        info!(
            expected,
            attempts = self.retry.attempts,
            "neo-express config did not appear, using last listing"
        );
        Self::assemble(files)
    }

    fn assemble(files: Vec<PathBuf>) -> Vec<Chain> {
        let mut chains = Vec::with_capacity(files.len() + 1);
        chains.push(Chain::Public(testnet()));
        chains.extend(files.into_iter().map(|p| Chain::Private(PrivateChain::new(p))));
        chains
    }

    fn scan(&self) -> Vec<PathBuf> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(root = %self.root.display(), error = %e, "cannot list project directory");
                return Vec::new();
            }
        };
        entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some(EXPRESS_EXTENSION))
            .collect()
    }
}

fn base_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainKey;
    use std::collections::HashSet;

    fn keys(chains: &[Chain]) -> HashSet<ChainKey> {
        chains.iter().map(Chain::key).collect()
    }

    #[test]
    fn testnet_comes_first_then_private_chains() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.neo-express"), "{}").unwrap();
        fs::write(dir.path().join("b.neo-express"), "{}").unwrap();
        fs::write(dir.path().join("notes.json"), "{}").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.neo-express"), "{}").unwrap();

        let chains = ChainDiscovery::new(dir.path()).discover_chains();
        assert_eq!(chains.len(), 3);
        assert_eq!(chains[0].chain_type(), ChainType::Test);
        assert_eq!(chains[0].nodes().unwrap().len(), 5);

        let names: HashSet<String> = chains[1..].iter().map(|c| c.to_string()).collect();
        assert_eq!(names, HashSet::from(["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn discovery_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("one.neo-express"), "{}").unwrap();
        fs::write(dir.path().join("two.neo-express"), "{}").unwrap();

        let discovery = ChainDiscovery::new(dir.path());
        let first = discovery.discover_chains();
        let second = discovery.discover_chains();
        assert_eq!(keys(&first), keys(&second));
        assert_eq!(first.len(), second.len());
    }

    #[test]
    fn unreadable_root_yields_only_testnet() {
        let chains = ChainDiscovery::new("/definitely/not/here").discover_chains();
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].key(), ChainKey::Public(ChainType::Test));
    }

    #[tokio::test(start_paused = true)]
    async fn awaiting_gives_up_after_three_scans() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("old.neo-express"), "{}").unwrap();

        let start = tokio::time::Instant::now();
        let chains = ChainDiscovery::new(dir.path())
            .discover_chains_awaiting("foo")
            .await;

        assert_eq!(start.elapsed(), Duration::from_secs(2));
        assert_eq!(chains.len(), 2);
        assert_eq!(chains[1].to_string(), "old");
    }

    #[tokio::test(start_paused = true)]
    async fn awaiting_returns_as_soon_as_file_exists() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("foo.neo-express"), "{}").unwrap();

        let start = tokio::time::Instant::now();
        let chains = ChainDiscovery::new(dir.path())
            .discover_chains_awaiting("foo")
            .await;

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(chains.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn awaiting_picks_up_a_late_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();

        let writer = tokio::spawn({
            let root = root.clone();
            async move {
                sleep(Duration::from_millis(1500)).await;
                fs::write(root.join("late.neo-express"), "{}").unwrap();
            }
        });

        let start = tokio::time::Instant::now();
        let chains = ChainDiscovery::new(&root)
            .discover_chains_awaiting("late")
            .await;
        writer.await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(2));
        assert!(chains.iter().any(|c| c.to_string() == "late"));
    }
}
