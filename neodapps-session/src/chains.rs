//! Chain list and the applied (selected) chain of a session

use neodapps_chain::{Chain, ChainDiscovery, ChainKey};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

use crate::error::Result;
use crate::events::{EventBus, SessionEvent};

pub struct ChainListService {
    discovery: ChainDiscovery,
    chains: RwLock<Vec<Arc<Chain>>>,
    applied: RwLock<Option<Arc<Chain>>>,
    events: EventBus,
}

impl ChainListService {
    pub fn new(discovery: ChainDiscovery, events: EventBus) -> Self {
        Self {
            discovery,
            chains: RwLock::new(Vec::new()),
            applied: RwLock::new(None),
            events,
        }
    }

    /// Rescans the project directory. Chains that survive the rescan keep
    /// their instance, so config caches and node selection carry over.
    pub fn load_chains(&self) -> Vec<Arc<Chain>> {
        let found = self.discovery.discover_chains();
        self.replace(found)
    }

    /// Rescans until `name.neo-express` shows up, within the discovery retry
    /// budget. Returns the last listing either way.
    pub async fn load_and_look_for_new_chain(&self, name: &str) -> Vec<Arc<Chain>> {
        let found = self.discovery.discover_chains_awaiting(name).await;
        self.replace(found)
    }

    pub fn chains(&self) -> Vec<Arc<Chain>> {
        self.chains.read().clone()
    }

    /// Looks a chain up by display name (`Test Net`, `testnet`, `dev`) or by
    /// config file name (`dev.neo-express`).
    pub fn find(&self, name: &str) -> Option<Arc<Chain>> {
        let wanted = squash(name);
        self.chains
            .read()
            .iter()
            .find(|chain| {
                squash(&chain.to_string()) == wanted
                    || chain.as_private().is_some_and(|p| p.file_name() == name)
            })
            .cloned()
    }

    pub fn applied_chain(&self) -> Option<Arc<Chain>> {
        self.applied.read().clone()
    }

    /// Applies `chain` with `node_index` selected, or clears the selection.
    /// The event is published before this returns.
    pub fn set_applied_chain(&self, chain: Option<Arc<Chain>>, node_index: usize) -> Result<()> {
        match chain {
            Some(chain) => {
                chain.set_selected_index(node_index)?;
                let key = chain.key();
                *self.applied.write() = Some(chain);
                info!(chain = ?key, node_index, "chain applied");
                self.events.publish(SessionEvent::NodeSelected {
                    chain: key,
                    node_index,
                });
            }
            None => {
                *self.applied.write() = None;
                self.events.publish(SessionEvent::NodeDeselected);
            }
        }
        Ok(())
    }

    fn replace(&self, found: Vec<Chain>) -> Vec<Arc<Chain>> {
        let mut chains = self.chains.write();
        let merged: Vec<Arc<Chain>> = found
            .into_iter()
            .map(|chain| {
                let key: ChainKey = chain.key();
                chains
                    .iter()
                    .find(|existing| existing.key() == key)
                    .cloned()
                    .unwrap_or_else(|| Arc::new(chain))
            })
            .collect();
        *chains = merged.clone();
        drop(chains);

        self.events.publish(SessionEvent::ChainListRefreshed {
            chains: merged.len(),
        });
        merged
    }
}

fn squash(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
