//! Recent blocks of a chain and a feed of the ones that follow

use neodapps_chain::Chain;
use neodapps_rpc::{BlockInfo, RpcClient};
use std::time::Duration;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, warn};

use crate::error::Result;

/// Blocks shown before following new ones.
pub const DEFAULT_RECENT_BLOCKS: u32 = 10;
/// Neo N3 produces a block every 15 s by default; one second keeps the feed
/// current without flooding the node.
pub const DEFAULT_BLOCK_POLL: Duration = Duration::from_secs(1);

const SUBSCRIPTION_CAPACITY: usize = 64;

pub struct BlockService {
    rpc_timeout: Duration,
}

impl BlockService {
    pub fn new(rpc_timeout: Duration) -> Self {
        Self { rpc_timeout }
    }

    /// The last `count` blocks, oldest first.
    pub async fn recent_blocks(&self, chain: &Chain, count: u32) -> Result<Vec<BlockInfo>> {
        let client = self.client(chain)?;
        let height = client.get_block_count().await?;

        let mut blocks = Vec::with_capacity(count.min(height) as usize);
        for index in height.saturating_sub(count)..height {
            blocks.push(client.get_block(index).await?);
        }
        Ok(blocks)
    }

    /// Delivers the last `count` blocks, then every new block, checking the
    /// height every `poll`. The feed stops when the subscription is dropped.
    pub async fn subscribe(&self, chain: &Chain, count: u32, poll: Duration) -> Result<BlockSubscription> {
        let client = self.client(chain)?;
        let height = client.get_block_count().await?;
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_CAPACITY);
        let task = tokio::spawn(follow(client, height.saturating_sub(count), poll, tx));
        debug!(chain = %chain, from = height.saturating_sub(count), "following blocks");
        Ok(BlockSubscription { rx, task })
    }

    fn client(&self, chain: &Chain) -> Result<RpcClient> {
        let node = chain.selected_node()?;
        Ok(RpcClient::new(node.rpc_url(), self.rpc_timeout)?)
    }
}

/// Node errors are logged and retried on the next tick; blocks are never
/// skipped.
async fn follow(client: RpcClient, mut next: u32, poll: Duration, tx: mpsc::Sender<BlockInfo>) {
    let mut ticker = time::interval(poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if tx.is_closed() {
            return;
        }
        let height = match client.get_block_count().await {
            Ok(height) => height,
            Err(e) => {
                warn!(url = %client.url(), error = %e, "block count failed");
                continue;
            }
        };
        while next < height {
            match client.get_block(next).await {
                Ok(block) => {
                    if tx.send(block).await.is_err() {
                        debug!("block subscriber went away");
                        return;
                    }
                    next += 1;
                }
                Err(e) => {
                    warn!(url = %client.url(), index = next, error = %e, "fetching block failed");
                    break;
                }
            }
        }
    }
}

pub struct BlockSubscription {
    rx: mpsc::Receiver<BlockInfo>,
    task: JoinHandle<()>,
}

impl BlockSubscription {
    pub async fn recv(&mut self) -> Option<BlockInfo> {
        self.rx.recv().await
    }
}

impl Drop for BlockSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
