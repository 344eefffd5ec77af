use neodapps_chain::ChainKey;
use neodapps_express::{CommandFailure, InvocationId};
use neodapps_rpc::NodeRunningState;
use tokio::sync::broadcast;
use tracing::trace;

const EVENT_CAPACITY: usize = 256;

#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    NodeSelected { chain: ChainKey, node_index: usize },
    NodeDeselected,
    ChainListRefreshed { chains: usize },
    PrivateNetCreated { name: String },
    NodeStatusChanged {
        chain: ChainKey,
        node_index: usize,
        state: NodeRunningState,
    },
    CommandCompleted {
        id: InvocationId,
        failure: Option<CommandFailure>,
    },
}

/// Session-wide publish/subscribe. Publishing never blocks and never fails;
/// events sent while nobody listens are dropped.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }
}

impl EventBus {
    pub fn publish(&self, event: SessionEvent) {
        trace!(?event, "publish");
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }
}
