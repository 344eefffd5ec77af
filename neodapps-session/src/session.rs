use neodapps_chain::{Chain, ChainDiscovery, InvokeFileItem};
use neodapps_express::{ExpressRunner, ShellTerminal, TerminalSurface};
use neodapps_rpc::{HttpNodeRpc, InvokeResult, LivenessProbe, NodeRpc, NodeRunningState};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};
use tracing::{debug, warn};

use crate::blocks::BlockService;
use crate::chains::ChainListService;
use crate::config::Settings;
use crate::contracts::ContractService;
use crate::error::Result;
use crate::events::{EventBus, SessionEvent};
use crate::express::NeoExpressService;
use crate::wallet::WalletService;

/// One open project. Lives as long as the project is open; every service in
/// it shares the same event bus.
pub struct Session {
    root: PathBuf,
    settings: Settings,
    events: EventBus,
    chains: Arc<ChainListService>,
    wallets: WalletService,
    contracts: ContractService,
    blocks: BlockService,
    probe: LivenessProbe,
    express: NeoExpressService,
}

impl Session {
    /// Opens `root` with `run` commands going to the system shell.
    pub fn open(root: impl Into<PathBuf>, settings: Settings) -> Result<Self> {
        let rpc: Arc<dyn NodeRpc> = Arc::new(HttpNodeRpc::new(settings.rpc_timeout())?);
        Ok(Self::with_parts(root, settings, rpc, Arc::new(ShellTerminal)))
    }

    pub fn with_parts(
        root: impl Into<PathBuf>,
        settings: Settings,
        rpc: Arc<dyn NodeRpc>,
        terminal: Arc<dyn TerminalSurface>,
    ) -> Self {
        let root = root.into();
        let events = EventBus::default();
        let chains = Arc::new(ChainListService::new(
            ChainDiscovery::new(&root),
            events.clone(),
        ));
        let runner = ExpressRunner::new(settings.express_settings(), &root);

        Self {
            wallets: WalletService::new(rpc.clone()).with_rpc_timeout(settings.rpc_timeout()),
            contracts: ContractService::new(settings.rpc_timeout()),
            blocks: BlockService::new(settings.rpc_timeout()),
            probe: LivenessProbe::with_rpc(rpc),
            express: NeoExpressService::new(runner, terminal, events.clone()),
            chains,
            events,
            settings,
            root,
        }
    }

    /// Replaces the wallet service, e.g. to change the scrypt cost.
    pub fn with_wallet_service(mut self, wallets: WalletService) -> Self {
        self.wallets = wallets;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn chains(&self) -> &ChainListService {
        &self.chains
    }

    pub fn wallets(&self) -> &WalletService {
        &self.wallets
    }

    pub fn contracts(&self) -> &ContractService {
        &self.contracts
    }

    pub fn blocks(&self) -> &BlockService {
        &self.blocks
    }

    pub fn probe(&self) -> &LivenessProbe {
        &self.probe
    }

    pub fn express(&self) -> &NeoExpressService {
        &self.express
    }

    /// Probes `chain` and publishes one [`SessionEvent::NodeStatusChanged`]
    /// per probed node.
    pub async fn refresh_node_status(&self, chain: &Chain) -> Result<Vec<(usize, NodeRunningState)>> {
        let states = self.probe.check_chain(chain).await?;
        let key = chain.key();
        for (node_index, state) in &states {
            self.events.publish(SessionEvent::NodeStatusChanged {
                chain: key.clone(),
                node_index: *node_index,
                state: *state,
            });
        }
        Ok(states)
    }

    /// Test-invokes `item`, on behalf of `account` when one is given.
    pub async fn test_invoke_item(
        &self,
        chain: &Chain,
        item: &InvokeFileItem,
        account: Option<&str>,
    ) -> Result<InvokeResult> {
        let signer = account
            .map(|address| self.wallets.script_hash(chain, address))
            .transpose()?;
        self.contracts.test_invoke(chain, item, signer.as_ref()).await
    }

    /// Signs `item` with the key of `account`, decrypted for this call only,
    /// and sends it. Returns the transaction hash.
    pub async fn invoke_item(&self, chain: &Chain, item: &InvokeFileItem, account: &str) -> Result<String> {
        let key = self.wallets.signing_key(chain, account).await?;
        self.contracts.invoke(chain, item, &key).await
    }

    /// Reloads the chain list whenever a private net gets created. Runs until
    /// the session's bus closes or the handle is aborted.
    pub fn spawn_reactor(&self) -> JoinHandle<()> {
        let mut events = self.events.subscribe();
        let chains = self.chains.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SessionEvent::PrivateNetCreated { name }) => {
                        debug!(%name, "looking for the new private net");
                        chains.load_and_look_for_new_chain(&name).await;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "session events were dropped"),
                    Err(RecvError::Closed) => return,
                }
            }
        })
    }
}
