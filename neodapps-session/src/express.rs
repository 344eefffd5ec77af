//! neo-express actions offered to the user

use neodapps_chain::{ChainError, PrivateChain};
use neodapps_express::{
    CommandOutput, CommandSpec, ExpressRunner, InvocationHandle, InvocationId, TerminalSurface,
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::Result;
use crate::events::{EventBus, SessionEvent};

pub struct NeoExpressService {
    runner: ExpressRunner,
    terminal: Arc<dyn TerminalSurface>,
    events: EventBus,
}

impl NeoExpressService {
    pub fn new(runner: ExpressRunner, terminal: Arc<dyn TerminalSurface>, events: EventBus) -> Self {
        Self {
            runner,
            terminal,
            events,
        }
    }

    pub fn runner(&self) -> &ExpressRunner {
        &self.runner
    }

    /// `neo-express create`. On success [`SessionEvent::PrivateNetCreated`]
    /// is published with `name`.
    pub fn create_private_net(&self, nodes: u32, name: &str) -> Result<InvocationHandle<CommandOutput>> {
        let events = self.events.clone();
        let name = name.to_string();
        self.dispatch(CommandSpec::create(nodes, &name), move |output| {
            if output.is_success() {
                info!(%name, "private net created");
                events.publish(SessionEvent::PrivateNetCreated { name });
            }
        })
    }

    /// Starts one consensus node of `chain` in its own terminal tab.
    pub fn run_private_net(&self, chain: &PrivateChain, node_index: usize) -> Result<InvocationHandle<()>> {
        let len = chain.nodes()?.len();
        if node_index >= len {
            return Err(ChainError::InvalidSelection {
                index: node_index,
                len,
            }
            .into());
        }

        let id = InvocationId::new();
        let tab_name = format!("run {} (node {node_index})", chain.name());
        let events = self.events.clone();
        let handle = self.runner.run_in_terminal(
            self.terminal.as_ref(),
            id,
            &CommandSpec::run(&chain.file_name(), node_index),
            &tab_name,
            move || {
                events.publish(SessionEvent::CommandCompleted { id, failure: None });
            },
        )?;
        Ok(handle)
    }

    pub fn create_wallet(&self, name: &str, chain: &PrivateChain) -> Result<InvocationHandle<CommandOutput>> {
        self.dispatch(CommandSpec::wallet_create(&chain.file_name(), name), |_| {})
    }

    pub fn transfer(
        &self,
        amount: &str,
        asset: &str,
        from: &str,
        to: &str,
        chain: &PrivateChain,
    ) -> Result<InvocationHandle<CommandOutput>> {
        self.dispatch(
            CommandSpec::transfer(amount, asset, from, to, &chain.file_name()),
            |_| {},
        )
    }

    /// Direct-mode dispatch. Every completion is republished on the session
    /// bus, failures logged.
    fn dispatch<F>(&self, spec: CommandSpec, then: F) -> Result<InvocationHandle<CommandOutput>>
    where
        F: FnOnce(&CommandOutput) + Send + 'static,
    {
        let id = InvocationId::new();
        let events = self.events.clone();
        let command = spec.to_string();
        let handle = self.runner.run_async(id, &spec, move |output| {
            let failure = output.failure();
            if let Some(failure) = &failure {
                warn!(%id, %command, "{failure}");
            }
            then(output);
            events.publish(SessionEvent::CommandCompleted { id, failure });
        })?;
        Ok(handle)
    }
}
