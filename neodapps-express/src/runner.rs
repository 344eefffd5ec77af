//! Non-blocking neo-express dispatch
//!
//! Every dispatch gets an [`InvocationId`]. A per-invocation poller watches
//! for completion and publishes one [`CommandCompleted`] event on the
//! runner's broadcast channel; a per-invocation subscriber picks out the event
//! carrying its own id, stops the poller and calls the completion callback.
//! Events for other ids are skipped, so any number of invocations can share
//! one channel.
//!
//! There is no cancellation: aborting observation never stops the child.

use parking_lot::Mutex;
use std::{
    fmt,
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
    time::Duration,
};
use tokio::{
    process::Command,
    sync::{
        broadcast::{self, error::RecvError},
        oneshot,
    },
    time::{interval, timeout, MissedTickBehavior},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::command::CommandSpec;
use crate::error::{ExpressError, Result};
use crate::settings::ExpressSettings;
use crate::terminal::{TerminalCommand, TerminalSurface};

const EVENT_CAPACITY: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InvocationId(Uuid);

impl InvocationId {
    pub fn new() -> Self {
        InvocationId(Uuid::new_v4())
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Captured result of a direct-mode run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandFailure {
    pub exit_code: Option<i32>,
    pub stderr: String,
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "neo-express reported: {}", self.stderr.trim())
    }
}

impl CommandOutput {
    /// neo-express signals errors on stderr; anything written there is a
    /// failure whatever the exit code says.
    pub fn failure(&self) -> Option<CommandFailure> {
        if self.stderr.is_empty() {
            return None;
        }
        Some(CommandFailure {
            exit_code: self.exit_code,
            stderr: self.stderr.clone(),
        })
    }

    pub fn is_success(&self) -> bool {
        self.failure().is_none()
    }
}

impl From<std::process::Output> for CommandOutput {
    fn from(output: std::process::Output) -> Self {
        Self {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Published once per invocation. Terminal-mode runs carry no output.
#[derive(Clone, Debug)]
pub struct CommandCompleted {
    pub id: InvocationId,
    pub output: Option<CommandOutput>,
}

/// Caller's side of one invocation.
#[derive(Debug)]
pub struct InvocationHandle<T> {
    id: InvocationId,
    rx: oneshot::Receiver<T>,
}

impl<T> InvocationHandle<T> {
    pub fn id(&self) -> InvocationId {
        self.id
    }

    /// Waits for the completion callback to have run, at most `limit`.
    pub async fn wait(self, limit: Duration) -> Result<T> {
        let Self { id, rx } = self;
        match timeout(limit, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(ExpressError::Abandoned(id)),
            Err(_) => {
                warn!(%id, ?limit, "gave up waiting for neo-express");
                Err(ExpressError::CompletionTimeout { id, after: limit })
            }
        }
    }
}

enum Observed {
    Running,
    Finished(Option<CommandOutput>),
}

#[derive(Clone)]
pub struct ExpressRunner {
    settings: ExpressSettings,
    project_root: PathBuf,
    events: broadcast::Sender<CommandCompleted>,
}

impl ExpressRunner {
    pub fn new(settings: ExpressSettings, project_root: impl Into<PathBuf>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            settings,
            project_root: project_root.into(),
            events,
        }
    }

    pub fn settings(&self) -> &ExpressSettings {
        &self.settings
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Every completion event, for all invocations.
    pub fn subscribe(&self) -> broadcast::Receiver<CommandCompleted> {
        self.events.subscribe()
    }

    /// Starts `spec` as a child process with captured output and returns
    /// immediately. `on_complete` runs once, after the process has exited.
    ///
    /// Fails before spawning anything if the executable or `DOTNET_ROOT` is
    /// not configured. A spawn failure is returned here and no completion
    /// event follows. Must be called from within a Tokio runtime.
    pub fn run_async<F>(
        &self,
        id: InvocationId,
        spec: &CommandSpec,
        on_complete: F,
    ) -> Result<InvocationHandle<CommandOutput>>
    where
        F: FnOnce(&CommandOutput) + Send + 'static,
    {
        let executable = self.settings.executable()?;
        let dotnet_root = self.settings.dotnet_root()?;

        let child = Command::new(executable)
            .args(spec.args())
            .env("DOTNET_ROOT", dotnet_root)
            .current_dir(&self.project_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExpressError::ProcessStart {
                program: executable.display().to_string(),
                source,
            })?;
        info!(%id, command = %spec, "neo-express started");

        let slot: Arc<Mutex<Option<CommandOutput>>> = Arc::new(Mutex::new(None));
        tokio::spawn({
            let slot = slot.clone();
            async move {
                let output = match child.wait_with_output().await {
                    Ok(output) => CommandOutput::from(output),
                    Err(e) => CommandOutput {
                        exit_code: None,
                        stdout: String::new(),
                        stderr: e.to_string(),
                    },
                };
                *slot.lock() = Some(output);
            }
        });

        let (tx, rx) = oneshot::channel();
        self.observe(
            id,
            move || match slot.lock().take() {
                Some(output) => Observed::Finished(Some(output)),
                None => Observed::Running,
            },
            move |output| {
                let output = output.unwrap_or_default();
                if let Some(failure) = output.failure() {
                    debug!(%id, exit_code = ?failure.exit_code, "neo-express wrote to stderr");
                }
                on_complete(&output);
                let _ = tx.send(output);
            },
        );
        Ok(InvocationHandle { id, rx })
    }

    /// Types `spec` into a new tab of `terminal` and returns immediately.
    /// `on_complete` runs once the terminal reports no running command.
    pub fn run_in_terminal<F>(
        &self,
        terminal: &dyn TerminalSurface,
        id: InvocationId,
        spec: &CommandSpec,
        tab_name: &str,
        on_complete: F,
    ) -> Result<InvocationHandle<()>>
    where
        F: FnOnce() + Send + 'static,
    {
        let executable = self.settings.executable()?;
        if !terminal.is_available() {
            return Err(ExpressError::TerminalUnavailable);
        }

        let program = executable.display().to_string();
        let env = self
            .settings
            .dotnet_root()
            .map(|root| vec![("DOTNET_ROOT".to_string(), root.display().to_string())])
            .unwrap_or_default();
        let command = TerminalCommand {
            line: spec.shell_line(&program),
            working_dir: self.project_root.clone(),
            tab_name: tab_name.to_string(),
            env,
        };
        let session = terminal
            .run(&command)
            .map_err(|source| ExpressError::ProcessStart { program, source })?;
        info!(%id, tab = tab_name, command = %spec, "neo-express started in terminal");

        let (tx, rx) = oneshot::channel();
        self.observe(
            id,
            move || {
                if session.has_running_commands() {
                    Observed::Running
                } else {
                    Observed::Finished(None)
                }
            },
            move |_| {
                on_complete();
                let _ = tx.send(());
            },
        );
        Ok(InvocationHandle { id, rx })
    }

    fn observe<P, D>(&self, id: InvocationId, mut probe: P, deliver: D)
    where
        P: FnMut() -> Observed + Send + 'static,
        D: FnOnce(Option<CommandOutput>) + Send + 'static,
    {
        // Subscribe before the poller exists so its event cannot be missed.
        let mut events = self.events.subscribe();
        let publisher = self.events.clone();
        let period = self.settings.poll_interval;

        let poller = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Observed::Finished(output) = probe() {
                    let _ = publisher.send(CommandCompleted { id, output });
                    return;
                }
            }
        });

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) if event.id == id => {
                        poller.abort();
                        info!(%id, "neo-express completed");
                        deliver(event.output);
                        return;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(%id, skipped, "completion events were dropped");
                    }
                    Err(RecvError::Closed) => return,
                }
            }
        });
    }
}
