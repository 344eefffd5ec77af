//! Terminal hosting for long-running neo-express commands
//!
//! A terminal gives no process handle back, only the ability to ask whether a
//! command is still running in it. The runner polls that.

use parking_lot::Mutex;
use std::{
    io,
    path::PathBuf,
    process::{Child, Command},
    sync::Arc,
};
use tracing::info;

/// A command line to type into a terminal tab.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TerminalCommand {
    pub line: String,
    pub working_dir: PathBuf,
    pub tab_name: String,
    pub env: Vec<(String, String)>,
}

pub trait TerminalSession: Send + Sync {
    fn has_running_commands(&self) -> bool;
}

pub trait TerminalSurface: Send + Sync {
    fn is_available(&self) -> bool {
        true
    }

    fn run(&self, command: &TerminalCommand) -> io::Result<Arc<dyn TerminalSession>>;
}

/// Runs terminal commands through the system shell, sharing this process'
/// stdout and stderr.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShellTerminal;

struct ShellSession {
    child: Mutex<Child>,
}

impl TerminalSession for ShellSession {
    fn has_running_commands(&self) -> bool {
        matches!(self.child.lock().try_wait(), Ok(None))
    }
}

impl TerminalSurface for ShellTerminal {
    fn run(&self, command: &TerminalCommand) -> io::Result<Arc<dyn TerminalSession>> {
        info!(tab = %command.tab_name, line = %command.line, "starting terminal command");
        let mut shell = shell_command(&command.line);
        shell.current_dir(&command.working_dir);
        for (key, value) in &command.env {
            shell.env(key, value);
        }
        let child = shell.spawn()?;
        Ok(Arc::new(ShellSession {
            child: Mutex::new(child),
        }))
    }
}

#[cfg(unix)]
fn shell_command(line: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(line);
    cmd
}

// The line is already quoted for cmd, so it must not be re-escaped.
#[cfg(windows)]
fn shell_command(line: &str) -> Command {
    use std::os::windows::process::CommandExt;
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").raw_arg(line);
    cmd
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn shell_session_reports_when_the_command_ends() {
        let dir = tempfile::tempdir().unwrap();
        let command = TerminalCommand {
            line: "sleep 0.2; test \"$MARKER\" = yes".to_string(),
            working_dir: dir.path().to_path_buf(),
            tab_name: "test".to_string(),
            env: vec![("MARKER".to_string(), "yes".to_string())],
        };
        let session = ShellTerminal.run(&command).unwrap();
        assert!(session.has_running_commands());

        let deadline = Instant::now() + Duration::from_secs(10);
        while session.has_running_commands() {
            assert!(Instant::now() < deadline, "shell never finished");
            std::thread::sleep(Duration::from_millis(20));
        }
    }
}
