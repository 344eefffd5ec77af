//! neodapps-express: driving the neo-express CLI
//!
//! This crate provides:
//! - `ExpressCommand` / `CommandSpec`: the verbs and argument lists neo-express accepts
//! - `ExpressSettings`: where the executable and the .NET runtime live
//! - `ExpressRunner`: non-blocking dispatch with completion callbacks matched
//!   by invocation id over a shared broadcast channel
//! - `TerminalSurface`: long-running commands (`run`) hosted in a terminal

pub mod command;
pub mod error;
pub mod runner;
pub mod settings;
pub mod terminal;

pub use command::{CommandSpec, ExpressCommand, ADDRESS_VERSION, ALLOWED_NODE_COUNTS};
pub use error::{ExpressError, Result};
pub use runner::{CommandCompleted, CommandFailure, CommandOutput, ExpressRunner, InvocationHandle, InvocationId};
pub use settings::ExpressSettings;
pub use terminal::{ShellTerminal, TerminalCommand, TerminalSession, TerminalSurface};
