use std::time::Duration;
use thiserror::Error;

use crate::runner::InvocationId;

#[derive(Debug, Error)]
pub enum ExpressError {
    #[error("{0} is not configured")]
    ConfigurationMissing(&'static str),

    #[error("Failed to start {program}: {source}")]
    ProcessStart {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No terminal is available to run neo-express")]
    TerminalUnavailable,

    #[error("Invocation {id} did not complete within {after:?}")]
    CompletionTimeout { id: InvocationId, after: Duration },

    #[error("Invocation {0} stopped being observed before it completed")]
    Abandoned(InvocationId),
}

pub type Result<T> = std::result::Result<T, ExpressError>;
