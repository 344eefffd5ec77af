use neodapps_chain::ChainError;
use neodapps_crypto::CryptoError;
use neodapps_express::ExpressError;
use neodapps_rpc::RpcError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Express(#[from] ExpressError),

    #[error("Cannot import wallet {}: {reason}", .path.display())]
    WalletImport { path: PathBuf, reason: String },

    #[error("Invalid settings file {}: {reason}", .path.display())]
    Settings { path: PathBuf, reason: String },

    #[error("Unknown setting {0}")]
    UnknownSetting(String),

    #[error("Invalid value for {key}: {reason}")]
    InvalidSetting { key: String, reason: String },

    #[error("No account {0} in the wallets of this chain")]
    UnknownAccount(String),

    #[error("No contract {0} on this chain")]
    UnknownContract(String),

    #[error("Contract {contract} has no operation {operation}")]
    UnknownOperation { contract: String, operation: String },

    #[error("Invalid argument {parameter}: {reason}")]
    InvalidArgument { parameter: String, reason: String },

    #[error("Invocation ended in {state}: {}", .exception.as_deref().unwrap_or("no exception"))]
    InvocationFault {
        state: String,
        exception: Option<String>,
    },

    #[error("Unexpected node response: {0}")]
    UnexpectedResponse(String),

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SessionError>;
