use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Transport error calling {method}: {source}")]
    Transport {
        method: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Node returned error {code} for {method}: {message}")]
    Server {
        method: String,
        code: i64,
        message: String,
    },

    #[error("Cannot decode {method} response: {reason}")]
    Decode { method: String, reason: String },

    #[error("{0} returned no result")]
    MissingResult(String),
}

impl RpcError {
    pub(crate) fn transport(method: &str, source: reqwest::Error) -> Self {
        RpcError::Transport {
            method: method.to_string(),
            source,
        }
    }

    pub(crate) fn decode(method: &str, reason: impl ToString) -> Self {
        RpcError::Decode {
            method: method.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;
