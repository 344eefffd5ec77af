use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid WIF: {0}")]
    InvalidWif(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid NEP-2 key: {0}")]
    InvalidNep2(String),

    #[error("NEP-2 passphrase does not match the key")]
    WrongPassphrase,

    #[error("Scrypt error: {0}")]
    Scrypt(String),

    #[error("Account {0} has no key")]
    MissingKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
