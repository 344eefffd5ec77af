//! Chain error types

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("failed to read neo-express config {}: {reason}", .path.display())]
    ConfigRead { path: PathBuf, reason: String },

    #[error("node index {index} out of range for a chain with {len} node(s)")]
    InvalidSelection { index: usize, len: usize },

    #[error("chain has no consensus nodes")]
    NoNodes,

    #[error("failed to parse invoke file {}: {reason}", .path.display())]
    InvokeFileParse { path: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ChainError {
    pub fn config_read(path: &Path, reason: impl ToString) -> Self {
        ChainError::ConfigRead {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn invoke_parse(path: &Path, reason: impl ToString) -> Self {
        ChainError::InvokeFileParse {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        ChainError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ChainError>;
