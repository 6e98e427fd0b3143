//! Error types for itemlist

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid item id: {0}")]
    InvalidId(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn storage(msg: impl Into<String>) -> Self {
        Error::Storage(msg.into())
    }
}
