use std::io;

use crate::core::store::Collection;
use crate::core::types::DistressStatus;

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("{collection} record not found: {id}")]
    NotFound { collection: Collection, id: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("distress signal requires a coordinate")]
    MissingLocation,
    #[error("illegal transition {from} -> {to}")]
    IllegalTransition {
        from: DistressStatus,
        to: DistressStatus,
    },
    #[error("write conflict on {id} after {attempts} attempts")]
    Conflict { id: String, attempts: u32 },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("timeout")]
    Timeout,
    #[error("http error: {0}")]
    Http(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl EngineError {
    pub fn not_found(collection: Collection, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            collection,
            id: id.into(),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        EngineError::InvalidInput(msg.into())
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            EngineError::Timeout
        } else if err.is_connect() {
            EngineError::Network(err.to_string())
        } else if err.is_status() {
            EngineError::Http(err.to_string())
        } else {
            EngineError::Network(err.to_string())
        }
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        EngineError::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Corrupt(err.to_string())
    }
}
