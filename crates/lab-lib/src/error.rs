//! Error taxonomy for the lab library
//!
//! Every subsystem fails fast and hands its first error back verbatim, so a
//! single enum covers the whole orchestration path.

use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Malformed query or action expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at position {position} (near {token:?})")]
pub struct ParseError {
    /// Byte offset of the offending token in the input
    pub position: usize,
    /// The offending token, empty at end of input
    pub token: String,
    pub message: String,
}

impl ParseError {
    pub fn new(position: usize, token: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            position,
            token: token.into(),
            message: message.into(),
        }
    }
}

/// Query evaluation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("labeled set contains duplicate id {0:?}")]
    DuplicateId(String),
}

/// Metadata store failure
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {id:?} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} {id:?} already exists")]
    AlreadyExists { kind: &'static str, id: String },

    #[error("transaction aborted: {0}")]
    Aborted(String),

    #[error("state file i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("state file encoding: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn already_exists(kind: &'static str, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            id: id.into(),
        }
    }
}

/// Library error
#[derive(Debug, Error)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("match error: {0}")]
    Match(#[from] MatchError),

    #[error("transform failed: {0}")]
    Transform(String),

    #[error("connectivity error: {0}")]
    Connectivity(String),

    #[error("task failed on node {node:?}: {message}")]
    TaskExecution { node: String, message: String },

    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("worker task failed: {0}")]
    Join(String),
}

impl Error {
    pub fn task(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TaskExecution {
            node: node.into(),
            message: message.into(),
        }
    }

    /// Returns true when the error is a store lookup miss
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Persistence(StoreError::NotFound { .. }))
    }
}
