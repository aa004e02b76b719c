use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid uid {input:?}: {reason}")]
    InvalidUid { input: String, reason: String },

    #[error("invalid content hash: {0}")]
    InvalidHash(String),

    #[error("invalid page path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("page path {0:?} is reserved")]
    ReservedPath(String),
}
