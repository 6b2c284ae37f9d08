//! Error types for the RPC envelope
//!
//! Domain failures travel inside each result's `Error` field; only the
//! problems below fill the envelope `error`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("rpc: can't find method {0}")]
    MethodNotFound(String),

    #[error("rpc: invalid params: {0}")]
    InvalidParams(String),

    #[error("rpc: invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RpcError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::MethodNotFound(_) => "METHOD_NOT_FOUND",
            Self::InvalidParams(_) => "INVALID_PARAMS",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
