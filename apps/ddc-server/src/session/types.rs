//! Session constants and errors

use std::time::Duration;

use crate::ddc::DdcError;
use crate::scanner::ScanError;

// ============================================================================
// Constants
// ============================================================================

/// Session lifetime, counted from creation: 30 minutes
pub const SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// How often expired sessions are swept: 30 seconds
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

// ============================================================================
// Error Types
// ============================================================================

/// Session error types
///
/// Display strings are what RPC callers see in the `Error` field.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("unknown id")]
    NotFound,

    #[error("{0}")]
    InvalidState(&'static str),

    #[error("no more signatures")]
    Exhausted,

    #[error("unexpected response from clamd '{0}'")]
    ScanRejected(String),

    #[error("antivirus scan failed: {0}")]
    ScanTransport(String),

    #[error("{0}")]
    Render(String),

    #[error("{0}")]
    Parse(String),

    #[error("{0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SessionError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "SESSION_NOT_FOUND",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::Exhausted => "SIGNATURES_EXHAUSTED",
            Self::ScanRejected(_) => "SCAN_REJECTED",
            Self::ScanTransport(_) => "SCAN_FAILED",
            Self::Render(_) => "RENDER_FAILED",
            Self::Parse(_) => "PARSE_FAILED",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<ScanError> for SessionError {
    fn from(err: ScanError) -> Self {
        Self::ScanTransport(err.to_string())
    }
}

impl SessionError {
    /// Map a renderer failure; input problems stay validation errors
    pub fn render(err: DdcError) -> Self {
        match err {
            DdcError::Validation(msg) => Self::Validation(msg),
            other => Self::Render(other.to_string()),
        }
    }

    /// Map an extractor failure
    pub fn parse(err: DdcError) -> Self {
        Self::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
