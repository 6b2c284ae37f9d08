//! Antivirus scanning
//!
//! Every byte buffer that enters a session (signature bodies, the embedded
//! document, an uploaded card and the files extracted from it) passes
//! through a [`Scanner`] before the session changes state.

mod clamd;

pub use clamd::{
    ClamdClient, ClamdEndpoint, CHUNK_SIZE, CONNECT_ATTEMPTS, CONNECT_TIMEOUT, SCAN_TIMEOUT,
};

use async_trait::async_trait;

/// Outcome of a completed scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanVerdict {
    Clean,
    /// Raw daemon response
    Infected(String),
}

impl ScanVerdict {
    pub fn is_clean(&self) -> bool {
        matches!(self, ScanVerdict::Clean)
    }
}

/// The scan could not be performed
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("failed to connect to clamd at {endpoint} after {attempts} attempts: {source}")]
    Connect {
        endpoint: String,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("clamd I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("chunk of {0} bytes does not fit the INSTREAM length prefix")]
    ChunkTooLarge(usize),
}

#[async_trait]
pub trait Scanner: Send + Sync {
    async fn scan(&self, data: &[u8]) -> Result<ScanVerdict, ScanError>;
}
