//! Card rendering and extraction errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DdcError {
    /// Input is missing something the card needs
    #[error("{0}")]
    Validation(String),

    /// Low-level PDF failure
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Card structure is not what was expected
    #[error("Malformed card: {0}")]
    Malformed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DdcError>;
