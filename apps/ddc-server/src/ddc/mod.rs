//! Digital Document Cards
//!
//! A card is a PDF that carries a readable info block (and optionally the
//! pages of the original document and one page per signature) plus the
//! original document and its signatures as embedded files.
//!
//! # Collaborators
//!
//! - [`DocumentRenderer`]: descriptor + embedded document -> card PDF
//! - [`AttachmentExtractor`]: card PDF -> ordered embedded files
//!
//! Both are synchronous and CPU-bound; callers run them on the blocking pool.

pub mod b64;
mod error;
mod extractor;
mod renderer;
mod text;
pub mod translations;
pub mod types;

pub use error::{DdcError, Result};
pub use extractor::PdfAttachmentExtractor;
pub use renderer::PdfRenderer;
pub use types::{
    AttachedFile, BuildOptions, DocumentInfo, SignatureInfo, SignatureVisualization,
    MIN_ATTACHMENTS,
};

/// Everything needed to render one card
#[derive(Debug, Clone, Default)]
pub struct RenderRequest {
    pub info: DocumentInfo,
    pub document: Vec<u8>,
    pub file_name: String,
    pub options: BuildOptions,
}

/// Renders a card PDF
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, request: &RenderRequest) -> Result<Vec<u8>>;
}

/// Pulls the embedded files out of a card, document first
pub trait AttachmentExtractor: Send + Sync {
    fn extract(&self, pdf: &[u8]) -> Result<Vec<AttachedFile>>;
}
