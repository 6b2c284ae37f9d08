//! Extractor session
//!
//! `Accumulating`: the card arrives in parts. `Parse` pulls out the
//! attachments and moves to `Parsed`: the original document can then be
//! read (and re-read) in parts, and the signatures are handed out one per
//! call until none are left.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::ddc::{AttachedFile, AttachmentExtractor, MIN_ATTACHMENTS};
use crate::scanner::Scanner;

use super::types::{Result, SessionError};
use super::{ensure_clean, PartReader};

/// Extracted signatures, handed out front to back
#[derive(Debug, Default)]
pub struct SignatureQueue(VecDeque<AttachedFile>);

impl SignatureQueue {
    /// Next signature and whether it was the last one
    pub fn pop(&mut self) -> Option<(AttachedFile, bool)> {
        let signature = self.0.pop_front()?;
        Some((signature, self.0.is_empty()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug)]
enum Stage {
    Accumulating(Vec<u8>),
    Parsed {
        document_name: String,
        document: PartReader,
        signatures: SignatureQueue,
    },
}

/// State of one card extraction
#[derive(Debug)]
pub struct ExtractorSession {
    stage: Stage,
}

impl Default for ExtractorSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractorSession {
    pub fn new() -> Self {
        Self {
            stage: Stage::Accumulating(Vec::new()),
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self.stage, Stage::Parsed { .. })
    }

    /// Bytes received so far; zero once parsed
    pub fn input_len(&self) -> usize {
        match &self.stage {
            Stage::Accumulating(input) => input.len(),
            Stage::Parsed { .. } => 0,
        }
    }

    pub fn append_ddc_part(&mut self, bytes: &[u8]) -> Result<()> {
        match &mut self.stage {
            Stage::Accumulating(input) => {
                input.extend_from_slice(bytes);
                tracing::debug!(part = bytes.len(), total = input.len(), "Appended DDC part");
                Ok(())
            }
            Stage::Parsed { .. } => Err(SessionError::InvalidState("DDC already parsed")),
        }
    }

    /// Scan the card, extract its attachments, scan each of them and switch
    /// to `Parsed`. Returns the document file name.
    ///
    /// Any failure leaves the session accumulating with its input intact.
    pub async fn parse(
        &mut self,
        scanner: &dyn Scanner,
        extractor: Arc<dyn AttachmentExtractor>,
    ) -> Result<String> {
        let input = match &mut self.stage {
            Stage::Accumulating(input) => input,
            Stage::Parsed { .. } => return Err(SessionError::InvalidState("DDC already parsed")),
        };
        ensure_clean(scanner, input, "card").await?;

        let pdf = std::mem::take(input);
        let (pdf, extracted) = tokio::task::spawn_blocking(move || {
            let extracted = extractor.extract(&pdf);
            (pdf, extracted)
        })
        .await
        .map_err(|e| SessionError::Internal(format!("extract task failed: {}", e)))?;

        match check_attachments(extracted, scanner).await {
            Ok((document, signatures)) => {
                let document_name = document.name;
                tracing::info!(
                    document = %document_name,
                    document_size = document.bytes.len(),
                    signatures = signatures.len(),
                    "Parsed document card"
                );
                self.stage = Stage::Parsed {
                    document_name: document_name.clone(),
                    document: PartReader::new(document.bytes),
                    signatures: SignatureQueue(signatures),
                };
                Ok(document_name)
            }
            Err(err) => {
                self.stage = Stage::Accumulating(pdf);
                Err(err)
            }
        }
    }

    pub fn document_name(&self) -> Option<&str> {
        match &self.stage {
            Stage::Parsed { document_name, .. } => Some(document_name),
            Stage::Accumulating(_) => None,
        }
    }

    /// Next part of the original document, optionally from the start
    pub fn get_document_part(&mut self, max: usize, rewind: bool) -> Result<(Vec<u8>, bool)> {
        let Stage::Parsed { document, .. } = &mut self.stage else {
            return Err(SessionError::InvalidState("DDC not parsed"));
        };
        if max == 0 {
            return Err(SessionError::Validation("MaxPartSize must be positive".to_string()));
        }
        if rewind {
            document.rewind();
        }
        document.next_part(max)
    }

    /// Next signature; the flag is set on the last one
    pub fn get_signature(&mut self) -> Result<(AttachedFile, bool)> {
        let Stage::Parsed { signatures, .. } = &mut self.stage else {
            return Err(SessionError::InvalidState("DDC not parsed"));
        };
        signatures.pop().ok_or(SessionError::Exhausted)
    }
}

async fn check_attachments(
    extracted: crate::ddc::Result<Vec<AttachedFile>>,
    scanner: &dyn Scanner,
) -> Result<(AttachedFile, VecDeque<AttachedFile>)> {
    let files = extracted.map_err(|err| {
        tracing::warn!(error = %err, "Card extraction failed");
        SessionError::parse(err)
    })?;

    if files.len() < MIN_ATTACHMENTS {
        return Err(SessionError::Parse(format!(
            "PDF contains less than {} attachments ({})",
            MIN_ATTACHMENTS,
            files.len()
        )));
    }

    for file in &files {
        ensure_clean(scanner, &file.bytes, "attachment").await?;
    }

    let mut files = VecDeque::from(files);
    let document = files
        .pop_front()
        .ok_or_else(|| SessionError::Internal("attachment list is empty".to_string()))?;
    Ok((document, files))
}
