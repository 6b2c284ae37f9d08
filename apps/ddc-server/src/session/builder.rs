//! Builder session
//!
//! `Accumulating`: the document arrives in parts and signatures one at a
//! time. `Build` renders the card and moves to `Built`, after which the card
//! is read back in parts. There is no way back to `Accumulating`.

use std::sync::Arc;

use crate::ddc::{BuildOptions, DocumentInfo, DocumentRenderer, RenderRequest, SignatureInfo};
use crate::scanner::Scanner;

use super::types::{Result, SessionError};
use super::{ensure_clean, PartReader};

#[derive(Debug)]
enum Stage {
    Accumulating,
    Built(PartReader),
}

/// State of one card build
#[derive(Debug)]
pub struct BuilderSession {
    info: DocumentInfo,
    file_name: String,
    document: Vec<u8>,
    stage: Stage,
}

impl BuilderSession {
    /// Start a build; signatures in `info` are ignored and arrive through
    /// [`append_signature`](Self::append_signature)
    pub fn new(mut info: DocumentInfo, file_name: String) -> Self {
        info.signatures.clear();
        Self {
            info,
            file_name,
            document: Vec::new(),
            stage: Stage::Accumulating,
        }
    }

    pub fn is_built(&self) -> bool {
        matches!(self.stage, Stage::Built(_))
    }

    pub fn document_len(&self) -> usize {
        self.document.len()
    }

    pub fn signature_count(&self) -> usize {
        self.info.signatures.len()
    }

    fn ensure_accumulating(&self) -> Result<()> {
        match self.stage {
            Stage::Accumulating => Ok(()),
            Stage::Built(_) => Err(SessionError::InvalidState("DDC already built")),
        }
    }

    pub fn append_document_part(&mut self, bytes: &[u8]) -> Result<()> {
        self.ensure_accumulating()?;
        self.document.extend_from_slice(bytes);

        tracing::debug!(
            part = bytes.len(),
            total = self.document.len(),
            "Appended document part"
        );
        Ok(())
    }

    /// Scan the signature body and queue it; rejected signatures leave the
    /// list untouched
    pub async fn append_signature(
        &mut self,
        signature: SignatureInfo,
        scanner: &dyn Scanner,
    ) -> Result<()> {
        self.ensure_accumulating()?;
        ensure_clean(scanner, &signature.body, "signature").await?;

        tracing::debug!(
            file_name = %signature.file_name,
            bytes = signature.body.len(),
            "Appended signature"
        );
        self.info.signatures.push(signature);
        Ok(())
    }

    /// Scan the document, render the card and switch to `Built`.
    ///
    /// Nothing changes unless rendering succeeds. Rendering runs on the
    /// blocking pool.
    pub async fn build(
        &mut self,
        options: BuildOptions,
        scanner: &dyn Scanner,
        renderer: Arc<dyn DocumentRenderer>,
    ) -> Result<usize> {
        self.ensure_accumulating()?;
        ensure_clean(scanner, &self.document, "document").await?;

        let request = RenderRequest {
            info: std::mem::take(&mut self.info),
            document: std::mem::take(&mut self.document),
            file_name: self.file_name.clone(),
            options,
        };

        let (request, rendered) = tokio::task::spawn_blocking(move || {
            let rendered = renderer.render(&request);
            (request, rendered)
        })
        .await
        .map_err(|e| SessionError::Internal(format!("render task failed: {}", e)))?;

        self.info = request.info;
        let card = match rendered {
            Ok(card) => card,
            Err(err) => {
                self.document = request.document;
                tracing::warn!(error = %err, "Card rendering failed");
                return Err(SessionError::render(err));
            }
        };

        let size = card.len();
        self.stage = Stage::Built(PartReader::new(card));

        tracing::info!(
            size = size,
            signatures = self.info.signatures.len(),
            "Built document card"
        );
        Ok(size)
    }

    /// Next part of the built card
    pub fn get_ddc_part(&mut self, max: usize) -> Result<(Vec<u8>, bool)> {
        match &mut self.stage {
            Stage::Built(reader) => reader.next_part(max),
            Stage::Accumulating => Err(SessionError::InvalidState("DDC not built")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddc::{DdcError, SignatureVisualization};
    use crate::session::testing::{BrokenScanner, MarkerScanner};
    use parking_lot::Mutex;

    /// Renderer that echoes the document and remembers the last request
    #[derive(Default)]
    struct EchoRenderer {
        last: Mutex<Option<RenderRequest>>,
    }

    impl DocumentRenderer for EchoRenderer {
        fn render(&self, request: &RenderRequest) -> crate::ddc::Result<Vec<u8>> {
            *self.last.lock() = Some(request.clone());
            let mut card = b"CARD:".to_vec();
            card.extend_from_slice(&request.document);
            Ok(card)
        }
    }

    struct FailingRenderer;

    impl DocumentRenderer for FailingRenderer {
        fn render(&self, _request: &RenderRequest) -> crate::ddc::Result<Vec<u8>> {
            Err(DdcError::Validation("document is empty".to_string()))
        }
    }

    fn session() -> BuilderSession {
        let info = DocumentInfo {
            title: "Title".to_string(),
            ..Default::default()
        };
        BuilderSession::new(info, "doc.pdf".to_string())
    }

    fn signature(body: &[u8]) -> SignatureInfo {
        SignatureInfo {
            body: body.to_vec(),
            file_name: "sig.cms".to_string(),
            signer_name: "Signer".to_string(),
            signature_visualization: Some(SignatureVisualization::default()),
        }
    }

    fn drain(session: &mut BuilderSession, max: usize) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let (part, is_final) = session.get_ddc_part(max).unwrap();
            out.extend(part);
            if is_final {
                return out;
            }
        }
    }

    #[tokio::test]
    async fn test_chunked_upload_is_transparent() {
        let scanner = MarkerScanner::default();
        let renderer = Arc::new(EchoRenderer::default());

        let data: Vec<u8> = (0..1000u32).map(|i| (i % 256) as u8).collect();
        let mut s = session();
        for part in data.chunks(7) {
            s.append_document_part(part).unwrap();
        }
        s.append_signature(signature(b"sig"), &scanner).await.unwrap();
        s.build(BuildOptions::default(), &scanner, renderer.clone()).await.unwrap();

        let last = renderer.last.lock().clone().unwrap();
        assert_eq!(last.document, data);
        assert_eq!(last.file_name, "doc.pdf");
        assert_eq!(last.info.signatures.len(), 1);

        let card = drain(&mut s, 64);
        assert_eq!(&card[..5], b"CARD:");
        assert_eq!(&card[5..], data.as_slice());
    }

    #[tokio::test]
    async fn test_infected_signature_is_not_added() {
        let scanner = MarkerScanner::default();
        let mut s = session();

        let err = s.append_signature(signature(b"xEICARx"), &scanner).await.unwrap_err();
        assert!(matches!(err, SessionError::ScanRejected(_)));
        assert_eq!(s.signature_count(), 0);
    }

    #[tokio::test]
    async fn test_infected_document_blocks_build() {
        let scanner = MarkerScanner::default();
        let mut s = session();
        s.append_document_part(b"EICAR").unwrap();
        s.append_signature(signature(b"sig"), &scanner).await.unwrap();

        let err = s
            .build(BuildOptions::default(), &scanner, Arc::new(EchoRenderer::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::ScanRejected(_)));
        assert!(!s.is_built());
        assert_eq!(s.document_len(), 5);

        // Still accumulating
        s.append_document_part(b"more").unwrap();
    }

    #[tokio::test]
    async fn test_scanner_outage_fails_the_call() {
        let mut s = session();
        let err = s.append_signature(signature(b"sig"), &BrokenScanner).await.unwrap_err();
        assert!(matches!(err, SessionError::ScanTransport(_)));
        assert_eq!(s.signature_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_render_keeps_state() {
        let scanner = MarkerScanner::default();
        let mut s = session();
        s.append_document_part(b"abc").unwrap();
        s.append_signature(signature(b"sig"), &scanner).await.unwrap();

        let err = s
            .build(BuildOptions::default(), &scanner, Arc::new(FailingRenderer))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));
        assert!(!s.is_built());
        assert_eq!(s.document_len(), 3);
        assert_eq!(s.signature_count(), 1);
    }

    #[tokio::test]
    async fn test_stage_rules() {
        let scanner = MarkerScanner::default();
        let mut s = session();

        assert!(matches!(s.get_ddc_part(10), Err(SessionError::InvalidState(_))));

        s.append_signature(signature(b"sig"), &scanner).await.unwrap();
        s.build(BuildOptions::default(), &scanner, Arc::new(EchoRenderer::default()))
            .await
            .unwrap();

        assert!(matches!(s.append_document_part(b"x"), Err(SessionError::InvalidState(_))));
        assert!(matches!(
            s.append_signature(signature(b"sig"), &scanner).await,
            Err(SessionError::InvalidState(_))
        ));
        assert!(matches!(
            s.build(BuildOptions::default(), &scanner, Arc::new(EchoRenderer::default()))
                .await,
            Err(SessionError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_built_card_releases_document() {
        let scanner = MarkerScanner::default();
        let mut s = session();
        s.append_document_part(&[1; 128]).unwrap();
        s.append_signature(signature(b"sig"), &scanner).await.unwrap();
        s.build(BuildOptions::default(), &scanner, Arc::new(EchoRenderer::default()))
            .await
            .unwrap();

        assert_eq!(s.document_len(), 0);
        assert_eq!(drain(&mut s, 1000).len(), 5 + 128);
    }
}
