//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::ddc::{AttachmentExtractor, DocumentRenderer, PdfAttachmentExtractor, PdfRenderer};
use crate::scanner::{ClamdClient, Scanner};
use crate::session::SessionStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    sessions: SessionStore,
    scanner: Arc<dyn Scanner>,
    renderer: Arc<dyn DocumentRenderer>,
    extractor: Arc<dyn AttachmentExtractor>,
}

impl AppState {
    /// Create the production state: clamd scanner from the config and the
    /// lopdf renderer and extractor
    pub fn new(config: Config) -> Self {
        let scanner = ClamdClient::new(config.clamd.endpoint());
        Self::with_components(
            config,
            SessionStore::new(),
            Arc::new(scanner),
            Arc::new(PdfRenderer),
            Arc::new(PdfAttachmentExtractor),
        )
    }

    /// Create a state from explicit parts
    pub fn with_components(
        config: Config,
        sessions: SessionStore,
        scanner: Arc<dyn Scanner>,
        renderer: Arc<dyn DocumentRenderer>,
        extractor: Arc<dyn AttachmentExtractor>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                sessions,
                scanner,
                renderer,
                extractor,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the session store
    pub fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }

    /// Get the antivirus scanner
    pub fn scanner(&self) -> &dyn Scanner {
        self.inner.scanner.as_ref()
    }

    /// Get the card renderer
    pub fn renderer(&self) -> Arc<dyn DocumentRenderer> {
        self.inner.renderer.clone()
    }

    /// Get the attachment extractor
    pub fn extractor(&self) -> Arc<dyn AttachmentExtractor> {
        self.inner.extractor.clone()
    }
}
