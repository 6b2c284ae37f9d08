//! Session store
//!
//! Records live in a map guarded by an async `RwLock` that is only held for
//! lookups and inserts. Each record carries its own `Mutex`, so a slow
//! operation on one session never blocks another.
//!
//! Expiry is absolute: a record is dead `ttl` after creation no matter how
//! often it is used. Lookups treat dead records as missing even before the
//! sweep has removed them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use super::builder::BuilderSession;
use super::clock::{Clock, SystemClock};
use super::extractor::ExtractorSession;
use super::types::{Result, SessionError, SESSION_TTL};

// ============================================================================
// Session State
// ============================================================================

/// What a session record holds
#[derive(Debug)]
pub enum SessionState {
    Builder(BuilderSession),
    Extractor(ExtractorSession),
}

impl SessionState {
    pub fn kind(&self) -> &'static str {
        match self {
            SessionState::Builder(_) => "builder",
            SessionState::Extractor(_) => "extractor",
        }
    }

    /// The builder sub-state; any other kind is a bug in the caller
    pub fn builder_mut(&mut self) -> Result<&mut BuilderSession> {
        match self {
            SessionState::Builder(session) => Ok(session),
            other => Err(kind_mismatch("builder", other.kind())),
        }
    }

    /// The extractor sub-state; any other kind is a bug in the caller
    pub fn extractor_mut(&mut self) -> Result<&mut ExtractorSession> {
        match self {
            SessionState::Extractor(session) => Ok(session),
            other => Err(kind_mismatch("extractor", other.kind())),
        }
    }
}

fn kind_mismatch(expected: &str, actual: &str) -> SessionError {
    tracing::error!(expected, actual, "Session kind mismatch");
    SessionError::Internal(format!("session is a {}, not a {}", actual, expected))
}

#[derive(Clone)]
struct SessionRecord {
    created_at: DateTime<Utc>,
    state: Arc<Mutex<SessionState>>,
}

// ============================================================================
// Session Store
// ============================================================================

fn random_id() -> String {
    Uuid::new_v4().to_string()
}

/// Shared map of live sessions
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    sessions: RwLock<HashMap<String, SessionRecord>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    generate_id: fn() -> String,
}

impl SessionStore {
    /// Store on the wall clock with the standard TTL
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock), SESSION_TTL)
    }

    /// Store with a custom clock and TTL
    pub fn with_clock(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self::from_parts(clock, ttl, random_id)
    }

    fn from_parts(clock: Arc<dyn Clock>, ttl: Duration, generate_id: fn() -> String) -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                sessions: RwLock::new(HashMap::new()),
                ttl,
                clock,
                generate_id,
            }),
        }
    }

    fn is_expired(&self, record: &SessionRecord, now: DateTime<Utc>) -> bool {
        match (now - record.created_at).to_std() {
            Ok(age) => age > self.inner.ttl,
            // Clock moved backwards
            Err(_) => false,
        }
    }

    // ========================================================================
    // Session Lifecycle
    // ========================================================================

    /// Store a new session and return its id
    pub async fn create(&self, state: SessionState) -> String {
        let kind = state.kind();
        let record = SessionRecord {
            created_at: self.inner.clock.now(),
            state: Arc::new(Mutex::new(state)),
        };

        let mut sessions = self.inner.sessions.write().await;
        let id = loop {
            let candidate = (self.inner.generate_id)();
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
            tracing::warn!(session_id = %candidate, "Session id collision, generating another");
        };
        sessions.insert(id.clone(), record);

        tracing::info!(
            session_id = %id,
            kind = kind,
            sessions = sessions.len(),
            "Created session"
        );

        id
    }

    /// Lock a live session for the duration of one operation
    pub async fn lock(&self, id: &str) -> Result<OwnedMutexGuard<SessionState>> {
        let state = {
            let sessions = self.inner.sessions.read().await;
            let record = sessions.get(id).ok_or(SessionError::NotFound)?;
            if self.is_expired(record, self.inner.clock.now()) {
                return Err(SessionError::NotFound);
            }
            record.state.clone()
        };

        let guard = state.clone().lock_owned().await;

        // The record may have been dropped, swept or outlived its TTL while we waited
        let sessions = self.inner.sessions.read().await;
        match sessions.get(id) {
            Some(record)
                if Arc::ptr_eq(&record.state, &state)
                    && !self.is_expired(record, self.inner.clock.now()) =>
            {
                Ok(guard)
            }
            _ => Err(SessionError::NotFound),
        }
    }

    /// Remove a session; unknown ids are ignored
    pub async fn delete(&self, id: &str) -> bool {
        let removed = self.inner.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::info!(session_id = %id, "Dropped session");
        }
        removed
    }

    /// Number of stored records, expired ones not yet swept included
    pub async fn session_count(&self) -> usize {
        self.inner.sessions.read().await.len()
    }

    // ========================================================================
    // Cleanup
    // ========================================================================

    /// Remove every record older than the TTL
    ///
    /// Returns the number of sessions removed
    pub async fn cleanup_expired(&self) -> usize {
        let now = self.inner.clock.now();
        let mut sessions = self.inner.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|id, record| {
            let expired = self.is_expired(record, now);
            if expired {
                tracing::debug!(session_id = %id, "Expired session");
            }
            !expired
        });

        let count = before - sessions.len();
        if count > 0 {
            tracing::info!(
                count = count,
                remaining = sessions.len(),
                "Cleaned up expired sessions"
            );
        }
        count
    }

    /// Start the background sweep
    pub fn start_cleanup_task(self, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);

            loop {
                interval.tick().await;
                self.cleanup_expired().await;
            }
        })
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddc::DocumentInfo;
    use crate::session::clock::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn builder_state() -> SessionState {
        SessionState::Builder(BuilderSession::new(DocumentInfo::default(), "doc.pdf".to_string()))
    }

    fn extractor_state() -> SessionState {
        SessionState::Extractor(ExtractorSession::new())
    }

    fn manual_store() -> (SessionStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let store = SessionStore::with_clock(clock.clone(), SESSION_TTL);
        (store, clock)
    }

    #[tokio::test]
    async fn test_create_and_lock() {
        let store = SessionStore::new();
        let id = store.create(builder_state()).await;

        assert!(Uuid::parse_str(&id).is_ok());
        let mut guard = store.lock(&id).await.unwrap();
        assert!(guard.builder_mut().is_ok());
        assert_eq!(store.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let store = SessionStore::new();
        assert!(matches!(store.lock("nope").await, Err(SessionError::NotFound)));
    }

    #[tokio::test]
    async fn test_kind_mismatch_is_internal() {
        let store = SessionStore::new();
        let id = store.create(extractor_state()).await;
        let mut guard = store.lock(&id).await.unwrap();
        assert!(matches!(guard.builder_mut(), Err(SessionError::Internal(_))));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = SessionStore::new();
        let id = store.create(builder_state()).await;

        assert!(store.delete(&id).await);
        assert!(!store.delete(&id).await);
        assert!(matches!(store.lock(&id).await, Err(SessionError::NotFound)));
    }

    #[tokio::test]
    async fn test_expiry_is_absolute_and_precedes_sweep() {
        let (store, clock) = manual_store();
        let id = store.create(builder_state()).await;

        clock.advance(SESSION_TTL - Duration::from_secs(1));
        // Using the session does not extend it
        drop(store.lock(&id).await.unwrap());

        clock.advance(Duration::from_secs(2));
        assert!(matches!(store.lock(&id).await, Err(SessionError::NotFound)));
        assert_eq!(store.session_count().await, 1);

        assert_eq!(store.cleanup_expired().await, 1);
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_sweep_keeps_young_sessions() {
        let (store, clock) = manual_store();
        let old = store.create(builder_state()).await;
        clock.advance(Duration::from_secs(20 * 60));
        let young = store.create(extractor_state()).await;
        clock.advance(Duration::from_secs(11 * 60));

        assert_eq!(store.cleanup_expired().await, 1);
        assert!(store.lock(&old).await.is_err());
        assert!(store.lock(&young).await.is_ok());
    }

    #[tokio::test]
    async fn test_id_collision_is_retried() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        fn colliding() -> String {
            // Two identical ids, then distinct ones
            match CALLS.fetch_add(1, Ordering::SeqCst) {
                0 | 1 => "fixed".to_string(),
                n => format!("id-{}", n),
            }
        }

        let store = SessionStore::from_parts(Arc::new(SystemClock), SESSION_TTL, colliding);
        let first = store.create(builder_state()).await;
        let second = store.create(builder_state()).await;

        assert_eq!(first, "fixed");
        assert_eq!(second, "id-2");
        assert_eq!(store.session_count().await, 2);
    }

    #[tokio::test]
    async fn test_same_id_calls_serialize() {
        let store = SessionStore::new();
        let id = store.create(builder_state()).await;

        let guard = store.lock(&id).await.unwrap();

        let waiter = {
            let store = store.clone();
            let id = id.clone();
            tokio::spawn(async move { store.lock(&id).await.map(|_| ()) })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        assert!(waiter.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_other_ids_do_not_wait() {
        let store = SessionStore::new();
        let busy = store.create(builder_state()).await;
        let free = store.create(builder_state()).await;

        let _guard = store.lock(&busy).await.unwrap();
        let other = tokio::time::timeout(Duration::from_millis(100), store.lock(&free)).await;
        assert!(matches!(other, Ok(Ok(_))));
    }

    #[tokio::test]
    async fn test_drop_while_waiting_is_not_found() {
        let store = SessionStore::new();
        let id = store.create(builder_state()).await;
        let guard = store.lock(&id).await.unwrap();

        let waiter = {
            let store = store.clone();
            let id = id.clone();
            tokio::spawn(async move { store.lock(&id).await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        store.delete(&id).await;
        drop(guard);

        assert!(matches!(waiter.await.unwrap(), Err(SessionError::NotFound)));
    }

    #[tokio::test]
    async fn test_expiry_while_waiting_is_not_found() {
        let (store, clock) = manual_store();
        let id = store.create(builder_state()).await;
        let guard = store.lock(&id).await.unwrap();

        let waiter = {
            let store = store.clone();
            let id = id.clone();
            tokio::spawn(async move { store.lock(&id).await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        // The record is still stored, only too old
        clock.advance(SESSION_TTL + Duration::from_secs(1));
        drop(guard);

        assert!(matches!(waiter.await.unwrap(), Err(SessionError::NotFound)));
        assert_eq!(store.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_cleanup_task_sweeps_in_background() {
        let clock = Arc::new(ManualClock::default());
        let store = SessionStore::with_clock(clock.clone(), Duration::from_secs(60));
        store.create(builder_state()).await;
        clock.advance(Duration::from_secs(61));

        let handle = store.clone().start_cleanup_task(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();

        assert_eq!(store.session_count().await, 0);
    }
}
