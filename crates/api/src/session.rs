//! HTTP sessions: an opaque session id, its CSRF token, and the key/value
//! payloads stored on behalf of the apply wizard.
//!
//! Sessions live in process memory. The registry's lock guards the map of
//! sessions; it does not serialize a flow's load-then-save sequence.
//! A session idle for longer than its window is dropped the next time it is
//! looked up, and every `open` sweeps the idle ones left behind.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use cdcp_core::clock::Clock;
use cdcp_core::error::CoreError;
use cdcp_core::session_store::SessionStore;
use cdcp_core::types::Timestamp;
use rand::Rng;
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Header carrying the HTTP session id.
pub const SESSION_ID_HEADER: &str = "x-session-id";
/// Header carrying the CSRF token on mutating requests.
pub const CSRF_TOKEN_HEADER: &str = "x-csrf-token";

const CSRF_TOKEN_LENGTH: usize = 32;

/// Idle window of an HTTP session when none is configured.
pub const DEFAULT_HTTP_SESSION_IDLE_MINUTES: i64 = 60;

struct HttpSession {
    csrf_token: String,
    last_seen: Timestamp,
    entries: HashMap<String, Vec<u8>>,
}

/// Credentials handed to the browser when a session is opened.
#[derive(Debug, Clone, Serialize)]
pub struct OpenedSession {
    pub session_id: String,
    pub csrf_token: String,
}

/// All open HTTP sessions.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, HttpSession>>,
    clock: Arc<dyn Clock>,
    idle_minutes: i64,
}

impl SessionRegistry {
    pub fn new(clock: Arc<dyn Clock>, idle_minutes: i64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            clock,
            idle_minutes,
        }
    }

    fn is_idle(&self, session: &HttpSession, now: Timestamp) -> bool {
        (now - session.last_seen).num_minutes() > self.idle_minutes
    }

    /// Open a session with a fresh id and CSRF token.
    pub async fn open(&self) -> OpenedSession {
        let session_id = Uuid::new_v4().to_string();
        let csrf_token = generate_csrf_token();
        let now = self.clock.now();

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !self.is_idle(session, now));
        let swept = before - sessions.len();
        if swept > 0 {
            tracing::debug!(swept, "Idle HTTP sessions dropped");
        }
        sessions.insert(
            session_id.clone(),
            HttpSession {
                csrf_token: csrf_token.clone(),
                last_seen: now,
                entries: HashMap::new(),
            },
        );
        drop(sessions);

        tracing::debug!(session_id = %session_id, "HTTP session opened");
        OpenedSession {
            session_id,
            csrf_token,
        }
    }

    /// Mark a session as used. Returns `false` when it is unknown or has been
    /// idle past its window, in which case it is dropped.
    pub async fn touch(&self, session_id: &str) -> bool {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(session_id) else {
            return false;
        };
        if !self.is_idle(session, now) {
            session.last_seen = now;
            return true;
        }
        sessions.remove(session_id);
        tracing::debug!(session_id = %session_id, "Idle HTTP session dropped");
        false
    }

    /// Compare `token` with the session's CSRF token.
    pub async fn verify_csrf(&self, session_id: &str, token: &str) -> Result<(), CoreError> {
        let sessions = self.sessions.read().await;
        match sessions.get(session_id) {
            Some(session) if session.csrf_token == token => Ok(()),
            _ => Err(CoreError::CsrfMismatch),
        }
    }

    /// Drop a session and everything stored in it.
    pub async fn close(&self, session_id: &str) {
        self.sessions.write().await.remove(session_id);
    }

    /// Number of open sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

fn generate_csrf_token() -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(CSRF_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// The key/value store of one HTTP session.
#[derive(Clone)]
pub struct ScopedSessionStore {
    registry: Arc<SessionRegistry>,
    session_id: String,
}

impl ScopedSessionStore {
    pub fn new(registry: Arc<SessionRegistry>, session_id: String) -> Self {
        Self {
            registry,
            session_id,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

#[async_trait]
impl SessionStore for ScopedSessionStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CoreError> {
        let sessions = self.registry.sessions.read().await;
        Ok(sessions
            .get(&self.session_id)
            .and_then(|session| session.entries.get(key).cloned()))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CoreError> {
        let mut sessions = self.registry.sessions.write().await;
        let session = sessions
            .get_mut(&self.session_id)
            .ok_or_else(|| CoreError::SessionMissing {
                key: key.to_string(),
            })?;
        session.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CoreError> {
        if let Some(session) = self.registry.sessions.write().await.get_mut(&self.session_id) {
            session.entries.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    use std::sync::Mutex;

    use chrono::TimeZone;

    struct SteppedClock(Mutex<Timestamp>);

    impl SteppedClock {
        fn advance_minutes(&self, minutes: i64) {
            *self.0.lock().unwrap() += chrono::Duration::minutes(minutes);
        }
    }

    impl Clock for SteppedClock {
        fn now(&self) -> Timestamp {
            *self.0.lock().unwrap()
        }
    }

    fn clock() -> Arc<SteppedClock> {
        let start = chrono::Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        Arc::new(SteppedClock(Mutex::new(start)))
    }

    fn registry() -> SessionRegistry {
        SessionRegistry::new(clock(), DEFAULT_HTTP_SESSION_IDLE_MINUTES)
    }

    #[tokio::test]
    async fn open_issues_distinct_tokens() {
        let registry = registry();
        let a = registry.open().await;
        let b = registry.open().await;

        assert_ne!(a.session_id, b.session_id);
        assert_ne!(a.csrf_token, b.csrf_token);
        assert_eq!(a.csrf_token.len(), CSRF_TOKEN_LENGTH);
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn csrf_is_compared_per_session() {
        let registry = registry();
        let a = registry.open().await;
        let b = registry.open().await;

        assert!(registry.verify_csrf(&a.session_id, &a.csrf_token).await.is_ok());
        assert_matches!(
            registry.verify_csrf(&a.session_id, &b.csrf_token).await,
            Err(CoreError::CsrfMismatch)
        );
        assert_matches!(
            registry.verify_csrf("unknown", &a.csrf_token).await,
            Err(CoreError::CsrfMismatch)
        );
    }

    #[tokio::test]
    async fn stores_are_isolated_between_sessions() {
        let registry = Arc::new(registry());
        let a = registry.open().await;
        let b = registry.open().await;
        let store_a = ScopedSessionStore::new(Arc::clone(&registry), a.session_id);
        let store_b = ScopedSessionStore::new(Arc::clone(&registry), b.session_id);

        store_a.set("k", b"v".to_vec()).await.unwrap();

        assert_eq!(store_a.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(store_b.get("k").await.unwrap(), None);

        store_a.delete("k").await.unwrap();
        store_a.delete("k").await.unwrap();
        assert_eq!(store_a.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn closed_session_rejects_writes() {
        let registry = Arc::new(registry());
        let opened = registry.open().await;
        let store = ScopedSessionStore::new(Arc::clone(&registry), opened.session_id.clone());

        registry.close(&opened.session_id).await;

        assert_matches!(
            store.set("k", Vec::new()).await,
            Err(CoreError::SessionMissing { .. })
        );
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn use_keeps_a_session_alive() {
        let clock = clock();
        let registry = SessionRegistry::new(clock.clone(), 30);
        let opened = registry.open().await;

        clock.advance_minutes(25);
        assert!(registry.touch(&opened.session_id).await);
        clock.advance_minutes(25);
        assert!(registry.touch(&opened.session_id).await);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn idle_session_is_dropped_on_lookup() {
        let clock = clock();
        let registry = SessionRegistry::new(clock.clone(), 30);
        let opened = registry.open().await;

        clock.advance_minutes(30);
        assert!(registry.touch(&opened.session_id).await);
        clock.advance_minutes(31);
        assert!(!registry.touch(&opened.session_id).await);
        assert!(registry.is_empty().await);
        assert!(!registry.touch(&opened.session_id).await);
    }

    #[tokio::test]
    async fn open_sweeps_idle_sessions() {
        let clock = clock();
        let registry = SessionRegistry::new(clock.clone(), 30);
        let abandoned = registry.open().await;
        let other = registry.open().await;

        clock.advance_minutes(20);
        assert!(registry.touch(&other.session_id).await);
        clock.advance_minutes(15);
        let fresh = registry.open().await;

        assert_eq!(registry.len().await, 2);
        assert!(!registry.touch(&abandoned.session_id).await);
        assert!(registry.touch(&other.session_id).await);
        assert!(registry.touch(&fresh.session_id).await);
    }
}
