//! Session Store
//!
//! Single source of truth for the current session, shared by every client
//! in the process. Reads always go to the backend, so a logout performed
//! through one handle is seen by all others on their next read.
//!
//! Every `set` and `clear` bumps a process-wide generation. Holders of
//! per-session state compare generations to notice that the session they
//! cached for is gone.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::backend::{KeyValueStore, MemoryStore};
use super::model::{Role, Session};
use crate::error::{ClientError, ClientResult};

const TOKEN_KEY: &str = "token";
const USER_ID_KEY: &str = "userId";
const ROLE_KEY: &str = "userRole";
const ENROLLMENT_KEY: &str = "userStatus";

/// Cached mapping from event id to enrolled flag
pub type EnrollmentMap = HashMap<String, bool>;

/// Persisted session and enrollment cache
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore>,
    generation: Arc<AtomicU64>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Store that lives only as long as the process
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Read the persisted session
    ///
    /// A backend failure is logged and reported as the empty session.
    pub fn load(&self) -> Session {
        match self.try_load() {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read session, treating as signed out");
                Session::empty()
            }
        }
    }

    fn try_load(&self) -> ClientResult<Session> {
        let token = self.backend.get(TOKEN_KEY)?.filter(|t| !t.is_empty());
        let user_id = self.backend.get(USER_ID_KEY)?;
        let role = self
            .backend
            .get(ROLE_KEY)?
            .map(|r| Role::parse(&r))
            .unwrap_or_default();

        Ok(Session {
            token,
            user_id,
            role,
        })
    }

    /// Persist a session
    ///
    /// Rejects sessions that carry a token without a role or the reverse.
    /// All fields are written in one backend operation. The enrollment
    /// cache is dropped when the session belongs to a different user.
    pub fn set(&self, session: &Session) -> ClientResult<()> {
        if !session.is_consistent() {
            return Err(ClientError::Validation(
                "session token and role must be stored together".to_string(),
            ));
        }

        let previous_user = self.backend.get(USER_ID_KEY).unwrap_or_default();
        let mut changes = vec![
            (TOKEN_KEY, session.bearer()),
            (USER_ID_KEY, session.user_id.as_deref()),
            (ROLE_KEY, session.role.as_str()),
        ];
        if previous_user != session.user_id {
            changes.push((ENROLLMENT_KEY, None));
        }

        self.backend.apply(&changes)?;
        self.generation.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(role = %session.role, "Session stored");
        Ok(())
    }

    /// Remove every session field and the enrollment cache
    pub fn clear(&self) -> ClientResult<()> {
        let changes: Vec<(&str, Option<&str>)> = [TOKEN_KEY, USER_ID_KEY, ROLE_KEY, ENROLLMENT_KEY]
            .into_iter()
            .map(|key| (key, None))
            .collect();
        let result = self.backend.apply(&changes);
        // Even a failed clear ends the session for in-process holders
        self.generation.fetch_add(1, Ordering::SeqCst);
        result?;
        tracing::debug!("Session cleared");
        Ok(())
    }

    /// Counter bumped by every `set` and `clear`
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Current bearer token, if any
    pub fn token(&self) -> Option<String> {
        self.load().bearer().map(str::to_string)
    }

    /// Cached enrollment status from a previous run
    pub fn load_enrollment(&self) -> EnrollmentMap {
        let raw = match self.backend.get(ENROLLMENT_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return EnrollmentMap::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read enrollment cache");
                return EnrollmentMap::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Ignoring corrupt enrollment cache");
            EnrollmentMap::new()
        })
    }

    pub fn save_enrollment(&self, status: &EnrollmentMap) -> ClientResult<()> {
        let raw = serde_json::to_string(status)?;
        self.backend.set(ENROLLMENT_KEY, &raw)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::FileStore;

    fn sample_sessions() -> Vec<Session> {
        vec![
            Session::empty(),
            Session::authenticated("tok-member", "u1", Role::Member),
            Session::authenticated("tok-guest", "u2", Role::Guest),
            Session {
                token: Some("tok".to_string()),
                user_id: None,
                role: Role::Member,
            },
        ]
    }

    #[test]
    fn test_load_after_set_round_trips() {
        let store = SessionStore::in_memory();
        for session in sample_sessions() {
            store.set(&session).unwrap();
            assert_eq!(store.load(), session);
            // Still equal on repeated reads until cleared
            assert_eq!(store.load(), session);
        }
    }

    #[test]
    fn test_clear_removes_everything() {
        let store = SessionStore::in_memory();
        store
            .set(&Session::authenticated("tok", "u1", Role::Member))
            .unwrap();
        store
            .save_enrollment(&EnrollmentMap::from([("e1".to_string(), true)]))
            .unwrap();

        store.clear().unwrap();
        assert_eq!(store.load(), Session::empty());
        assert!(store.token().is_none());
        assert!(store.load_enrollment().is_empty());
    }

    #[test]
    fn test_set_rejects_inconsistent_session() {
        let store = SessionStore::in_memory();
        let bad = Session::authenticated("tok", "u1", Role::Absent);
        assert!(matches!(store.set(&bad), Err(ClientError::Validation(_))));
        assert_eq!(store.load(), Session::empty());
    }

    #[test]
    fn test_unknown_role_loads_as_absent() {
        let backend = Arc::new(MemoryStore::new());
        backend.set("token", "tok").unwrap();
        backend.set("userRole", "superuser").unwrap();

        let store = SessionStore::new(backend);
        let session = store.load();
        assert!(session.has_token());
        assert_eq!(session.role, Role::Absent);
    }

    #[test]
    fn test_corrupt_enrollment_cache_is_empty() {
        let backend = Arc::new(MemoryStore::new());
        backend.set("userStatus", "[oops").unwrap();
        let store = SessionStore::new(backend);
        assert!(store.load_enrollment().is_empty());
    }

    /// Memory backend that counts each kind of write
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        single_writes: std::sync::atomic::AtomicUsize,
        batch_writes: std::sync::atomic::AtomicUsize,
    }

    impl KeyValueStore for CountingStore {
        fn get(&self, key: &str) -> ClientResult<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> ClientResult<()> {
            self.single_writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> ClientResult<()> {
            self.single_writes.fetch_add(1, Ordering::SeqCst);
            self.inner.remove(key)
        }

        fn apply(&self, changes: &[(&str, Option<&str>)]) -> ClientResult<()> {
            self.batch_writes.fetch_add(1, Ordering::SeqCst);
            self.inner.apply(changes)
        }
    }

    #[test]
    fn test_set_and_clear_are_single_writes() {
        let backend = Arc::new(CountingStore::default());
        let store = SessionStore::new(backend.clone());

        store
            .set(&Session::authenticated("tok", "u1", Role::Member))
            .unwrap();
        store.clear().unwrap();

        assert_eq!(backend.batch_writes.load(Ordering::SeqCst), 2);
        assert_eq!(backend.single_writes.load(Ordering::SeqCst), 0);
        assert_eq!(store.load(), Session::empty());
    }

    #[test]
    fn test_generation_moves_on_set_and_clear() {
        let store = SessionStore::in_memory();
        let start = store.generation();

        store
            .set(&Session::authenticated("tok", "u1", Role::Member))
            .unwrap();
        let after_set = store.generation();
        assert!(after_set > start);

        store.clone().clear().unwrap();
        assert!(store.generation() > after_set);
    }

    #[test]
    fn test_new_user_drops_enrollment_cache() {
        let store = SessionStore::in_memory();
        let cache = EnrollmentMap::from([("e1".to_string(), true)]);

        store
            .set(&Session::authenticated("tok", "u1", Role::Member))
            .unwrap();
        store.save_enrollment(&cache).unwrap();

        // Same user signing in again keeps the hint
        store
            .set(&Session::authenticated("tok2", "u1", Role::Member))
            .unwrap();
        assert_eq!(store.load_enrollment(), cache);

        store
            .set(&Session::authenticated("tok3", "u2", Role::Member))
            .unwrap();
        assert!(store.load_enrollment().is_empty());
    }

    #[test]
    fn test_session_survives_reload_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let session = Session::authenticated("tok", "u1", Role::Guest);

        SessionStore::new(Arc::new(FileStore::new(&path)))
            .set(&session)
            .unwrap();

        let reloaded = SessionStore::new(Arc::new(FileStore::new(&path)));
        assert_eq!(reloaded.load(), session);
    }
}
