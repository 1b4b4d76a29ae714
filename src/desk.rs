//! Process-wide client handle
//!
//! Builds every component once from [`Config`] and shares the session store,
//! API client and sync channel between them.

use std::sync::Arc;

use crate::api::{EventApi, HttpEventApi};
use crate::auth::AuthClient;
use crate::authoring::EventAuthoring;
use crate::catalog::EventCatalog;
use crate::config::Config;
use crate::error::ClientResult;
use crate::gate::AccessGate;
use crate::session::{FileStore, SessionStore};
use crate::sync::{EnrollmentSync, SyncTransport, WsTransport};

/// All client components wired to one session and one channel
#[derive(Clone)]
pub struct EventDesk {
    pub config: Arc<Config>,
    pub sessions: SessionStore,
    pub gate: AccessGate,
    pub auth: AuthClient,
    pub catalog: EventCatalog,
    pub sync: EnrollmentSync,
    pub authoring: EventAuthoring,
}

impl EventDesk {
    /// Production wiring: file-backed session, HTTP API, WebSocket channel
    pub fn from_config(config: Config) -> ClientResult<Self> {
        let sessions = SessionStore::new(Arc::new(FileStore::new(config.storage.session_path())));
        let api: Arc<dyn EventApi> = Arc::new(HttpEventApi::new(&config.api)?);
        let transport: Arc<dyn SyncTransport> = Arc::new(WsTransport::new(config.ws_url()));

        tracing::debug!(
            api = %config.api.base_url,
            ws = %config.ws_url(),
            data_dir = %config.storage.data_dir,
            "Client configured"
        );
        Ok(Self::with_parts(config, sessions, api, transport))
    }

    /// Wire components over caller-supplied seams
    pub fn with_parts(
        config: Config,
        sessions: SessionStore,
        api: Arc<dyn EventApi>,
        transport: Arc<dyn SyncTransport>,
    ) -> Self {
        let sync = EnrollmentSync::new(
            Arc::clone(&api),
            sessions.clone(),
            transport,
            config.sync.clone(),
        );
        let catalog = EventCatalog::with_sync(Arc::clone(&api), sync.clone());

        Self {
            gate: AccessGate::new(sessions.clone()),
            auth: AuthClient::new(Arc::clone(&api), sessions.clone()),
            authoring: EventAuthoring::new(api, sessions.clone(), catalog.clone()),
            catalog,
            sync,
            sessions,
            config: Arc::new(config),
        }
    }

    /// Fetch the catalog into the sync channel
    ///
    /// Enrollment status is reconciled with the server when signed in.
    pub async fn load_home(&self) -> ClientResult<()> {
        self.catalog.fetch_all().await;

        if self.sessions.token().is_some() {
            if let Err(e) = self.sync.reconcile().await {
                tracing::warn!(error = %e, "Could not reconcile enrollment status");
                if e.is_auth() {
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::EventFields;
    use crate::catalog::{CategoryFilter, EventFilter};
    use crate::gate::{GateDecision, Route};
    use crate::session::{Role, Session};
    use crate::testing::{event, FakeApi};

    fn desk(api: Arc<FakeApi>) -> EventDesk {
        EventDesk::with_parts(
            Config::default(),
            SessionStore::in_memory(),
            api,
            Arc::new(WsTransport::new("ws://127.0.0.1:9/ws")),
        )
    }

    #[tokio::test]
    async fn test_components_share_one_session() {
        let api = Arc::new(FakeApi::with_events(vec![]));
        let desk = desk(api);

        assert_eq!(
            desk.gate.evaluate(Route::Dashboard),
            GateDecision::Redirect(Route::Login)
        );
        desk.auth.login("ada@example.com", "secret1").await.unwrap();
        assert!(desk.gate.evaluate(Route::Dashboard).is_render());

        desk.auth.logout().unwrap();
        assert_eq!(
            desk.gate.evaluate(Route::CreateEvent),
            GateDecision::Redirect(Route::Login)
        );
    }

    #[tokio::test]
    async fn test_load_home_feeds_sync_and_reconciles() {
        let api = Arc::new(FakeApi::with_events(vec![
            event("e1", "Jazz", "Music", "2030-01-01"),
            event("e2", "Rust", "Tech", "2030-01-01"),
        ]));
        api.enrolled.lock().unwrap().insert("e2".to_string());
        let desk = desk(api);
        desk.sessions
            .set(&Session::authenticated("tok", "u1", Role::Member))
            .unwrap();

        desk.load_home().await.unwrap();
        assert_eq!(desk.sync.events().await.len(), 2);
        assert!(desk.sync.is_enrolled("e2").await);
        assert!(!desk.sync.is_enrolled("e1").await);
    }

    #[tokio::test]
    async fn test_created_event_gets_live_counts() {
        let api = Arc::new(FakeApi::with_events(vec![event(
            "e1", "Jazz", "Music", "2030-01-01",
        )]));
        let desk = desk(api);
        desk.sessions
            .set(&Session::authenticated("tok", "u1", Role::Member))
            .unwrap();
        desk.load_home().await.unwrap();

        let fields = EventFields {
            name: "Rust Meetup".to_string(),
            date: "2030-02-01".to_string(),
            location: "Main Hall".to_string(),
            category: "Tech".to_string(),
            ..EventFields::default()
        };
        let created = desk.authoring.create(&fields, None).await.unwrap().unwrap();
        assert!(desk.sync.event(&created.id).await.is_some());

        desk.sync
            .inject_frame(&format!(
                r#"{{"type":"attendeeCountUpdated","eventId":"{}","peopleAttend":7}}"#,
                created.id
            ))
            .await;
        desk.sync
            .inject_frame(r#"{"type":"attendeeCountUpdated","eventId":"e1","peopleAttend":9}"#)
            .await;

        let latest = desk.catalog.latest().await;
        let count = |id: &str| {
            latest
                .events
                .iter()
                .find(|e| e.id == id)
                .map(|e| e.attendee_count)
        };
        assert_eq!(count(&created.id), Some(7));
        assert_eq!(count("e1"), Some(9));

        let tech = EventFilter {
            category: CategoryFilter::parse("Tech"),
            ..EventFilter::all()
        };
        let filtered = desk.catalog.filtered(&tech).await;
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].attendee_count, 7);
    }

    #[tokio::test]
    async fn test_session_change_between_users_rejoins() {
        let api = Arc::new(FakeApi::with_events(vec![event(
            "e1", "Jazz", "Music", "2030-01-01",
        )]));
        let desk = desk(api.clone());

        desk.auth.login("ada@example.com", "secret1").await.unwrap();
        assert!(desk.sync.join("e1").await.unwrap());
        let before = FakeApi::count(&api.join_calls);
        desk.auth.logout().unwrap();

        // Someone else signs in on the same process
        api.enrolled.lock().unwrap().clear();
        desk.sessions
            .set(&Session::authenticated("tok", "u2", Role::Member))
            .unwrap();
        assert!(desk.sync.join("e1").await.unwrap());
        assert_eq!(FakeApi::count(&api.join_calls) - before, 1);
        assert!(api.enrolled.lock().unwrap().contains("e1"));
    }

    #[tokio::test]
    async fn test_expired_session_is_dropped_on_load() {
        let api = Arc::new(FakeApi::with_events(vec![]));
        let desk = desk(api);
        desk.sessions
            .set(&Session::authenticated("expired", "u1", Role::Member))
            .unwrap();

        assert!(desk.load_home().await.unwrap_err().is_auth());
        assert!(desk.sessions.token().is_none());
    }
}
