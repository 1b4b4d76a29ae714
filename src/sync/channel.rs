//! Enrollment Sync Channel
//!
//! Keeps attendee counts and the user's enrollment status in step with the
//! server. One channel serves the whole process; clones share state.
//!
//! ## Connection lifecycle
//!
//! ```text
//! Idle -> Connecting -> Connected -> Reconnecting{1..=max} -> Degraded
//!                          ^               |                     |
//!                          +---------------+      retry() -------+
//! ```
//!
//! A successful connect resets the attempt counter. Once `max` reconnect
//! attempts have failed the channel parks in `Degraded`: counts stop moving
//! but joins, withdrawals and reads keep working.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{broadcast, watch, Mutex, RwLock, RwLockWriteGuard};
use tokio::task::JoinHandle;

use super::messages::{AttendeeUpdate, InboundMessage};
use super::transport::SyncTransport;
use crate::api::{Event, EventApi};
use crate::config::SyncConfig;
use crate::error::{ClientError, ClientResult};
use crate::session::{EnrollmentMap, SessionStore};

/// Connection state of the real-time channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Idle,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    /// Reconnect attempts exhausted; live updates paused
    Degraded,
}

impl ChannelState {
    pub fn is_live(&self) -> bool {
        matches!(self, ChannelState::Connected)
    }
}

/// Process-wide attendance and enrollment synchronizer
#[derive(Clone)]
pub struct EnrollmentSync {
    inner: Arc<Inner>,
}

struct Inner {
    api: Arc<dyn EventApi>,
    sessions: SessionStore,
    transport: Arc<dyn SyncTransport>,
    config: SyncConfig,
    events: RwLock<Vec<Event>>,
    enrollment: RwLock<EnrollmentState>,
    // Makes the enrolled check and the join/withdraw call one step
    action_lock: Mutex<()>,
    updates: broadcast::Sender<AttendeeUpdate>,
    state: watch::Sender<ChannelState>,
    task: StdMutex<Option<JoinHandle<()>>>,
}

/// Enrollment status and the session generation it belongs to
struct EnrollmentState {
    generation: u64,
    status: EnrollmentMap,
}

impl EnrollmentState {
    fn for_session(sessions: &SessionStore) -> Self {
        Self {
            generation: sessions.generation(),
            status: sessions.load_enrollment(),
        }
    }
}

impl EnrollmentSync {
    /// Create the channel; the cached enrollment map seeds local status
    pub fn new(
        api: Arc<dyn EventApi>,
        sessions: SessionStore,
        transport: Arc<dyn SyncTransport>,
        config: SyncConfig,
    ) -> Self {
        let (updates, _) = broadcast::channel(config.event_buffer.max(1));
        let (state, _) = watch::channel(ChannelState::Idle);
        let enrollment = EnrollmentState::for_session(&sessions);

        Self {
            inner: Arc::new(Inner {
                api,
                sessions,
                transport,
                config,
                events: RwLock::new(Vec::new()),
                enrollment: RwLock::new(enrollment),
                action_lock: Mutex::new(()),
                updates,
                state,
                task: StdMutex::new(None),
            }),
        }
    }

    /// Open the persistent connection if it is not already running
    pub fn start(&self) {
        let mut task = self.inner.task.lock().unwrap_or_else(|p| p.into_inner());
        if task.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let inner = Arc::clone(&self.inner);
        *task = Some(tokio::spawn(async move { inner.run().await }));
    }

    /// Leave `Degraded` and begin a fresh connection cycle
    ///
    /// Returns `false` when the channel was not degraded.
    pub fn retry(&self) -> bool {
        if self.state() != ChannelState::Degraded {
            return false;
        }
        tracing::info!("Retrying attendance channel");
        self.start();
        true
    }

    /// Close the connection and stop reconnecting
    pub fn stop(&self) {
        let mut task = self.inner.task.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(handle) = task.take() {
            handle.abort();
        }
        self.inner.state.send_replace(ChannelState::Idle);
    }

    pub fn state(&self) -> ChannelState {
        *self.inner.state.borrow()
    }

    /// Receiver that observes every state transition
    pub fn watch_state(&self) -> watch::Receiver<ChannelState> {
        self.inner.state.subscribe()
    }

    /// Listen for applied attendee-count changes
    pub fn subscribe(&self) -> broadcast::Receiver<AttendeeUpdate> {
        self.inner.updates.subscribe()
    }

    /// Install the events whose counts this channel keeps current
    pub async fn load_events(&self, events: Vec<Event>) {
        *self.inner.events.write().await = events;
    }

    /// Snapshot of the locally held events
    pub async fn events(&self) -> Vec<Event> {
        self.inner.events.read().await.clone()
    }

    pub async fn event(&self, id: &str) -> Option<Event> {
        self.inner
            .events
            .read()
            .await
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    pub async fn is_enrolled(&self, id: &str) -> bool {
        self.inner
            .enrollment()
            .await
            .status
            .get(id)
            .copied()
            .unwrap_or(false)
    }

    /// Snapshot of the local enrollment status
    pub async fn enrollment(&self) -> EnrollmentMap {
        self.inner.enrollment().await.status.clone()
    }

    /// Enroll in an event; `Ok(false)` when already enrolled
    pub async fn join(&self, id: &str) -> ClientResult<bool> {
        self.inner.set_enrolled(id, true).await
    }

    /// Withdraw from an event; `Ok(false)` when not enrolled
    pub async fn withdraw(&self, id: &str) -> ClientResult<bool> {
        self.inner.set_enrolled(id, false).await
    }

    /// Replace local enrollment status with the server's
    pub async fn reconcile(&self) -> ClientResult<()> {
        let generation = self.inner.sessions.generation();
        let token = self.inner.require_token()?;
        let ids = self
            .inner
            .api
            .enrolled_events(&token)
            .await
            .map_err(|e| self.inner.auth_failure(e))?;

        let status: EnrollmentMap = ids.into_iter().map(|id| (id, true)).collect();
        tracing::debug!(enrolled = status.len(), "Reconciled enrollment status");

        let mut enrollment = self.inner.enrollment().await;
        if enrollment.generation != generation {
            tracing::debug!("Session changed during reconcile, discarding result");
            return Ok(());
        }
        enrollment.status = status;
        self.inner.persist(&enrollment.status);
        Ok(())
    }

    /// Apply a raw frame as if it arrived on the connection
    #[cfg(test)]
    pub(crate) async fn inject_frame(&self, text: &str) {
        self.inner.handle_frame(text).await;
    }
}

impl Inner {
    async fn run(&self) {
        let max_attempts = self.config.max_reconnect_attempts;
        let delay = Duration::from_millis(self.config.reconnect_delay_ms);
        let mut attempt: u32 = 0;

        loop {
            self.state.send_replace(if attempt == 0 {
                ChannelState::Connecting
            } else {
                ChannelState::Reconnecting { attempt }
            });

            match self.transport.connect().await {
                Ok(mut connection) => {
                    attempt = 0;
                    self.state.send_replace(ChannelState::Connected);
                    tracing::info!("Attendance channel connected");

                    while let Some(frame) = connection.next_frame().await {
                        match frame {
                            Ok(text) => self.handle_frame(&text).await,
                            Err(e) => {
                                tracing::warn!(error = %e, "Attendance channel read failed");
                                break;
                            }
                        }
                    }
                    tracing::warn!("Attendance channel disconnected");
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Attendance channel connect failed");
                }
            }

            if attempt >= max_attempts {
                self.state.send_replace(ChannelState::Degraded);
                tracing::error!(
                    attempts = max_attempts,
                    "Attendance channel degraded, live counts paused"
                );
                return;
            }

            attempt += 1;
            tokio::time::sleep(delay).await;
        }
    }

    async fn handle_frame(&self, text: &str) {
        match serde_json::from_str::<InboundMessage>(text) {
            Ok(InboundMessage::AttendeeCountUpdated {
                event_id,
                people_attend,
            }) => {
                self.apply_count_update(&event_id, people_attend).await;
            }
            Ok(InboundMessage::Connected { connection_id }) => {
                tracing::debug!(?connection_id, "Attendance channel acknowledged");
            }
            Ok(InboundMessage::Error { message }) => {
                tracing::warn!(%message, "Attendance channel server error");
            }
            Ok(InboundMessage::Pong) => {}
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring unrecognised frame");
            }
        }
    }

    /// Last write wins; unknown ids are ignored
    async fn apply_count_update(&self, event_id: &str, count: u64) -> bool {
        let mut applied = false;
        {
            let mut events = self.events.write().await;
            for event in events.iter_mut().filter(|e| e.id == event_id) {
                event.attendee_count = count;
                applied = true;
            }
        }

        if applied {
            tracing::debug!(event_id, count, "Attendee count updated");
            // No listeners is fine
            let _ = self.updates.send(AttendeeUpdate {
                event_id: event_id.to_string(),
                count,
            });
        } else {
            tracing::debug!(event_id, "Count update for event not held locally");
        }
        applied
    }

    async fn set_enrolled(&self, id: &str, enrolled: bool) -> ClientResult<bool> {
        let _guard = self.action_lock.lock().await;

        let (generation, current) = {
            let state = self.enrollment().await;
            (state.generation, state.status.get(id).copied().unwrap_or(false))
        };
        if current == enrolled {
            tracing::debug!(event_id = %id, enrolled, "Enrollment unchanged, skipping request");
            return Ok(false);
        }

        let token = self.require_token()?;
        let result = if enrolled {
            self.api.join_event(&token, id).await
        } else {
            self.api.withdraw_event(&token, id).await
        };
        if let Err(e) = result {
            tracing::warn!(event_id = %id, enrolled, error = %e, "Enrollment change failed");
            return Err(self.auth_failure(e));
        }

        let mut enrollment = self.enrollment().await;
        if enrollment.generation != generation {
            // Signed out while the request was in flight
            tracing::debug!(event_id = %id, "Session changed, not recording enrollment");
            return Ok(true);
        }
        enrollment.status.insert(id.to_string(), enrolled);
        self.persist(&enrollment.status);
        tracing::info!(event_id = %id, enrolled, "Enrollment changed");
        Ok(true)
    }

    /// Enrollment status of the current session
    ///
    /// Status cached for an earlier session (logout, rejected token, another
    /// login) is replaced by the current session's persisted hint.
    async fn enrollment(&self) -> RwLockWriteGuard<'_, EnrollmentState> {
        let mut state = self.enrollment.write().await;
        if state.generation != self.sessions.generation() {
            tracing::debug!("Session changed, reloading enrollment status");
            *state = EnrollmentState::for_session(&self.sessions);
        }
        state
    }

    fn require_token(&self) -> ClientResult<String> {
        self.sessions
            .token()
            .ok_or_else(|| ClientError::Auth("sign in to manage enrollment".to_string()))
    }

    /// A rejected token ends the session
    fn auth_failure(&self, err: ClientError) -> ClientError {
        if err.is_auth() {
            if let Err(e) = self.sessions.clear() {
                tracing::warn!(error = %e, "Failed to clear rejected session");
            }
        }
        err
    }

    fn persist(&self, enrollment: &EnrollmentMap) {
        if let Err(e) = self.sessions.save_enrollment(enrollment) {
            tracing::warn!(error = %e, "Failed to persist enrollment status");
        }
    }
}
