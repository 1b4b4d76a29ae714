//! Access Gate
//!
//! Decides whether a navigation target may be entered given the current
//! session. The decision is recomputed from the session store on every
//! navigation; nothing is cached between calls.

use std::fmt;

use crate::session::{Role, Session, SessionStore};

/// Navigation targets of the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Signup,
    GuestRegister,
    Dashboard,
    CreateEvent,
    /// Event detail, for one event or for the whole list
    EventDetail(Option<String>),
}

impl Route {
    /// Parse an application path such as `/event-detail/42`
    pub fn parse(path: &str) -> Option<Self> {
        let trimmed = path.trim().trim_end_matches('/');
        let mut segments = trimmed.trim_start_matches('/').splitn(2, '/');
        let head = segments.next().unwrap_or_default();
        let rest = segments.next().filter(|s| !s.is_empty());

        match (head, rest) {
            ("", None) => Some(Route::Signup),
            ("home", None) => Some(Route::Home),
            ("login", None) => Some(Route::Login),
            ("guest-register", None) => Some(Route::GuestRegister),
            ("dashboard", None) => Some(Route::Dashboard),
            ("create-event", None) => Some(Route::CreateEvent),
            ("event-detail", None) => Some(Route::EventDetail(None)),
            ("event-detail", Some(id)) if !id.contains('/') => {
                Some(Route::EventDetail(Some(id.to_string())))
            }
            _ => None,
        }
    }

    /// Path this route is served under
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/home".to_string(),
            Route::Login => "/login".to_string(),
            Route::Signup => "/".to_string(),
            Route::GuestRegister => "/guest-register".to_string(),
            Route::Dashboard => "/dashboard".to_string(),
            Route::CreateEvent => "/create-event".to_string(),
            Route::EventDetail(None) => "/event-detail".to_string(),
            Route::EventDetail(Some(id)) => format!("/event-detail/{}", id),
        }
    }

    /// Member-only views
    pub fn is_protected(&self) -> bool {
        matches!(
            self,
            Route::Dashboard | Route::CreateEvent | Route::EventDetail(_)
        )
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Authorization state derived from a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Unauthenticated,
    AuthenticatedGuest,
    AuthenticatedMember,
}

impl GateState {
    /// Classify a session; unknown roles fail closed
    pub fn of(session: &Session) -> Self {
        if !session.has_token() {
            return GateState::Unauthenticated;
        }
        match session.role {
            Role::Member => GateState::AuthenticatedMember,
            Role::Guest => GateState::AuthenticatedGuest,
            Role::Absent => GateState::Unauthenticated,
        }
    }
}

/// Outcome of a navigation check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Render(Route),
    Redirect(Route),
}

impl GateDecision {
    pub fn is_render(&self) -> bool {
        matches!(self, GateDecision::Render(_))
    }

    /// Route that ends up on screen
    pub fn target(&self) -> &Route {
        match self {
            GateDecision::Render(route) | GateDecision::Redirect(route) => route,
        }
    }
}

/// Where a freshly signed-in user lands
pub fn landing_route(role: Role) -> Route {
    match role {
        Role::Member => Route::Dashboard,
        Role::Guest | Role::Absent => Route::Home,
    }
}

/// Pure gate decision for a session and a requested route
pub fn decide(session: &Session, route: Route) -> GateDecision {
    if !route.is_protected() {
        return GateDecision::Render(route);
    }

    match GateState::of(session) {
        GateState::Unauthenticated => GateDecision::Redirect(Route::Login),
        GateState::AuthenticatedGuest => GateDecision::Redirect(Route::Home),
        GateState::AuthenticatedMember => GateDecision::Render(route),
    }
}

/// Navigation guard bound to the session store
#[derive(Debug, Clone)]
pub struct AccessGate {
    sessions: SessionStore,
}

impl AccessGate {
    pub fn new(sessions: SessionStore) -> Self {
        Self { sessions }
    }

    /// Current authorization state, read fresh from the store
    pub fn state(&self) -> GateState {
        GateState::of(&self.sessions.load())
    }

    /// Check a navigation against the current session
    pub fn evaluate(&self, route: Route) -> GateDecision {
        let session = self.sessions.load();
        let decision = decide(&session, route);

        if let GateDecision::Redirect(target) = &decision {
            tracing::debug!(state = ?GateState::of(&session), redirect = %target, "Navigation redirected");
        }
        decision
    }

    /// Check a navigation given as a path; unknown paths go home
    pub fn evaluate_path(&self, path: &str) -> GateDecision {
        match Route::parse(path) {
            Some(route) => self.evaluate(route),
            None => GateDecision::Redirect(Route::Home),
        }
    }

    /// Login page check: signed-in users are sent to their landing view
    pub fn evaluate_login_page(&self) -> GateDecision {
        let session = self.sessions.load();
        match GateState::of(&session) {
            GateState::Unauthenticated => GateDecision::Render(Route::Login),
            _ => GateDecision::Redirect(landing_route(session.role)),
        }
    }
}
