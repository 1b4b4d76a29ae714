//! Login, signup and logout
//!
//! Form checks run locally before any request. A successful login is
//! written to the [`SessionStore`], where every other component picks it up.

use regex::Regex;
use std::sync::{Arc, LazyLock};

use crate::api::{Credentials, EventApi, SignupForm};
use crate::error::{ClientError, ClientResult};
use crate::gate::{landing_route, Route};
use crate::session::{Role, Session, SessionStore};

const MIN_PASSWORD_LEN: usize = 6;
const ALREADY_REGISTERED: &str = "Email already registered";

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

/// Check login input
pub fn validate_login(email: &str, password: &str) -> ClientResult<()> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(ClientError::Validation("Both fields are required.".to_string()));
    }
    if !is_valid_email(email.trim()) {
        return Err(ClientError::Validation("Invalid email format.".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ClientError::Validation(
            "Password must be at least 6 characters.".to_string(),
        ));
    }
    Ok(())
}

/// Check signup input; the first failing field wins
pub fn validate_signup(form: &SignupForm) -> ClientResult<()> {
    let fail = |msg: &str| Err(ClientError::Validation(msg.to_string()));

    if form.email.trim().is_empty() {
        return fail("Email is required.");
    }
    if !is_valid_email(form.email.trim()) {
        return fail("Enter a valid email address.");
    }
    if form.password.is_empty() {
        return fail("Password is required.");
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return fail("Password must be at least 6 characters.");
    }
    if form.confirm_password.is_empty() {
        return fail("Confirm Password is required.");
    }
    if form.confirm_password != form.password {
        return fail("Passwords do not match.");
    }
    Ok(())
}

/// Account operations bound to the shared session
#[derive(Clone)]
pub struct AuthClient {
    api: Arc<dyn EventApi>,
    sessions: SessionStore,
}

impl AuthClient {
    pub fn new(api: Arc<dyn EventApi>, sessions: SessionStore) -> Self {
        Self { api, sessions }
    }

    /// Sign in and store the session; returns where the user should land
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<Route> {
        validate_login(email, password)?;

        let credentials = Credentials {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let response = self.api.login(&credentials).await.map_err(|e| match e {
            ClientError::ServerRejection { status, message } if message.is_empty() => {
                ClientError::ServerRejection {
                    status,
                    message: "Invalid credentials.".to_string(),
                }
            }
            other => other,
        })?;

        let role = Role::parse(&response.user_role);
        if !role.is_present() {
            tracing::warn!(role = %response.user_role, "Login returned an unrecognised role");
            return Err(ClientError::Auth(format!(
                "unsupported account role '{}'",
                response.user_role
            )));
        }

        self.sessions
            .set(&Session::authenticated(response.token, response.user_id, role))?;
        tracing::info!(%role, "Signed in");
        Ok(landing_route(role))
    }

    /// Register a member account
    pub async fn signup(&self, form: &SignupForm) -> ClientResult<String> {
        validate_signup(form)?;
        let result = self.api.signup(form).await;
        registered(result)
    }

    /// Register a guest account
    pub async fn guest_signup(&self, form: &SignupForm) -> ClientResult<String> {
        validate_signup(form)?;
        let result = self.api.guest_signup(form).await;
        registered(result)
    }

    /// Drop the session and the cached enrollment status
    pub fn logout(&self) -> ClientResult<()> {
        self.sessions.clear()?;
        tracing::info!("Signed out");
        Ok(())
    }

    pub fn session(&self) -> Session {
        self.sessions.load()
    }
}

fn registered(result: ClientResult<String>) -> ClientResult<String> {
    match result {
        Ok(message) => {
            tracing::info!(%message, "Account registered");
            Ok(message)
        }
        Err(ClientError::ServerRejection { message, .. }) if message == ALREADY_REGISTERED => {
            Err(ClientError::AlreadyRegistered)
        }
        Err(e) => Err(e),
    }
}
