//! Session data types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role attached to an authenticated session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Guest,
    Member,
    /// No role stored, or one this client does not recognise
    #[default]
    Absent,
}

impl Role {
    /// Parse a role as sent by the event service
    ///
    /// Anything unrecognised becomes [`Role::Absent`] so the access gate
    /// fails closed.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "guest" => Role::Guest,
            "member" | "user" => Role::Member,
            _ => Role::Absent,
        }
    }

    /// Wire name, or `None` for [`Role::Absent`]
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            Role::Guest => Some("guest"),
            Role::Member => Some("member"),
            Role::Absent => None,
        }
    }

    pub fn is_present(&self) -> bool {
        !matches!(self, Role::Absent)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str().unwrap_or("none"))
    }
}

/// The client's record of its current authentication state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: Option<String>,
    pub user_id: Option<String>,
    pub role: Role,
}

impl Session {
    /// Session returned by a successful login
    pub fn authenticated(token: impl Into<String>, user_id: impl Into<String>, role: Role) -> Self {
        Self {
            token: Some(token.into()),
            user_id: Some(user_id.into()),
            role,
        }
    }

    /// The empty, signed-out session
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_token(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Token present if and only if a role is present
    pub fn is_consistent(&self) -> bool {
        self.has_token() == self.role.is_present()
    }

    /// Bearer token, if any
    pub fn bearer(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}
