//! Client error types
//!
//! Every fallible client operation returns [`ClientError`]. Callers decide
//! how to surface each kind: validation errors block a submission locally,
//! network and server errors become user-visible messages, and auth errors
//! send the user back to the login page.

use thiserror::Error;

/// Errors that can occur in the event client
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport failure or timeout talking to the event service
    #[error("Network error: {0}")]
    Network(String),

    /// Missing, stale or rejected auth token
    #[error("Authentication required: {0}")]
    Auth(String),

    /// Malformed input caught before submission
    #[error("{0}")]
    Validation(String),

    /// Non-2xx response from the event service
    #[error("Server rejected request ({status}): {message}")]
    ServerRejection { status: u16, message: String },

    /// Signup attempted with an email the service already knows
    #[error("Email already registered")]
    AlreadyRegistered,

    /// Response body did not match the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Persisted client state could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ClientError {
    /// Whether the caller should drop the current session
    pub fn is_auth(&self) -> bool {
        matches!(self, ClientError::Auth(_))
    }

    /// Message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            ClientError::ServerRejection { message, .. } => message.clone(),
            ClientError::Network(_) => "An error occurred. Please try again.".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;
