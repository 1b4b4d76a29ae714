//! Wire types for the event service
//!
//! Field names follow the service's JSON (`_id`, `imageUrl`,
//! `peopleAttend`); Rust-side names are snake_case.

use serde::{Deserialize, Deserializer, Serialize};

/// An event as published by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Event date as sent by the service (ISO date or timestamp)
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "number_or_string")]
    pub price: f64,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "imageUrl", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(rename = "peopleAttend", default)]
    pub attendee_count: u64,
}

/// The service stores form submissions verbatim, so prices arrive either as
/// JSON numbers or as strings. Text that is not a number ("Free", "TBA")
/// reads as 0 so one odd record never hides the rest of the catalog.
fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    let price = match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => n,
        Some(Raw::Text(s)) => match s.trim() {
            "" => 0.0,
            text => text.parse().unwrap_or_else(|_| {
                tracing::debug!(price = %text, "Non-numeric price, reading as 0");
                0.0
            }),
        },
        Some(Raw::Other(_)) | None => 0.0,
    };
    Ok(price)
}

/// Editable fields of an event, submitted as multipart form data
#[derive(Debug, Clone, PartialEq)]
pub struct EventFields {
    pub name: String,
    pub date: String,
    pub description: String,
    pub price: f64,
    pub location: String,
    pub category: String,
    pub status: String,
}

impl Default for EventFields {
    fn default() -> Self {
        Self {
            name: String::new(),
            date: String::new(),
            description: String::new(),
            price: 0.0,
            location: String::new(),
            category: "Conference".to_string(),
            status: "Upcoming".to_string(),
        }
    }
}

impl EventFields {
    /// Prefill an edit form from an existing event
    pub fn from_event(event: &Event) -> Self {
        Self {
            name: event.name.clone(),
            date: event.date.clone(),
            description: event.description.clone(),
            price: event.price,
            location: event.location.clone(),
            category: event.category.clone(),
            ..Self::default()
        }
    }

    /// Form fields in submission order
    pub fn form_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.name.clone()),
            ("date", self.date.clone()),
            ("description", self.description.clone()),
            ("price", self.price.to_string()),
            ("status", self.status.clone()),
            ("location", self.location.clone()),
            ("category", self.category.clone()),
        ]
    }
}

/// Image attached to an event submission
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Build an upload from a file name, guessing the MIME type from its extension
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        let mime = match ext.as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "webp" => "image/webp",
            _ => "application/octet-stream",
        };
        Self {
            file_name,
            mime: mime.to_string(),
            bytes,
        }
    }
}

/// Login request body
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Signup request body (member and guest signup share it)
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Successful login response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_role: String,
}

/// Generic `{ "message": ... }` body used for acknowledgements and errors
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl MessageBody {
    pub fn text(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or(self.error.as_deref())
            .filter(|m| !m.is_empty())
    }
}

/// Entry of the enrolled-events listing; only the id is used
#[derive(Debug, Clone, Deserialize)]
pub struct EnrolledEvent {
    #[serde(rename = "_id")]
    pub id: String,
}
