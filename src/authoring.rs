//! Event Mutation Client
//!
//! Create, update and delete events. Every call takes the bearer token from
//! the [`SessionStore`]; without one the call fails locally and nothing is
//! sent. Successful mutations refresh the shared [`EventCatalog`].

use std::sync::Arc;

use crate::api::{Event, EventApi, EventFields, ImageUpload};
use crate::catalog::EventCatalog;
use crate::error::{ClientError, ClientResult};
use crate::session::SessionStore;

/// Authoring operations against the event service
#[derive(Clone)]
pub struct EventAuthoring {
    api: Arc<dyn EventApi>,
    sessions: SessionStore,
    catalog: EventCatalog,
}

impl EventAuthoring {
    pub fn new(api: Arc<dyn EventApi>, sessions: SessionStore, catalog: EventCatalog) -> Self {
        Self {
            api,
            sessions,
            catalog,
        }
    }

    /// Publish a new event
    ///
    /// Returns the created event when the service echoes it back.
    pub async fn create(
        &self,
        fields: &EventFields,
        image: Option<&ImageUpload>,
    ) -> ClientResult<Option<Event>> {
        validate_fields(fields)?;
        let token = self.require_token()?;

        let created = self
            .api
            .create_event(&token, fields, image)
            .await
            .map_err(|e| self.rejected("create", None, e))?;

        tracing::info!(name = %fields.name, "Event created");
        self.catalog.refresh().await;
        Ok(created)
    }

    /// Replace the editable fields of an existing event
    pub async fn update(
        &self,
        id: &str,
        fields: &EventFields,
        image: Option<&ImageUpload>,
    ) -> ClientResult<Option<Event>> {
        validate_fields(fields)?;
        let token = self.require_token()?;

        let updated = self
            .api
            .update_event(&token, id, fields, image)
            .await
            .map_err(|e| self.rejected("update", Some(id), e))?;

        tracing::info!(event_id = %id, "Event updated");
        self.catalog.refresh().await;
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> ClientResult<()> {
        let token = self.require_token()?;

        self.api
            .delete_event(&token, id)
            .await
            .map_err(|e| self.rejected("delete", Some(id), e))?;

        tracing::info!(event_id = %id, "Event deleted");
        self.catalog.refresh().await;
        Ok(())
    }

    fn require_token(&self) -> ClientResult<String> {
        self.sessions
            .token()
            .ok_or_else(|| ClientError::Auth("sign in to manage events".to_string()))
    }

    fn rejected(&self, action: &str, id: Option<&str>, err: ClientError) -> ClientError {
        tracing::warn!(action, event_id = ?id, error = %err, "Event mutation failed");
        if err.is_auth() {
            if let Err(e) = self.sessions.clear() {
                tracing::warn!(error = %e, "Failed to clear rejected session");
            }
        }
        err
    }
}

/// Required-field presence check run before any submission
pub fn validate_fields(fields: &EventFields) -> ClientResult<()> {
    let required = [
        ("name", &fields.name),
        ("date", &fields.date),
        ("location", &fields.location),
        ("category", &fields.category),
    ];

    let missing: Vec<&str> = required
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| *field)
        .collect();
    if !missing.is_empty() {
        return Err(ClientError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    if !fields.price.is_finite() || fields.price < 0.0 {
        return Err(ClientError::Validation(
            "Price must be a non-negative number".to_string(),
        ));
    }
    Ok(())
}
