//! Event Service API
//!
//! The [`EventApi`] trait is the seam between the client components and the
//! remote event service. [`HttpEventApi`] talks to the real service over
//! HTTP; tests substitute in-process fakes.
//!
//! ## Endpoints
//!
//! | Method | Path                    | Auth   |
//! |--------|-------------------------|--------|
//! | GET    | `/api/events`           | -      |
//! | GET    | `/api/events/:id`       | -      |
//! | POST   | `/api/events`           | bearer |
//! | PUT    | `/api/events/:id`       | bearer |
//! | DELETE | `/api/events/:id`       | bearer |
//! | POST   | `/api/:id/join`         | bearer |
//! | POST   | `/api/:id/withdraw`     | bearer |
//! | GET    | `/api/user/events`      | bearer |
//! | POST   | `/login`                | -      |
//! | POST   | `/signup`               | -      |
//! | POST   | `/guestsignup`          | -      |

mod client;
mod dto;

pub use client::HttpEventApi;
pub use dto::{
    Credentials, EnrolledEvent, Event, EventFields, ImageUpload, LoginResponse, MessageBody,
    SignupForm,
};

use async_trait::async_trait;

use crate::error::ClientResult;

/// Operations offered by the remote event service
#[async_trait]
pub trait EventApi: Send + Sync {
    /// List every published event
    async fn list_events(&self) -> ClientResult<Vec<Event>>;

    /// Fetch a single event
    async fn get_event(&self, id: &str) -> ClientResult<Event>;

    /// Create an event; the body is not always an event record
    async fn create_event(
        &self,
        token: &str,
        fields: &EventFields,
        image: Option<&ImageUpload>,
    ) -> ClientResult<Option<Event>>;

    /// Replace the fields of an existing event
    async fn update_event(
        &self,
        token: &str,
        id: &str,
        fields: &EventFields,
        image: Option<&ImageUpload>,
    ) -> ClientResult<Option<Event>>;

    async fn delete_event(&self, token: &str, id: &str) -> ClientResult<()>;

    async fn join_event(&self, token: &str, id: &str) -> ClientResult<()>;

    async fn withdraw_event(&self, token: &str, id: &str) -> ClientResult<()>;

    /// Ids of the events the token's user is enrolled in
    async fn enrolled_events(&self, token: &str) -> ClientResult<Vec<String>>;

    async fn login(&self, credentials: &Credentials) -> ClientResult<LoginResponse>;

    /// Register a member account, returning the service's acknowledgement
    async fn signup(&self, form: &SignupForm) -> ClientResult<String>;

    /// Register a guest account, returning the service's acknowledgement
    async fn guest_signup(&self, form: &SignupForm) -> ClientResult<String>;
}
