//! Session Management
//!
//! Holds the auth token, user id and role, persisted across runs through an
//! injected key/value backend.
//!
//! - **Model**: [`Session`] and [`Role`]
//! - **Backend**: [`KeyValueStore`] with memory and file implementations
//! - **Store**: [`SessionStore`], the single reader/writer of session state

mod backend;
mod model;
mod store;

pub use backend::{FileStore, KeyValueStore, MemoryStore};
pub use model::{Role, Session};
pub use store::{EnrollmentMap, SessionStore};
