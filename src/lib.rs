//! # Eventdesk
//!
//! Client for an event discovery and enrollment service. Browse and filter
//! the catalog, sign in, author events, and join or withdraw with attendee
//! counts kept live over a WebSocket channel.
//!
//! ## Modules
//!
//! - [`session`]: Persisted session (token, user id, role) and enrollment cache
//! - [`gate`]: Route authorization from the current session
//! - [`catalog`]: Event fetching and local filtering
//! - [`sync`]: Real-time attendee counts, join and withdraw
//! - [`authoring`]: Create, update and delete events
//! - [`auth`]: Login, signup and logout
//! - [`scope`]: Cancel-on-drop ownership of a view's tasks
//! - [`api`]: The [`api::EventApi`] seam and its HTTP implementation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use eventdesk::catalog::{CategoryFilter, EventFilter};
//! use eventdesk::{Config, EventDesk};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let desk = EventDesk::from_config(Config::load_default())?;
//!
//!     desk.auth.login("ada@example.com", "secret1").await?;
//!     desk.load_home().await?;
//!     desk.sync.start();
//!
//!     let music = EventFilter {
//!         category: CategoryFilter::parse("Music"),
//!         ..EventFilter::all()
//!     };
//!     for event in desk.catalog.filtered(&music).await {
//!         println!("{} ({} attending)", event.name, event.attendee_count);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod authoring;
pub mod catalog;
pub mod config;
pub mod desk;
pub mod error;
pub mod gate;
pub mod logging;
pub mod scope;
pub mod session;
pub mod sync;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use desk::EventDesk;
pub use error::{ClientError, ClientResult};
