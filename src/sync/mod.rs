//! Real-time attendance and enrollment synchronization

mod channel;
mod messages;
mod transport;

pub use channel::{ChannelState, EnrollmentSync};
pub use messages::{AttendeeUpdate, InboundMessage};
pub use transport::{SyncConnection, SyncTransport, WsTransport};
