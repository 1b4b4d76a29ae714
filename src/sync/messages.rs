//! Real-time channel message types
//!
//! Frames are JSON text messages tagged by `type`.

use serde::{Deserialize, Serialize};

/// Messages pushed by the event server
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InboundMessage {
    /// Attendee count of an event changed
    AttendeeCountUpdated {
        #[serde(rename = "eventId")]
        event_id: String,
        #[serde(rename = "peopleAttend")]
        people_attend: u64,
    },
    /// Connection established
    Connected {
        #[serde(default, rename = "connectionId")]
        connection_id: Option<String>,
    },
    /// Server-side error report
    Error { message: String },
    /// Keepalive reply
    Pong,
}

/// Attendee count change delivered to listeners
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendeeUpdate {
    pub event_id: String,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_attendee_update() {
        let json = r#"{"type": "attendeeCountUpdated", "eventId": "e1", "peopleAttend": 17}"#;
        let msg: InboundMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            InboundMessage::AttendeeCountUpdated {
                event_id: "e1".to_string(),
                people_attend: 17,
            }
        );
    }

    #[test]
    fn test_deserialize_connected_without_id() {
        let msg: InboundMessage = serde_json::from_str(r#"{"type": "connected"}"#).unwrap();
        assert!(matches!(msg, InboundMessage::Connected { connection_id: None }));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let result = serde_json::from_str::<InboundMessage>(r#"{"type": "eventDeleted", "eventId": "e1"}"#);
        assert!(result.is_err());
    }
}
