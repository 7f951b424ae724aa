//! Wire model for the realtime event stream.
//!
//! Frames arrive as flat JSON text: `{ "type": ..., "data": {...},
//! "timestamp": ... }`. Decoding happens in two stages so an unrecognized
//! `type` is an ordinary classification miss rather than a decode failure:
//! first the frame shell ([`RawFrame`]), then the discriminant-specific
//! payload ([`ServerEvent::from_frame`]).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One inbound frame, decoded just far enough to classify.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawFrame {
    /// Event discriminant.
    #[serde(rename = "type")]
    pub kind: String,
    /// Discriminant-specific payload, kept opaque until classified.
    #[serde(default)]
    pub data: Value,
    /// ISO-8601 server clock, informational only.
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Payload for `session_connected` / `session_disconnected`.
///
/// A disconnect may carry only the id, so everything past it is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionEvent {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub remote_address: Option<String>,
    #[serde(default)]
    pub transport: Option<String>,
}

/// Payload for `beacon_checkin`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BeaconCheckin {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub remote_address: Option<String>,
    /// Set by the server only on a beacon's first check-in. Routine
    /// check-ins refresh caches but must not raise alerts.
    #[serde(default)]
    pub is_new: bool,
}

/// Payload for `beacon_disconnected`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BeaconEvent {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Payload for `task_completed`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaskCompleted {
    pub beacon_id: String,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub task_type: Option<String>,
}

/// Payload for server-pushed `notification` events.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerNotice {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: String,
    /// `"error"` selects error styling; anything else is informational.
    #[serde(default)]
    pub variant: Option<String>,
}

/// A classified inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    SessionConnected(SessionEvent),
    SessionDisconnected(SessionEvent),
    BeaconCheckin(BeaconCheckin),
    BeaconDisconnected(BeaconEvent),
    TaskCompleted(TaskCompleted),
    Notice(ServerNotice),
}

impl ServerEvent {
    /// Classify a frame by its discriminant and decode the payload.
    ///
    /// `Ok(None)` means the discriminant is not one we know; the caller logs
    /// it at debug and drops the frame. `Err` means a known discriminant
    /// carried a payload we could not decode.
    pub fn from_frame(frame: &RawFrame) -> Result<Option<ServerEvent>, serde_json::Error> {
        let data = frame.data.clone();
        let event = match frame.kind.as_str() {
            "session_connected" => Self::SessionConnected(serde_json::from_value(data)?),
            "session_disconnected" => Self::SessionDisconnected(serde_json::from_value(data)?),
            "beacon_checkin" => Self::BeaconCheckin(serde_json::from_value(data)?),
            "beacon_disconnected" => Self::BeaconDisconnected(serde_json::from_value(data)?),
            "task_completed" => Self::TaskCompleted(serde_json::from_value(data)?),
            "notification" => Self::Notice(serde_json::from_value(data)?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

/// Outbound frames. The stream is inbound-dominant; these cover keepalive and
/// channel subscription only.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
    Subscribe { channels: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(raw: &str) -> RawFrame {
        serde_json::from_str(raw).expect("frame shell should decode")
    }

    #[test]
    fn session_connected_decodes() {
        let frame = frame(
            r#"{"type":"session_connected","data":{"id":"abc","name":"srv1","remote_address":"10.0.0.5"},"timestamp":"2024-01-01T00:00:00Z"}"#,
        );
        assert_eq!(frame.kind, "session_connected");
        assert_eq!(frame.timestamp.as_deref(), Some("2024-01-01T00:00:00Z"));

        let event = ServerEvent::from_frame(&frame).unwrap().unwrap();
        match event {
            ServerEvent::SessionConnected(s) => {
                assert_eq!(s.id, "abc");
                assert_eq!(s.name, "srv1");
                assert_eq!(s.remote_address.as_deref(), Some("10.0.0.5"));
                assert_eq!(s.hostname, None);
            }
            other => panic!("wrong classification: {:?}", other),
        }
    }

    #[test]
    fn unknown_discriminant_is_none() {
        let frame = frame(r#"{"type":"operator_joined","data":{"id":"x"}}"#);
        assert_eq!(ServerEvent::from_frame(&frame).unwrap(), None);
    }

    #[test]
    fn known_discriminant_with_bad_payload_is_err() {
        let frame = frame(r#"{"type":"beacon_checkin","data":42}"#);
        assert!(ServerEvent::from_frame(&frame).is_err());
    }

    #[test]
    fn checkin_is_new_defaults_to_false() {
        let frame = frame(r#"{"type":"beacon_checkin","data":{"id":"b1","name":"B"}}"#);
        match ServerEvent::from_frame(&frame).unwrap().unwrap() {
            ServerEvent::BeaconCheckin(b) => assert!(!b.is_new),
            other => panic!("wrong classification: {:?}", other),
        }
    }

    #[test]
    fn notice_tolerates_sparse_payload() {
        let frame = frame(r#"{"type":"notification","data":{"message":"scan finished"}}"#);
        match ServerEvent::from_frame(&frame).unwrap().unwrap() {
            ServerEvent::Notice(n) => {
                assert_eq!(n.message, "scan finished");
                assert_eq!(n.title, None);
                assert_eq!(n.variant, None);
            }
            other => panic!("wrong classification: {:?}", other),
        }
    }

    #[test]
    fn client_messages_serialize_flat() {
        assert_eq!(
            serde_json::to_string(&ClientMessage::Ping).unwrap(),
            r#"{"type":"ping"}"#
        );
        assert_eq!(
            serde_json::to_string(&ClientMessage::Subscribe {
                channels: vec!["events".into()],
            })
            .unwrap(),
            r#"{"type":"subscribe","channels":["events"]}"#
        );
    }
}
