//! Signaling wire protocol.
//!
//! Text frames are classified once by their first character. Negotiation
//! envelopes are JSON and are relayed as the exact text received; the
//! relay itself never parses them.

use serde::{Deserialize, Serialize};

use crate::id::EndpointId;

/// Text a joiner sends to make the relay drain its cache.
pub const REPLAY_REQUEST: &str = "request";

/// 1x1 transparent GIF pushed to viewers when a signaling socket closes.
pub const BLANK_FRAME: &str =
    "data:image/gif;base64,R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7";

// ---------------------------------------------------------------------------
// Inbound classification
// ---------------------------------------------------------------------------

/// A text frame received by the relay, classified by its leading tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// `d`: an encoded still frame (data URI). Never relayed.
    Frame(String),
    /// `r`: drain the message cache.
    Replay,
    /// `l`: free-text diagnostic for the operator log. Never relayed.
    Log(String),
    /// Anything else: a negotiation envelope, relayed verbatim.
    Envelope(String),
}

impl Inbound {
    pub fn decode(text: String) -> Self {
        match text.as_bytes().first() {
            Some(b'd') => Self::Frame(text),
            Some(b'r') => Self::Replay,
            Some(b'l') => Self::Log(text),
            _ => Self::Envelope(text),
        }
    }
}

// ---------------------------------------------------------------------------
// Negotiation envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Offer,
    Answer,
    Candidate,
    Desc,
    Request,
    Log,
}

/// `{id, action, data}` envelope exchanged between endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalingMessage {
    pub id: EndpointId,
    pub action: Action,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl SignalingMessage {
    pub fn new(id: EndpointId, action: Action, data: serde_json::Value) -> Self {
        Self { id, action, data }
    }

    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Format a diagnostic line the relay will log rather than relay.
pub fn log_line(id: &EndpointId, text: &str) -> String {
    format!("log: id:{id} {text}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_is_a_frame() {
        let inbound = Inbound::decode("data:image/png;base64,AAAA".into());
        assert_eq!(inbound, Inbound::Frame("data:image/png;base64,AAAA".into()));
    }

    #[test]
    fn request_is_a_replay() {
        assert_eq!(Inbound::decode(REPLAY_REQUEST.into()), Inbound::Replay);
        // Only the tag matters.
        assert_eq!(Inbound::decode("r".into()), Inbound::Replay);
    }

    #[test]
    fn log_prefix_is_a_log() {
        let inbound = Inbound::decode("log: track!".into());
        assert_eq!(inbound, Inbound::Log("log: track!".into()));
    }

    #[test]
    fn json_and_empty_text_are_envelopes() {
        let json = r#"{"id":"a","action":"offer","data":{}}"#;
        assert_eq!(Inbound::decode(json.into()), Inbound::Envelope(json.into()));
        assert_eq!(Inbound::decode(String::new()), Inbound::Envelope(String::new()));
    }

    #[test]
    fn envelope_wire_shape() {
        let msg = SignalingMessage::new(
            EndpointId::from("h1"),
            Action::Candidate,
            serde_json::json!({"candidate": "candidate:1 1 udp 1 10.0.0.1 5000 typ host"}),
        );
        let text = msg.to_text().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["id"], "h1");
        assert_eq!(value["action"], "candidate");
        assert!(value["data"]["candidate"].is_string());
    }

    #[test]
    fn envelope_without_data_parses() {
        let msg = SignalingMessage::from_text(r#"{"id":"j1","action":"request"}"#).unwrap();
        assert_eq!(msg.action, Action::Request);
        assert!(msg.data.is_null());
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(SignalingMessage::from_text(r#"{"id":"x","action":"hangup","data":1}"#).is_err());
    }

    #[test]
    fn log_line_carries_identity() {
        let id = EndpointId::from("abc");
        assert_eq!(log_line(&id, "onOffer"), "log: id:abc onOffer");
        assert!(matches!(Inbound::decode(log_line(&id, "x")), Inbound::Log(_)));
    }

    #[test]
    fn envelope_with_numeric_id_parses() {
        let msg =
            SignalingMessage::from_text(r#"{"id":1700000000000.25,"action":"answer","data":{}}"#)
                .unwrap();
        assert_eq!(msg.id.as_str(), "1700000000000.25");
        assert_eq!(msg.action, Action::Answer);
    }
}
