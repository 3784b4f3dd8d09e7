use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Identity of one negotiation attempt.
///
/// Generated by the endpoint itself and carried in every envelope it sends.
/// The relay never validates it; receivers compare it against their own to
/// drop echoes of their own messages.
///
/// Serializes as a JSON string. Older browser clients send a numeric id
/// (`Date.now() + Math.random()`); those are accepted and kept in their
/// JSON text form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EndpointId(String);

impl EndpointId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EndpointId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for EndpointId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for EndpointId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Self(text),
            Raw::Number(number) => Self(number.to_string()),
        })
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_id_is_valid_uuid() {
        let id = EndpointId::new();
        let parsed = uuid::Uuid::parse_str(id.as_str());
        assert!(parsed.is_ok());
        assert_eq!(parsed.unwrap().get_version_num(), 4);
    }

    #[test]
    fn endpoint_id_is_unique() {
        assert_ne!(EndpointId::new(), EndpointId::new());
    }

    #[test]
    fn endpoint_id_display() {
        let id = EndpointId::new();
        assert_eq!(id.to_string(), id.as_str());
    }

    #[test]
    fn endpoint_id_serializes_as_plain_string() {
        let id = EndpointId::from("host-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"host-1\"");

        let back: EndpointId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn numeric_ids_from_legacy_clients_are_accepted() {
        let id: EndpointId = serde_json::from_str("1700000000000.5").unwrap();
        assert_eq!(id.as_str(), "1700000000000.5");

        let id: EndpointId = serde_json::from_str("42").unwrap();
        assert_eq!(id, EndpointId::from("42"));
    }

    #[test]
    fn other_json_types_are_rejected() {
        assert!(serde_json::from_str::<EndpointId>("true").is_err());
        assert!(serde_json::from_str::<EndpointId>("{\"id\":1}").is_err());
    }
}
