//! The media/negotiation capability an endpoint drives.
//!
//! Payload types serialize the way a browser's `RTCSessionDescription` and
//! `RTCIceCandidate` do, so envelopes interoperate with browser peers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use telestrator_common::NegotiationError;

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Pranswer,
    Answer,
    Rollback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpType,
    #[serde(default)]
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default, rename = "sdpMLineIndex")]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: Some("0".into()),
            sdp_m_line_index: Some(0),
            username_fragment: None,
        }
    }
}

/// A media track received from the remote peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub id: String,
    pub kind: String,
}

/// Things the session reports on its own schedule.
#[derive(Debug, Clone)]
pub enum PeerEvent {
    /// A local network candidate was discovered.
    LocalCandidate(IceCandidate),
    /// The remote peer's media arrived.
    Track(RemoteTrack),
    /// The underlying connection failed.
    Failed(String),
}

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// One peer connection. Every call is a suspension point with no timeout
/// of its own; wrap the endpoint in a deadline if one is needed.
#[async_trait]
pub trait PeerSession: Send + Sync {
    /// Capture the shared window and attach its tracks. Host only.
    async fn acquire_local_media(&mut self) -> Result<(), NegotiationError>;

    async fn create_offer(&mut self) -> Result<SessionDescription, NegotiationError>;

    async fn create_answer(&mut self) -> Result<SessionDescription, NegotiationError>;

    async fn set_local_description(
        &mut self,
        description: SessionDescription,
    ) -> Result<(), NegotiationError>;

    async fn set_remote_description(
        &mut self,
        description: SessionDescription,
    ) -> Result<(), NegotiationError>;

    /// Apply one remote candidate. A rejection is reported as
    /// `NegotiationError::Candidate` and does not end the negotiation.
    async fn add_ice_candidate(&mut self, candidate: IceCandidate) -> Result<(), NegotiationError>;
}
