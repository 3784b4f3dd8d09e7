//! Peer-side negotiation against the telestrator relay.
//!
//! `NegotiationEndpoint` drives one browser's offer/answer/candidate
//! exchange. The media stack itself sits behind `PeerSession`; the relay
//! connection is a `SignalingChannel`.

pub mod endpoint;
pub mod session;
pub mod signaling;

pub use endpoint::{NegotiationEndpoint, NegotiationEvent, NegotiationState, Role};
pub use session::{IceCandidate, PeerEvent, PeerSession, RemoteTrack, SdpType, SessionDescription};
pub use signaling::SignalingChannel;
