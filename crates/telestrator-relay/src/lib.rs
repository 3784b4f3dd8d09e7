//! telestrator-relay: signaling relay and snapshot fan-out.
//!
//! Browsers connect over WebSocket and exchange negotiation envelopes
//! through the relay. Envelopes that arrive while only one socket is
//! connected are cached until a joiner asks for them. Still frames sent by
//! the drawing client are decoded and streamed to passive HTTP viewers as
//! `multipart/x-mixed-replace`.

pub mod connection;
pub mod fanout;
pub mod hub;
pub mod logging;
pub mod server;
pub mod viewer;


pub use fanout::{FanoutHandle, SnapshotFanout};
pub use hub::{ConnId, HubHandle, RelayHub};
pub use server::RelayServer;
