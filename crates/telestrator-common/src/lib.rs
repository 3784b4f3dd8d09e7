pub mod errors;
pub mod frame;
pub mod id;
pub mod protocol;

pub use errors::{ConfigError, FrameError, NegotiationError, TelestratorError};
pub use frame::decode_data_uri;
pub use id::EndpointId;
pub use protocol::{Action, Inbound, SignalingMessage, BLANK_FRAME, REPLAY_REQUEST};
