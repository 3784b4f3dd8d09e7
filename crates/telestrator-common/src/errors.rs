use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// A `d`-tagged payload that could not be turned into image bytes.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("malformed data URI: {0}")]
    Malformed(String),

    #[error("invalid base64 payload")]
    InvalidBase64,
}

#[derive(Debug, thiserror::Error)]
pub enum NegotiationError {
    #[error("media acquisition failed: {0}")]
    MediaAcquisition(String),

    #[error("session description rejected: {0}")]
    Description(String),

    #[error("ice candidate rejected: {0}")]
    Candidate(String),

    #[error("peer connection failed: {0}")]
    PeerConnection(String),

    #[error("signaling error: {0}")]
    Signaling(String),

    #[error("signaling channel closed")]
    ChannelClosed,
}

#[derive(Debug, thiserror::Error)]
pub enum TelestratorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("network error: {0}")]
    Network(String),

    #[error("{0}")]
    Other(String),
}
