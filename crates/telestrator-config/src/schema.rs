use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Root
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelestratorConfig {
    pub server: ServerConfig,
    pub relay: RelayConfig,
    pub snapshot: SnapshotConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Listener addresses for the viewer endpoint and the signaling socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP port. Signaling listens on `port + 1` unless overridden.
    pub port: u16,
    pub http_bind: IpAddr,
    pub signaling_bind: IpAddr,
    pub signaling_port: Option<u16>,
    /// Directory served for every path other than the viewer endpoint.
    pub static_dir: Option<PathBuf>,
}

impl ServerConfig {
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http_bind, self.port)
    }

    pub fn signaling_addr(&self) -> SocketAddr {
        let port = self
            .signaling_port
            .unwrap_or_else(|| self.port.saturating_add(1));
        SocketAddr::new(self.signaling_bind, port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8888,
            http_bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            signaling_bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            signaling_port: None,
            static_dir: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Relay
// ---------------------------------------------------------------------------

/// Order in which cached envelopes are replayed on a `request`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayOrder {
    /// Most recent first. What deployed clients expect.
    #[default]
    Lifo,
    /// Arrival order.
    Fifo,
}

impl FromStr for ReplayOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lifo" => Ok(Self::Lifo),
            "fifo" => Ok(Self::Fifo),
            other => Err(format!("unknown replay order '{other}' (expected lifo or fifo)")),
        }
    }
}

impl fmt::Display for ReplayOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lifo => write!(f, "lifo"),
            Self::Fifo => write!(f, "fifo"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub replay_order: ReplayOrder,
    /// Queued outbound messages per signaling socket before deliveries drop.
    pub outbound_buffer: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            replay_order: ReplayOrder::Lifo,
            outbound_buffer: 256,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot viewers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Queued multipart parts per viewer before frames drop for that viewer.
    pub listener_buffer: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self { listener_buffer: 16 }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "telestrator_relay=info,telestrator_config=info,telestrator_peer=info".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signaling_defaults_to_next_port() {
        let server = ServerConfig::default();
        assert_eq!(server.http_addr().port(), 8888);
        assert_eq!(server.signaling_addr().port(), 8889);
    }

    #[test]
    fn signaling_port_override() {
        let server = ServerConfig {
            signaling_port: Some(9000),
            ..ServerConfig::default()
        };
        assert_eq!(server.signaling_addr().port(), 9000);
    }

    #[test]
    fn bind_addresses_are_independent() {
        let server = ServerConfig {
            http_bind: "127.0.0.1".parse().unwrap(),
            ..ServerConfig::default()
        };
        assert!(server.http_addr().ip().is_loopback());
        assert!(server.signaling_addr().ip().is_unspecified());
    }

    #[test]
    fn replay_order_parses_case_insensitively() {
        assert_eq!("FIFO".parse::<ReplayOrder>().unwrap(), ReplayOrder::Fifo);
        assert_eq!("lifo".parse::<ReplayOrder>().unwrap(), ReplayOrder::Lifo);
        assert!("queue".parse::<ReplayOrder>().is_err());
    }

    #[test]
    fn replay_order_display_matches_serde() {
        let json = serde_json::to_string(&ReplayOrder::Fifo).unwrap();
        assert_eq!(json, format!("\"{}\"", ReplayOrder::Fifo));
    }
}
