//! Listener setup: the HTTP viewer server and the signaling accept loop.

use std::net::SocketAddr;
use std::path::PathBuf;

use telestrator_common::TelestratorError;
use telestrator_config::TelestratorConfig;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tracing::{error, info, warn};

use crate::connection::handle_connection;
use crate::fanout::FanoutHandle;
use crate::hub::HubHandle;
use crate::viewer;

/// Both listeners bound, with the hub and fan-out tasks already running.
pub struct RelayServer {
    http: TcpListener,
    signaling: TcpListener,
    hub: HubHandle,
    fanout: FanoutHandle,
    static_dir: Option<PathBuf>,
    outbound_buffer: usize,
}

impl RelayServer {
    pub async fn bind(config: &TelestratorConfig) -> Result<Self, TelestratorError> {
        let http = bind_listener(config.server.http_addr(), "http").await?;
        let signaling = bind_listener(config.server.signaling_addr(), "signaling").await?;

        let fanout = FanoutHandle::spawn(&config.snapshot);
        let hub = HubHandle::spawn(&config.relay, fanout.clone());

        Ok(Self {
            http,
            signaling,
            hub,
            fanout,
            static_dir: config.server.static_dir.clone(),
            outbound_buffer: config.relay.outbound_buffer,
        })
    }

    pub fn http_addr(&self) -> std::io::Result<SocketAddr> {
        self.http.local_addr()
    }

    pub fn signaling_addr(&self) -> std::io::Result<SocketAddr> {
        self.signaling.local_addr()
    }

    /// Serve until the process is terminated.
    pub async fn run(self) -> Result<(), TelestratorError> {
        let router = viewer::router(self.fanout.clone(), self.static_dir.as_deref());
        let http = self.http;
        tokio::spawn(async move {
            if let Err(e) = axum::serve(http, router).await {
                error!(error = %e, "HTTP server stopped");
            }
        });

        loop {
            match self.signaling.accept().await {
                Ok((stream, addr)) => {
                    let hub = self.hub.clone();
                    let outbound_buffer = self.outbound_buffer;
                    tokio::spawn(async move {
                        match accept_async(stream).await {
                            Ok(ws) => handle_connection(ws, addr, hub, outbound_buffer).await,
                            Err(e) => {
                                warn!(peer = %addr, error = %e, "WS handshake failed");
                            }
                        }
                    });
                }
                Err(e) => {
                    warn!(error = %e, "TCP accept error");
                }
            }
        }
    }
}

async fn bind_listener(addr: SocketAddr, name: &str) -> Result<TcpListener, TelestratorError> {
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        TelestratorError::Network(format!("failed to bind {name} listener on {addr}: {e}"))
    })?;
    info!("{name} listener bound to {}", listener.local_addr()?);
    Ok(listener)
}
