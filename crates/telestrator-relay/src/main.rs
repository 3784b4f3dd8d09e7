//! telestrator-relay: signaling relay and MJPEG snapshot server.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use telestrator_common::TelestratorError;
use telestrator_config::{ReplayOrder, TelestratorConfig};
use telestrator_relay::logging::LogFilter;
use telestrator_relay::viewer::SNAPSHOT_PATH;
use telestrator_relay::RelayServer;

#[derive(Parser, Debug)]
#[command(
    name = "telestrator-relay",
    version,
    about = "A remote telestrator relay for WebRTC window sharing"
)]
struct Args {
    /// HTTP port; signaling listens on the next port unless --signaling-port is set.
    #[arg(short, long)]
    port: Option<u16>,

    /// Address the HTTP viewer listener binds to.
    #[arg(long)]
    http_bind: Option<IpAddr>,

    /// Address the signaling listener binds to.
    #[arg(long)]
    signaling_bind: Option<IpAddr>,

    /// Explicit signaling port.
    #[arg(long)]
    signaling_port: Option<u16>,

    /// Directory of static files served next to the viewer endpoint.
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Cache replay order: lifo or fifo.
    #[arg(long)]
    replay_order: Option<ReplayOrder>,

    /// Config file path.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    fn apply(&self, config: &mut TelestratorConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(bind) = self.http_bind {
            config.server.http_bind = bind;
        }
        if let Some(bind) = self.signaling_bind {
            config.server.signaling_bind = bind;
        }
        if self.signaling_port.is_some() {
            config.server.signaling_port = self.signaling_port;
        }
        if self.static_dir.is_some() {
            config.server.static_dir = self.static_dir.clone();
        }
        if let Some(order) = self.replay_order {
            config.relay.replay_order = order;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), TelestratorError> {
    let log_filter = LogFilter::install();
    let args = Args::parse();

    let mut config = telestrator_config::load(args.config.as_deref())?;
    args.apply(&mut config);
    telestrator_config::validate(&config)?;
    log_filter.apply(&config.logging.filter)?;

    let server = RelayServer::bind(&config).await?;
    let http = server.http_addr()?;
    let signaling = server.signaling_addr()?;

    tracing::info!("telestrator-relay v{} ready", env!("CARGO_PKG_VERSION"));
    tracing::info!("HTTP server is running on {http}");
    tracing::info!("WebSocket server is running on {signaling}");
    tracing::info!(
        "Add a browser source to http://localhost:{}{SNAPSHOT_PATH}",
        http.port()
    );
    tracing::info!(replay_order = %config.relay.replay_order, "Relay cache configured");

    server.run().await
}
