//! Per-connection handler: register with the hub, then pump frames both ways.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use telestrator_common::Inbound;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info};

use crate::hub::HubHandle;

/// Handle a single signaling WebSocket until it closes.
pub async fn handle_connection(
    ws: WebSocketStream<TcpStream>,
    addr: SocketAddr,
    hub: HubHandle,
    outbound_buffer: usize,
) {
    let (mut sink, mut stream) = ws.split();

    let (tx, mut rx) = mpsc::channel::<String>(outbound_buffer);
    let conn = hub.register(tx).await;
    info!(peer = %addr, conn, "Signaling socket connected");

    loop {
        tokio::select! {
            // Relayed messages → this client's WebSocket
            Some(msg) = rx.recv() => {
                if sink.send(Message::Text(msg.into())).await.is_err() {
                    break;
                }
            }

            // This client's WebSocket → hub
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        hub.dispatch(conn, Inbound::decode(text.to_string())).await;
                    }
                    Some(Ok(Message::Binary(data))) => {
                        debug!(peer = %addr, len = data.len(), "Ignoring binary frame");
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(peer = %addr, error = %e, "WS error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    info!(peer = %addr, conn, "Signaling socket disconnected");
    hub.close(conn).await;
}
