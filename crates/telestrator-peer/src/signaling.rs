//! Send/receive channel to the relay.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use telestrator_common::NegotiationError;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

/// Text frames to and from the relay, as two channel halves.
pub struct SignalingChannel {
    outbound: mpsc::Sender<String>,
    inbound: mpsc::Receiver<String>,
}

impl SignalingChannel {
    pub fn new(outbound: mpsc::Sender<String>, inbound: mpsc::Receiver<String>) -> Self {
        Self { outbound, inbound }
    }

    /// Dial the relay's signaling socket and pump frames in background tasks.
    ///
    /// The inbound half ends when the socket closes.
    pub async fn connect(url: &str) -> Result<Self, NegotiationError> {
        let (ws_stream, _) = tokio::time::timeout(
            Duration::from_secs(15),
            tokio_tungstenite::connect_async(url),
        )
        .await
        .map_err(|_| NegotiationError::Signaling(format!("timed out connecting to {url}")))?
        .map_err(|e| NegotiationError::Signaling(format!("failed to connect to {url}: {e}")))?;
        info!(url, "Connected to relay");

        let (mut ws_write, mut ws_read) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(256);
        let (inbound_tx, inbound_rx) = mpsc::channel::<String>(256);

        tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if let Err(e) = ws_write.send(WsMessage::Text(text.into())).await {
                    warn!(error = %e, "Relay write failed");
                    break;
                }
            }
            let _ = ws_write.close().await;
        });

        tokio::spawn(async move {
            while let Some(frame) = ws_read.next().await {
                match frame {
                    Ok(WsMessage::Text(text)) => {
                        if inbound_tx.send(text.to_string()).await.is_err() {
                            break;
                        }
                    }
                    Ok(WsMessage::Close(_)) => {
                        info!("Relay closed connection");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "Relay read failed");
                        break;
                    }
                    _ => {}
                }
            }
            debug!("Relay reader finished");
        });

        Ok(Self::new(outbound_tx, inbound_rx))
    }

    pub async fn send(&self, text: String) -> Result<(), NegotiationError> {
        self.outbound
            .send(text)
            .await
            .map_err(|_| NegotiationError::ChannelClosed)
    }

    /// Next text frame from the relay, or `None` once the channel is closed.
    pub async fn recv(&mut self) -> Option<String> {
        self.inbound.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_and_recv_use_the_given_halves() {
        let (out_tx, mut out_rx) = mpsc::channel(4);
        let (in_tx, in_rx) = mpsc::channel(4);
        let mut channel = SignalingChannel::new(out_tx, in_rx);

        channel.send("request".into()).await.unwrap();
        assert_eq!(out_rx.recv().await.as_deref(), Some("request"));

        in_tx.send("hello".into()).await.unwrap();
        assert_eq!(channel.recv().await.as_deref(), Some("hello"));

        drop(in_tx);
        assert!(channel.recv().await.is_none());
    }

    #[tokio::test]
    async fn send_after_close_is_an_error() {
        let (out_tx, out_rx) = mpsc::channel(4);
        let (_in_tx, in_rx) = mpsc::channel(4);
        let channel = SignalingChannel::new(out_tx, in_rx);
        drop(out_rx);

        assert!(matches!(
            channel.send("x".into()).await,
            Err(NegotiationError::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn connect_to_nothing_fails() {
        let result = SignalingChannel::connect("ws://127.0.0.1:1").await;
        assert!(matches!(result, Err(NegotiationError::Signaling(_))));
    }
}
