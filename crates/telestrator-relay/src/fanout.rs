//! Snapshot fan-out to passive MJPEG viewers.
//!
//! Each viewer is a bounded queue of pre-encoded multipart parts feeding
//! one HTTP response body. A frame is decoded and encoded once, then the
//! same `Bytes` is offered to every viewer without waiting on any of them.

use bytes::{BufMut, Bytes, BytesMut};
use telestrator_common::{decode_data_uri, FrameError};
use telestrator_config::SnapshotConfig;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Part separator written before every frame.
pub const BOUNDARY: &str = "--myboundary";

/// Response content type of the viewer endpoint.
pub const MULTIPART_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=--myboundary";

/// Encode one multipart part: boundary, headers, then the image bytes.
pub fn encode_part(image: &[u8]) -> Bytes {
    let headers = format!(
        "{BOUNDARY}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        image.len()
    );
    let mut part = BytesMut::with_capacity(headers.len() + image.len());
    part.put_slice(headers.as_bytes());
    part.put_slice(image);
    part.freeze()
}

#[derive(Debug)]
pub enum FanoutCommand {
    AddListener(mpsc::Sender<Bytes>),
    PushFrame(String),
}

// ---------------------------------------------------------------------------
// Fan-out state
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct SnapshotFanout {
    listeners: Vec<mpsc::Sender<Bytes>>,
}

impl SnapshotFanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, listener: mpsc::Sender<Bytes>) {
        self.listeners.push(listener);
        debug!(viewers = self.listeners.len(), "Snapshot viewer added");
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Decode `payload` and offer it to every live viewer.
    ///
    /// Returns how many viewers accepted the part. Viewers whose response
    /// has gone away are dropped from the list.
    pub fn push_frame(&mut self, payload: &str) -> Result<usize, FrameError> {
        self.listeners.retain(|listener| !listener.is_closed());
        if self.listeners.is_empty() {
            return Ok(0);
        }

        let part = encode_part(&decode_data_uri(payload)?);
        let mut delivered = 0;
        self.listeners.retain(|listener| match listener.try_send(part.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                debug!("Snapshot viewer lagging, frame skipped");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });
        Ok(delivered)
    }

    pub fn handle(&mut self, command: FanoutCommand) {
        match command {
            FanoutCommand::AddListener(listener) => self.add_listener(listener),
            FanoutCommand::PushFrame(payload) => {
                if let Err(e) = self.push_frame(&payload) {
                    warn!(error = %e, len = payload.len(), "Dropping malformed frame");
                }
            }
        }
    }

    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<FanoutCommand>) {
        while let Some(command) = commands.recv().await {
            self.handle(command);
        }
        debug!("Fan-out command channel closed");
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct FanoutHandle {
    commands: mpsc::UnboundedSender<FanoutCommand>,
    listener_buffer: usize,
}

impl FanoutHandle {
    /// Spawn the fan-out task and return a handle to it.
    pub fn spawn(config: &SnapshotConfig) -> Self {
        let (handle, rx) = Self::detached(config.listener_buffer);
        tokio::spawn(SnapshotFanout::new().run(rx));
        handle
    }

    /// A handle whose commands are delivered to the returned receiver.
    pub fn detached(listener_buffer: usize) -> (Self, mpsc::UnboundedReceiver<FanoutCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            commands: tx,
            listener_buffer: listener_buffer.max(1),
        };
        (handle, rx)
    }

    /// Register a new viewer and return the stream of parts it will receive.
    pub fn subscribe(&self) -> mpsc::Receiver<Bytes> {
        let (tx, rx) = mpsc::channel(self.listener_buffer);
        self.send(FanoutCommand::AddListener(tx));
        rx
    }

    pub fn push_frame(&self, payload: String) {
        self.send(FanoutCommand::PushFrame(payload));
    }

    fn send(&self, command: FanoutCommand) {
        if self.commands.send(command).is_err() {
            warn!("Fan-out task has stopped");
        }
    }
}
