//! Relay hub: the registry of signaling sockets and the envelope cache.
//!
//! A single task owns `RelayHub` and applies `HubCommand`s one at a time,
//! so registry and cache mutation never race. Connection tasks talk to it
//! through a cloneable `HubHandle`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use telestrator_common::{Inbound, BLANK_FRAME};
use telestrator_config::{RelayConfig, ReplayOrder};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::fanout::FanoutHandle;

/// Relay-assigned id of one signaling socket.
pub type ConnId = u64;

/// Work items for the hub task, applied in arrival order.
#[derive(Debug)]
pub enum HubCommand {
    Register {
        conn: ConnId,
        outbound: mpsc::Sender<String>,
    },
    Message {
        conn: ConnId,
        inbound: Inbound,
    },
    Close {
        conn: ConnId,
    },
}

// ---------------------------------------------------------------------------
// Hub state
// ---------------------------------------------------------------------------

pub struct RelayHub {
    /// Registered sockets in arrival order.
    registry: Vec<(ConnId, mpsc::Sender<String>)>,
    /// Envelopes received while fewer than two sockets were registered.
    cache: Vec<String>,
    replay_order: ReplayOrder,
    fanout: FanoutHandle,
}

impl RelayHub {
    pub fn new(replay_order: ReplayOrder, fanout: FanoutHandle) -> Self {
        Self {
            registry: Vec::new(),
            cache: Vec::new(),
            replay_order,
            fanout,
        }
    }

    pub fn registry_len(&self) -> usize {
        self.registry.len()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn handle(&mut self, command: HubCommand) {
        match command {
            HubCommand::Register { conn, outbound } => self.register(conn, outbound),
            HubCommand::Message { conn, inbound } => self.on_message(conn, inbound),
            HubCommand::Close { conn } => self.on_close(conn),
        }
    }

    pub fn register(&mut self, conn: ConnId, outbound: mpsc::Sender<String>) {
        if self.registry.iter().any(|(id, _)| *id == conn) {
            warn!(conn, "Socket already registered");
            return;
        }
        self.registry.push((conn, outbound));
        debug!(conn, sockets = self.registry.len(), "Socket registered");
    }

    pub fn on_message(&mut self, conn: ConnId, inbound: Inbound) {
        match inbound {
            Inbound::Frame(payload) => self.fanout.push_frame(payload),
            Inbound::Log(text) => {
                info!(target: "telestrator_relay::diagnostic", conn, "{text}");
            }
            Inbound::Replay => self.replay(conn),
            Inbound::Envelope(text) => {
                if self.registry.len() < 2 {
                    debug!(conn, cached = self.cache.len() + 1, "No peer yet, caching envelope");
                    self.cache.push(text);
                } else {
                    debug!(conn, "{text}");
                    self.broadcast(&text);
                }
            }
        }
    }

    pub fn on_close(&mut self, conn: ConnId) {
        let Some(index) = self.registry.iter().position(|(id, _)| *id == conn) else {
            debug!(conn, "Close for unknown socket");
            return;
        };
        self.registry.remove(index);
        debug!(conn, sockets = self.registry.len(), "Socket removed");

        // Viewers keep showing the last buffered frame unless two blanks follow.
        self.fanout.push_frame(BLANK_FRAME.to_string());
        self.fanout.push_frame(BLANK_FRAME.to_string());
    }

    fn replay(&mut self, conn: ConnId) {
        if self.cache.is_empty() {
            debug!(conn, "Replay requested with empty cache");
            return;
        }

        let mut pending = std::mem::take(&mut self.cache);
        if self.replay_order == ReplayOrder::Lifo {
            pending.reverse();
        }
        debug!(conn, count = pending.len(), order = %self.replay_order, "Replaying cache");
        for text in &pending {
            self.broadcast(text);
        }
    }

    fn broadcast(&self, text: &str) {
        for (conn, outbound) in &self.registry {
            match outbound.try_send(text.to_string()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(conn, "Outbound queue full, dropping message");
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(conn, "Outbound queue closed");
                }
            }
        }
    }

    /// Apply commands until every `HubHandle` is dropped.
    pub async fn run(mut self, mut commands: mpsc::Receiver<HubCommand>) {
        while let Some(command) = commands.recv().await {
            self.handle(command);
        }
        debug!("Hub command channel closed");
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<HubCommand>,
    next_conn: Arc<AtomicU64>,
}

impl HubHandle {
    /// Spawn the hub task and return a handle to it.
    pub fn spawn(config: &RelayConfig, fanout: FanoutHandle) -> Self {
        let (tx, rx) = mpsc::channel(1024);
        let hub = RelayHub::new(config.replay_order, fanout);
        tokio::spawn(hub.run(rx));
        Self {
            commands: tx,
            next_conn: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Register a socket's outbound queue and return its id.
    pub async fn register(&self, outbound: mpsc::Sender<String>) -> ConnId {
        let conn = self.next_conn.fetch_add(1, Ordering::Relaxed);
        self.send(HubCommand::Register { conn, outbound }).await;
        conn
    }

    pub async fn dispatch(&self, conn: ConnId, inbound: Inbound) {
        self.send(HubCommand::Message { conn, inbound }).await;
    }

    pub async fn close(&self, conn: ConnId) {
        self.send(HubCommand::Close { conn }).await;
    }

    async fn send(&self, command: HubCommand) {
        if self.commands.send(command).await.is_err() {
            warn!("Hub task has stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fanout::FanoutCommand;

    fn hub(order: ReplayOrder) -> (RelayHub, mpsc::UnboundedReceiver<FanoutCommand>) {
        let (fanout, fanout_rx) = FanoutHandle::detached(4);
        (RelayHub::new(order, fanout), fanout_rx)
    }

    fn socket(hub: &mut RelayHub, conn: ConnId) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(16);
        hub.register(conn, tx);
        rx
    }

    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn envelope(text: &str) -> Inbound {
        Inbound::Envelope(text.to_string())
    }

    #[test]
    fn registry_tracks_registers_minus_closes() {
        let (mut hub, _fanout) = hub(ReplayOrder::Lifo);
        let _a = socket(&mut hub, 1);
        let _b = socket(&mut hub, 2);
        assert_eq!(hub.registry_len(), 2);

        hub.on_close(1);
        assert_eq!(hub.registry_len(), 1);

        let _c = socket(&mut hub, 3);
        hub.on_close(2);
        hub.on_close(3);
        assert_eq!(hub.registry_len(), 0);
    }

    #[test]
    fn duplicate_register_and_close_are_ignored() {
        let (mut hub, mut fanout) = hub(ReplayOrder::Lifo);
        let _a = socket(&mut hub, 1);
        let _again = socket(&mut hub, 1);
        assert_eq!(hub.registry_len(), 1);

        hub.on_close(1);
        hub.on_close(1);
        hub.on_close(42);
        assert_eq!(hub.registry_len(), 0);

        // Only the one real close produced blank frames.
        let mut pushes = 0;
        while fanout.try_recv().is_ok() {
            pushes += 1;
        }
        assert_eq!(pushes, 2);
    }

    #[test]
    fn envelopes_are_cached_while_alone() {
        let (mut hub, _fanout) = hub(ReplayOrder::Lifo);
        let mut host = socket(&mut hub, 1);

        hub.on_message(1, envelope(r#"{"action":"offer"}"#));
        hub.on_message(1, envelope(r#"{"action":"candidate"}"#));

        assert_eq!(hub.cache_len(), 2);
        assert!(drain(&mut host).is_empty());
    }

    #[test]
    fn envelopes_are_broadcast_to_everyone_once_paired() {
        let (mut hub, _fanout) = hub(ReplayOrder::Lifo);
        let mut host = socket(&mut hub, 1);
        let mut joiner = socket(&mut hub, 2);

        let text = r#"{"id":"h","action":"candidate","data":{"x":1}}"#;
        hub.on_message(1, envelope(text));

        assert_eq!(hub.cache_len(), 0);
        assert_eq!(drain(&mut host), vec![text.to_string()]);
        assert_eq!(drain(&mut joiner), vec![text.to_string()]);
    }

    #[test]
    fn replay_is_lifo_by_default() {
        let (mut hub, _fanout) = hub(ReplayOrder::Lifo);
        let mut host = socket(&mut hub, 1);
        for text in ["A", "B", "C"] {
            hub.on_message(1, envelope(text));
        }
        let mut joiner = socket(&mut hub, 2);

        hub.on_message(2, Inbound::Replay);

        assert_eq!(hub.cache_len(), 0);
        assert_eq!(drain(&mut joiner), vec!["C", "B", "A"]);
        assert_eq!(drain(&mut host), vec!["C", "B", "A"]);
    }

    #[test]
    fn replay_can_be_fifo() {
        let (mut hub, _fanout) = hub(ReplayOrder::Fifo);
        let _host = socket(&mut hub, 1);
        for text in ["A", "B", "C"] {
            hub.on_message(1, envelope(text));
        }
        let mut joiner = socket(&mut hub, 2);

        hub.on_message(2, Inbound::Replay);
        assert_eq!(drain(&mut joiner), vec!["A", "B", "C"]);
    }

    #[test]
    fn replay_with_empty_cache_sends_nothing() {
        let (mut hub, _fanout) = hub(ReplayOrder::Lifo);
        let mut host = socket(&mut hub, 1);
        let mut joiner = socket(&mut hub, 2);

        hub.on_message(2, Inbound::Replay);
        assert!(drain(&mut host).is_empty());
        assert!(drain(&mut joiner).is_empty());
    }

    #[test]
    fn frames_and_logs_are_never_relayed() {
        let (mut hub, mut fanout) = hub(ReplayOrder::Lifo);
        let mut host = socket(&mut hub, 1);
        let mut joiner = socket(&mut hub, 2);

        hub.on_message(1, Inbound::Frame("data:image/png;base64,aGk=".into()));
        hub.on_message(1, Inbound::Log("log: hello".into()));

        assert!(drain(&mut host).is_empty());
        assert!(drain(&mut joiner).is_empty());
        assert_eq!(hub.cache_len(), 0);
        assert!(matches!(
            fanout.try_recv(),
            Ok(FanoutCommand::PushFrame(payload)) if payload == "data:image/png;base64,aGk="
        ));
        assert!(fanout.try_recv().is_err());
    }

    #[test]
    fn close_pushes_two_blank_frames() {
        let (mut hub, mut fanout) = hub(ReplayOrder::Lifo);
        let _host = socket(&mut hub, 1);
        hub.on_close(1);

        for _ in 0..2 {
            assert!(matches!(
                fanout.try_recv(),
                Ok(FanoutCommand::PushFrame(payload)) if payload == BLANK_FRAME
            ));
        }
        assert!(fanout.try_recv().is_err());
    }

    #[test]
    fn full_recipient_does_not_block_others() {
        let (mut hub, _fanout) = hub(ReplayOrder::Lifo);
        let (slow_tx, mut slow_rx) = mpsc::channel(1);
        hub.register(1, slow_tx);
        let mut fast = socket(&mut hub, 2);

        hub.on_message(2, envelope("first"));
        hub.on_message(2, envelope("second"));

        assert_eq!(drain(&mut slow_rx), vec!["first"]);
        assert_eq!(drain(&mut fast), vec!["first", "second"]);
    }

    #[test]
    fn closed_recipient_is_skipped() {
        let (mut hub, _fanout) = hub(ReplayOrder::Lifo);
        let gone = socket(&mut hub, 1);
        let mut live = socket(&mut hub, 2);
        drop(gone);

        hub.on_message(2, envelope("still delivered"));
        assert_eq!(drain(&mut live), vec!["still delivered"]);
    }

    #[tokio::test]
    async fn handle_preserves_message_order_before_close() {
        let (fanout, _fanout_rx) = FanoutHandle::detached(4);
        let handle = HubHandle::spawn(&RelayConfig::default(), fanout);

        let (host_tx, mut host_rx) = mpsc::channel(16);
        let (joiner_tx, _joiner_rx) = mpsc::channel(16);
        let host = handle.register(host_tx).await;
        let joiner = handle.register(joiner_tx).await;
        assert_ne!(host, joiner);

        handle.dispatch(joiner, envelope("1")).await;
        handle.dispatch(joiner, envelope("2")).await;
        handle.close(joiner).await;

        assert_eq!(host_rx.recv().await.as_deref(), Some("1"));
        assert_eq!(host_rx.recv().await.as_deref(), Some("2"));
    }
}
