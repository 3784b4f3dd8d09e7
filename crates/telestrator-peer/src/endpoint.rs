//! Negotiation state machine for one host or joiner.
//!
//! The host captures media, offers, and waits for an answer. The joiner
//! asks the relay to replay anything cached, then answers the first offer
//! it sees. Both trickle candidates as they are discovered and apply remote
//! candidates in receipt order. Because the relay broadcasts to every
//! socket, every envelope carrying our own id is dropped on arrival.

use std::fmt;

use serde::Serialize;
use telestrator_common::protocol::log_line;
use telestrator_common::{Action, EndpointId, NegotiationError, SignalingMessage, REPLAY_REQUEST};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::session::{IceCandidate, PeerEvent, PeerSession, RemoteTrack, SessionDescription};
use crate::signaling::SignalingChannel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Joiner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Idle,
    AwaitingLocalMedia,
    Offering,
    AwaitingOffer,
    Negotiating,
    Connected,
    Closed,
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::AwaitingLocalMedia => "awaiting-local-media",
            Self::Offering => "offering",
            Self::AwaitingOffer => "awaiting-offer",
            Self::Negotiating => "negotiating",
            Self::Connected => "connected",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Progress reported to whoever drives the UI.
#[derive(Debug, Clone)]
pub enum NegotiationEvent {
    StateChanged(NegotiationState),
    Connected(RemoteTrack),
    Failed(String),
    Closed,
}

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// Queued `NegotiationEvent`s before further events are dropped.
pub const EVENT_BUFFER: usize = 64;

pub struct NegotiationEndpoint<S: PeerSession> {
    id: EndpointId,
    role: Role,
    state: NegotiationState,
    session: S,
    peer_events: mpsc::Receiver<PeerEvent>,
    signaling: SignalingChannel,
    events: mpsc::Sender<NegotiationEvent>,
    /// Send `log:` diagnostics to the relay.
    diagnostics: bool,
    remote_applied: bool,
    /// Remote candidates received before the remote description, in order.
    pending_candidates: Vec<IceCandidate>,
}

impl<S: PeerSession> NegotiationEndpoint<S> {
    pub fn new(
        role: Role,
        session: S,
        peer_events: mpsc::Receiver<PeerEvent>,
        signaling: SignalingChannel,
    ) -> (Self, mpsc::Receiver<NegotiationEvent>) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let endpoint = Self {
            id: EndpointId::new(),
            role,
            state: NegotiationState::Idle,
            session,
            peer_events,
            signaling,
            events: events_tx,
            diagnostics: true,
            remote_applied: false,
            pending_candidates: Vec::new(),
        };
        (endpoint, events_rx)
    }

    pub fn with_id(mut self, id: EndpointId) -> Self {
        self.id = id;
        self
    }

    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }

    pub fn id(&self) -> &EndpointId {
        &self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    /// Run the negotiation until the relay connection or the session ends.
    ///
    /// Any failure ends the run; nothing is retried.
    pub async fn run(mut self) -> Result<(), NegotiationError> {
        let result = self.drive().await;
        if let Err(e) = &result {
            warn!(id = %self.id, role = ?self.role, error = %e, "Negotiation failed");
            self.emit(NegotiationEvent::Failed(e.to_string()));
        }
        self.set_state(NegotiationState::Closed);
        self.emit(NegotiationEvent::Closed);
        result
    }

    async fn drive(&mut self) -> Result<(), NegotiationError> {
        self.start().await?;

        loop {
            tokio::select! {
                text = self.signaling.recv() => match text {
                    Some(text) => self.on_signal(&text).await?,
                    None => {
                        info!(id = %self.id, "Signaling channel closed");
                        return Ok(());
                    }
                },
                event = self.peer_events.recv() => match event {
                    Some(event) => self.on_peer_event(event).await?,
                    None => {
                        debug!(id = %self.id, "Peer session ended");
                        return Ok(());
                    }
                },
            }
        }
    }

    async fn start(&mut self) -> Result<(), NegotiationError> {
        match self.role {
            Role::Host => {
                self.set_state(NegotiationState::AwaitingLocalMedia);
                self.session.acquire_local_media().await?;

                let offer = self.session.create_offer().await?;
                self.session.set_local_description(offer.clone()).await?;
                self.send(Action::Offer, &offer).await?;
                self.set_state(NegotiationState::Offering);
            }
            Role::Joiner => {
                // Drain whatever the host sent before we connected.
                self.signaling.send(REPLAY_REQUEST.to_string()).await?;
                self.set_state(NegotiationState::AwaitingOffer);
            }
        }
        Ok(())
    }

    async fn on_signal(&mut self, text: &str) -> Result<(), NegotiationError> {
        let msg = match SignalingMessage::from_text(text) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(id = %self.id, error = %e, "Dropping unparseable signal");
                return Ok(());
            }
        };
        if msg.id == self.id {
            return Ok(());
        }

        match (msg.action, self.role) {
            (Action::Offer, Role::Joiner) => self.on_offer(&msg).await,
            (Action::Answer, Role::Host) => self.on_answer(&msg).await,
            (Action::Candidate, _) => self.on_remote_candidate(&msg).await,
            (action, role) => {
                debug!(id = %self.id, from = %msg.id, ?action, ?role, "Ignoring signal");
                Ok(())
            }
        }
    }

    async fn on_offer(&mut self, msg: &SignalingMessage) -> Result<(), NegotiationError> {
        if self.state != NegotiationState::AwaitingOffer {
            debug!(id = %self.id, from = %msg.id, state = %self.state, "Ignoring extra offer");
            return Ok(());
        }
        let Some(offer) = parse_description(msg) else {
            return Ok(());
        };
        self.diagnostic("onOffer").await;

        self.apply_remote_description(offer).await?;
        let answer = self.session.create_answer().await?;
        self.session.set_local_description(answer.clone()).await?;
        self.send(Action::Answer, &answer).await?;
        self.set_state(NegotiationState::Negotiating);
        Ok(())
    }

    async fn on_answer(&mut self, msg: &SignalingMessage) -> Result<(), NegotiationError> {
        if self.state != NegotiationState::Offering {
            debug!(id = %self.id, from = %msg.id, state = %self.state, "Ignoring extra answer");
            return Ok(());
        }
        let Some(answer) = parse_description(msg) else {
            return Ok(());
        };
        self.diagnostic("onAnswer").await;

        self.apply_remote_description(answer).await?;
        self.set_state(NegotiationState::Negotiating);
        Ok(())
    }

    async fn on_remote_candidate(&mut self, msg: &SignalingMessage) -> Result<(), NegotiationError> {
        let candidate: IceCandidate = match serde_json::from_value(msg.data.clone()) {
            Ok(candidate) => candidate,
            Err(e) => {
                warn!(id = %self.id, from = %msg.id, error = %e, "Dropping malformed candidate");
                return Ok(());
            }
        };

        if self.remote_applied {
            self.apply_candidate(candidate).await;
        } else {
            debug!(id = %self.id, "Holding candidate until remote description");
            self.pending_candidates.push(candidate);
        }
        Ok(())
    }

    async fn apply_remote_description(
        &mut self,
        description: SessionDescription,
    ) -> Result<(), NegotiationError> {
        self.session.set_remote_description(description).await?;
        self.remote_applied = true;

        for candidate in std::mem::take(&mut self.pending_candidates) {
            self.apply_candidate(candidate).await;
        }
        Ok(())
    }

    async fn apply_candidate(&mut self, candidate: IceCandidate) {
        self.diagnostic("onIceCandidate").await;
        // One unusable path is not fatal; the others may still connect.
        if let Err(e) = self.session.add_ice_candidate(candidate).await {
            warn!(id = %self.id, error = %e, "Candidate not applied");
        }
    }

    async fn on_peer_event(&mut self, event: PeerEvent) -> Result<(), NegotiationError> {
        match event {
            PeerEvent::LocalCandidate(candidate) => self.send(Action::Candidate, &candidate).await,
            PeerEvent::Track(track) => {
                if self.state == NegotiationState::Connected {
                    debug!(id = %self.id, track = %track.id, "Additional remote track");
                    return Ok(());
                }
                self.diagnostic("track!").await;
                info!(id = %self.id, track = %track.id, kind = %track.kind, "Remote media connected");
                self.set_state(NegotiationState::Connected);
                self.emit(NegotiationEvent::Connected(track));
                Ok(())
            }
            PeerEvent::Failed(reason) => Err(NegotiationError::PeerConnection(reason)),
        }
    }

    async fn send<T: Serialize>(&self, action: Action, data: &T) -> Result<(), NegotiationError> {
        let data = serde_json::to_value(data)
            .map_err(|e| NegotiationError::Signaling(format!("failed to encode {action:?}: {e}")))?;
        let text = SignalingMessage::new(self.id.clone(), action, data)
            .to_text()
            .map_err(|e| NegotiationError::Signaling(format!("failed to encode {action:?}: {e}")))?;
        self.signaling.send(text).await
    }

    async fn diagnostic(&self, text: &str) {
        if self.diagnostics {
            let _ = self.signaling.send(log_line(&self.id, text)).await;
        }
    }

    fn set_state(&mut self, state: NegotiationState) {
        if self.state == state {
            return;
        }
        debug!(id = %self.id, from = %self.state, to = %state, "State change");
        self.state = state;
        self.emit(NegotiationEvent::StateChanged(state));
    }

    /// Report progress without waiting on the receiver. A full queue drops
    /// the event; a dropped receiver is ignored.
    fn emit(&self, event: NegotiationEvent) {
        match self.events.try_send(event) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(event)) => {
                warn!(id = %self.id, ?event, "Event queue full, dropping event");
            }
        }
    }
}

fn parse_description(msg: &SignalingMessage) -> Option<SessionDescription> {
    match serde_json::from_value(msg.data.clone()) {
        Ok(description) => Some(description),
        Err(e) => {
            warn!(from = %msg.id, action = ?msg.action, error = %e, "Dropping malformed description");
            None
        }
    }
}
