//! The negotiation state handler.
//!
//! Drives exactly one peer connection per joined room through the
//! offer/answer/ICE exchange. All inbound signaling is funneled into
//! [`SessionEvent`] and processed sequentially by one task, so no two
//! operations ever run concurrently; interleaving only happens at await
//! points, which is why connection-scoped work re-checks the current
//! [`ConnectionId`] after every suspension.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::NegotiationError;
use crate::logger::log;
use crate::media::{MediaHandle, MediaProvider};
use crate::peer::connection::{PeerBackend, PeerFactory};
use crate::peer::ice::PendingCandidateQueue;
use crate::peer::state::{ConnectionId, ConnectionState, NegotiationState};
use crate::peer::types::{IceCandidate, SessionDescription};
use crate::session::{Role, Session};
use crate::signaling::{ClientMessage, SignalingTransport};

/// Consecutive automatic ICE restarts an initiator will attempt before
/// giving up. The counter resets once a connection is established.
pub const MAX_RESTART_ATTEMPTS: u32 = 5;

/// Everything the session loop reacts to, in arrival order.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Joined {
        initiator: bool,
        count: u32,
    },
    PeerJoined {
        count: u32,
    },
    PeerLeft {
        count: u32,
    },
    RemoteOffer {
        sdp: SessionDescription,
    },
    RemoteAnswer {
        sdp: SessionDescription,
    },
    RemoteCandidate {
        candidate: IceCandidate,
    },
    /// A candidate gathered locally by the given connection.
    LocalCandidate {
        connection: ConnectionId,
        candidate: IceCandidate,
    },
    /// Backend-reported state change for the given connection.
    ConnectionStateChanged {
        connection: ConnectionId,
        state: ConnectionState,
    },
    /// Caption text relayed from the peer's sign recognition.
    CaptionReceived {
        sentence: Option<String>,
    },
    Teardown,
}

/// Owns the session, the single live connection and the pending-candidate
/// queue. Nothing outside this type mutates them.
pub struct NegotiationHandler {
    session: Session,
    transport: Arc<dyn SignalingTransport>,
    factory: Arc<dyn PeerFactory>,
    media_provider: Arc<dyn MediaProvider>,
    media: Option<MediaHandle>,
    connection: Option<Arc<dyn PeerBackend>>,
    current: ConnectionId,
    pending: PendingCandidateQueue,
    state: NegotiationState,
    remote_description_set: bool,
    restart_attempts: u32,
    torn_down: bool,
}

impl NegotiationHandler {
    pub fn new(
        room: impl Into<String>,
        transport: Arc<dyn SignalingTransport>,
        factory: Arc<dyn PeerFactory>,
        media_provider: Arc<dyn MediaProvider>,
    ) -> Self {
        Self {
            session: Session::new(room),
            transport,
            factory,
            media_provider,
            media: None,
            connection: None,
            current: ConnectionId(0),
            pending: PendingCandidateQueue::new(),
            state: NegotiationState::Idle,
            remote_description_set: false,
            restart_attempts: 0,
            torn_down: false,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.current
    }

    pub fn pending_candidates(&self) -> usize {
        self.pending.len()
    }

    /// Announces the join to the signaling server. The role assignment comes
    /// back in the join acknowledgment ([`SessionEvent::Joined`]).
    pub fn join(&self) {
        self.transport.send(ClientMessage::Join {
            room: self.session.room().to_string(),
        });
    }

    /// Relays locally recognized caption text to the peer.
    pub fn send_caption(&self, sentence: String) {
        self.transport.send(ClientMessage::SignText {
            sentence,
            room: self.session.room().to_string(),
        });
    }

    /// Processes events until the channel closes or a teardown arrives.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<SessionEvent>) {
        while let Some(event) = events.recv().await {
            if !self.handle(event).await {
                break;
            }
        }
        if !self.torn_down {
            self.teardown();
        }
    }

    /// Dispatches one event. Returns `false` once the session is over.
    pub async fn handle(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Joined { initiator, count } => self.on_joined(initiator, count).await,
            SessionEvent::PeerJoined { count } => self.on_peer_joined(count).await,
            SessionEvent::PeerLeft { count } => self.on_peer_left(count),
            SessionEvent::RemoteOffer { sdp } => self.on_remote_offer(sdp).await,
            SessionEvent::RemoteAnswer { sdp } => self.on_remote_answer(sdp).await,
            SessionEvent::RemoteCandidate { candidate } => {
                self.on_remote_candidate(candidate).await
            }
            SessionEvent::LocalCandidate {
                connection,
                candidate,
            } => self.on_local_candidate(connection, candidate),
            SessionEvent::ConnectionStateChanged { connection, state } => {
                self.on_connection_state_changed(connection, state).await
            }
            SessionEvent::CaptionReceived { sentence } => self.on_caption(sentence),
            SessionEvent::Teardown => {
                self.teardown();
                return false;
            }
        }
        true
    }

    /// Join acknowledgment: assigns the role, brings up local media and the
    /// first connection. An initiator finding a peer already present offers
    /// right away.
    pub async fn on_joined(&mut self, initiator: bool, count: u32) {
        if self.torn_down {
            return;
        }
        self.session.assign_role(if initiator {
            Role::Initiator
        } else {
            Role::Responder
        });
        self.session.set_peer_count(count);
        self.state = NegotiationState::AwaitingLocalMedia;
        log(&format!(
            "Joined room {} as {:?} ({} users)",
            self.session.room(),
            self.session.role(),
            count
        ));

        match self.media_provider.acquire().await {
            Ok(handle) => self.media = Some(handle),
            Err(e) => {
                // Without capture this side cannot start a call; a remote
                // offer can still arrive and be answered receive-only.
                log(&format!("Local media unavailable: {e}"));
                return;
            }
        }

        if let Err(e) = self.recreate_connection().await {
            log(&format!("Connection setup failed: {e}"));
            return;
        }

        if self.session.is_initiator() {
            if count >= 2 {
                log("Creating offer as initiator with existing users");
                self.send_offer().await;
            }
        } else {
            self.state = NegotiationState::AwaitingOffer;
        }
    }

    /// Another user entered the room. Covers the initiator who joined before
    /// any peer existed, and a peer rejoining after the previous one left.
    pub async fn on_peer_joined(&mut self, count: u32) {
        if self.torn_down {
            return;
        }
        let previous = self.session.peer_count();
        self.session.set_peer_count(count);
        log(&format!("A user joined the room. Total users: {count}"));
        // The join ack and this event can both observe the same count
        // transition; only the crossing from below 2 offers, so a completed
        // round still gets a fresh offer when a peer rejoins.
        if self.session.is_initiator() && self.connection.is_some() && count >= 2 && previous < 2
        {
            self.send_offer().await;
        }
    }

    /// A user left. Below two participants there is no call to render, but
    /// the connection is kept: the peer may rejoin.
    pub fn on_peer_left(&mut self, count: u32) {
        if self.torn_down {
            return;
        }
        self.session.set_peer_count(count);
        log(&format!("A user left the room. Remaining users: {count}"));
        if count < 2 {
            self.media_provider.clear_remote();
            self.session.clear_caption();
            // The round is over. A rejoining peer negotiates afresh, so the
            // departed peer's remote state and stray candidates must not
            // leak into the next exchange.
            self.remote_description_set = false;
            self.pending.clear();
        }
    }

    /// Remote offer: set it, flush the candidate queue, answer. Creates a
    /// fresh connection when none exists or the current one already failed.
    pub async fn on_remote_offer(&mut self, sdp: SessionDescription) {
        if self.torn_down {
            return;
        }
        log("Received offer");
        if self.connection.is_none() || self.state == NegotiationState::Failed {
            if let Err(e) = self.recreate_connection().await {
                log(&format!("Connection setup failed: {e}"));
                return;
            }
        }
        let Some(conn) = self.connection.clone() else {
            return;
        };
        let id = self.current;

        if let Err(e) = conn.set_remote_description(sdp).await {
            // Stalled until a fresh offer or restart arrives.
            log(&format!("Failed to process offer: {e}"));
            return;
        }
        if self.current != id {
            return;
        }
        self.remote_description_set = true;

        self.drain_pending(&conn).await;
        if self.current != id {
            return;
        }

        let answer = match conn.create_answer().await {
            Ok(desc) => desc,
            Err(e) => {
                log(&format!("Failed to create answer: {e}"));
                return;
            }
        };
        if self.current != id {
            return;
        }

        self.transport.send(ClientMessage::Answer {
            sdp: answer,
            room: self.session.room().to_string(),
        });
        self.state = NegotiationState::NegotiationComplete;
        log("Sent answer");
    }

    /// Remote answer to our offer: set it and flush the candidate queue.
    pub async fn on_remote_answer(&mut self, sdp: SessionDescription) {
        if self.torn_down {
            return;
        }
        log("Received answer");
        let Some(conn) = self.connection.clone() else {
            log("Answer received without a connection, ignoring");
            return;
        };
        let id = self.current;

        if let Err(e) = conn.set_remote_description(sdp).await {
            log(&format!("Failed to process answer: {e}"));
            return;
        }
        if self.current != id {
            return;
        }
        self.remote_description_set = true;

        self.drain_pending(&conn).await;
        if self.current == id {
            self.state = NegotiationState::NegotiationComplete;
        }
    }

    /// Remote candidate: applied immediately once the remote description is
    /// in place, queued otherwise. Queue order is arrival order.
    pub async fn on_remote_candidate(&mut self, candidate: IceCandidate) {
        if self.torn_down {
            return;
        }
        if self.remote_description_set {
            if let Some(conn) = self.connection.clone() {
                if let Err(e) = conn.add_ice_candidate(candidate).await {
                    log(&format!("Failed to add ICE candidate: {e}"));
                }
                return;
            }
        }
        log("Queuing ICE candidate until remote description is set");
        self.pending.push(candidate);
    }

    /// Locally gathered candidate: forwarded to the peer unless it belongs
    /// to a superseded connection.
    pub fn on_local_candidate(&mut self, connection: ConnectionId, candidate: IceCandidate) {
        if self.torn_down {
            return;
        }
        if connection != self.current {
            log(&format!(
                "Dropping local candidate from superseded {connection}"
            ));
            return;
        }
        self.transport.send(ClientMessage::IceCandidate {
            candidate,
            room: self.session.room().to_string(),
        });
    }

    /// Backend state change. `Failed` drives an automatic restart on the
    /// initiator side; a responder stays failed until a new offer arrives.
    pub async fn on_connection_state_changed(
        &mut self,
        connection: ConnectionId,
        state: ConnectionState,
    ) {
        if self.torn_down {
            return;
        }
        if connection != self.current {
            log(&format!("Ignoring state change from superseded {connection}"));
            return;
        }
        match state {
            ConnectionState::Connected => {
                log("Peers successfully connected");
                self.restart_attempts = 0;
                self.state = NegotiationState::Connected;
            }
            ConnectionState::Failed => {
                log(&format!("{}", NegotiationError::ConnectionFailed));
                self.state = NegotiationState::Failed;
                if self.session.is_initiator() {
                    self.restart().await;
                }
            }
            _ => {}
        }
    }

    /// Caption text relayed from the peer.
    pub fn on_caption(&mut self, sentence: Option<String>) {
        if self.torn_down {
            return;
        }
        self.session.set_caption(sentence);
    }

    /// Ends the session. Idempotent and fully synchronous: the connection
    /// close is fire-and-forget and exactly one `leave` is emitted, so this
    /// is safe to call from an unload path that cannot await.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        log(&format!(
            "Tearing down session for room {}",
            self.session.room()
        ));
        if let Some(conn) = self.connection.take() {
            conn.close();
        }
        self.pending.clear();
        self.remote_description_set = false;
        if self.media.take().is_some() {
            self.media_provider.stop_capture();
        }
        self.transport.send(ClientMessage::Leave {
            room: self.session.room().to_string(),
        });
        self.state = NegotiationState::Closed;
    }

    /// Closes the current connection (if any), discards queued candidates
    /// and brings up a replacement with local tracks re-attached.
    async fn recreate_connection(&mut self) -> Result<(), NegotiationError> {
        if let Some(old) = self.connection.take() {
            old.close();
        }
        self.pending.clear();
        self.remote_description_set = false;

        let id = ConnectionId(self.current.0 + 1);
        self.current = id;

        let backend = self.factory.create(id).await?;
        if self.current != id {
            // superseded while the backend was being created
            backend.close();
            return Err(NegotiationError::ConnectionSetup(format!(
                "{id} superseded during setup"
            )));
        }

        match &self.media {
            Some(media) => match backend.attach_tracks(media).await {
                Ok(n) => log(&format!("Attached {n} local tracks to {id}")),
                Err(e) => log(&format!("Continuing without local tracks: {e}")),
            },
            None => log("No local media available, continuing receive-only"),
        }

        self.connection = Some(backend);
        self.state = NegotiationState::ConnectionCreated;
        Ok(())
    }

    /// Creates and publishes the offer for the current connection. Refuses
    /// while another offer is in flight or the session is failed/closed;
    /// re-offering after a completed round is allowed, that is how a
    /// rejoining peer gets renegotiated.
    async fn send_offer(&mut self) {
        if self.state == NegotiationState::Offering || self.state.is_terminal() {
            log(&format!("Skipping offer in state {:?}", self.state));
            return;
        }
        let Some(conn) = self.connection.clone() else {
            return;
        };
        let id = self.current;
        self.state = NegotiationState::Offering;

        let offer = match conn.create_offer().await {
            Ok(desc) => desc,
            Err(e) => {
                log(&format!("Failed to create or send offer: {e}"));
                if self.current == id {
                    self.state = NegotiationState::ConnectionCreated;
                }
                return;
            }
        };
        if self.current != id {
            log(&format!("Discarding offer from superseded {id}"));
            return;
        }

        self.transport.send(ClientMessage::Offer {
            sdp: offer,
            room: self.session.room().to_string(),
        });
        self.state = NegotiationState::AwaitingOffer;
        log("Sent offer");
    }

    /// Automatic recovery for a failed initiator-side connection.
    async fn restart(&mut self) {
        if self.restart_attempts >= MAX_RESTART_ATTEMPTS {
            log(&format!(
                "Giving up after {} restart attempts",
                self.restart_attempts
            ));
            return;
        }
        self.restart_attempts += 1;
        log(&format!(
            "Connection failed, restarting ICE (attempt {})",
            self.restart_attempts
        ));
        if let Err(e) = self.recreate_connection().await {
            log(&format!("Restart failed: {e}"));
            return;
        }
        self.send_offer().await;
    }

    /// Applies every queued candidate in arrival order. A single failing
    /// candidate is skipped; the rest of the queue still drains.
    async fn drain_pending(&mut self, conn: &Arc<dyn PeerBackend>) {
        let queued = self.pending.drain();
        if queued.is_empty() {
            return;
        }
        log(&format!("Applying {} queued ICE candidates", queued.len()));
        for candidate in queued {
            if let Err(e) = conn.add_ice_candidate(candidate).await {
                log(&format!("Failed to apply queued candidate: {e}"));
            }
        }
    }
}
