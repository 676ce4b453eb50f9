//! Negotiation core for a two-party video call with a sign-language caption
//! overlay.
//!
//! One [`handler::NegotiationHandler`] per joined room drives the
//! offer/answer/ICE exchange over a room-keyed signaling channel. The
//! signaling transport, the peer-connection backend and the media pipeline
//! are consumed through trait seams; production backends live in
//! [`peer::connection`] (webrtc-rs) and [`media`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use signcall::{
//!     handler::NegotiationHandler,
//!     media::SampleMediaProvider,
//!     peer::RtcPeerFactory,
//!     signaling::{ClientMessage, SignalingTransport},
//! };
//!
//! struct ChannelTransport(mpsc::UnboundedSender<ClientMessage>);
//!
//! impl SignalingTransport for ChannelTransport {
//!     fn send(&self, message: ClientMessage) {
//!         let _ = self.0.send(message);
//!     }
//! }
//!
//! # async fn start(outbound: mpsc::UnboundedSender<ClientMessage>) {
//! let media = Arc::new(SampleMediaProvider::new());
//! let (events_tx, events_rx) = mpsc::unbounded_channel();
//! let factory = Arc::new(RtcPeerFactory::new(Vec::new(), events_tx, media.clone()));
//! let handler = NegotiationHandler::new(
//!     "demo-room",
//!     Arc::new(ChannelTransport(outbound)),
//!     factory,
//!     media,
//! );
//! handler.join();
//! tokio::spawn(handler.run(events_rx));
//! # }
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod logger;
pub mod media;
pub mod peer;
pub mod session;
pub mod signaling;
pub mod utils;

pub use error::NegotiationError;
pub use handler::{NegotiationHandler, SessionEvent, MAX_RESTART_ATTEMPTS};
pub use media::{MediaHandle, MediaProvider, SampleMediaProvider};
pub use peer::{
    ConnectionId, ConnectionState, IceCandidate, NegotiationState, PeerBackend, PeerFactory,
    PendingCandidateQueue, RtcPeerFactory, SdpKind, ServerConfig, SessionDescription,
};
pub use session::{Role, Session};
pub use signaling::{ClientMessage, ServerMessage, SignalingTransport};
