pub mod connection;
pub mod ice;
pub mod state;
pub mod types;

pub use connection::{validate_ice_servers, PeerBackend, PeerFactory, RtcPeerFactory, RtcPeerLink};
pub use ice::PendingCandidateQueue;
pub use state::{ConnectionId, ConnectionState, NegotiationState};
pub use types::{IceCandidate, SdpKind, ServerConfig, SessionDescription};
