use serde::Serialize;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;

/// Identity of one connection instance within a session.
///
/// Every recreated connection gets a fresh id; async continuations carry the
/// id they were started under so the handler can drop work that belongs to a
/// superseded connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Where a session stands in the offer/answer exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum NegotiationState {
    /// No room joined yet.
    #[default]
    Idle,
    /// Joined; waiting for local capture to come up.
    AwaitingLocalMedia,
    /// Connection exists, no description published yet.
    ConnectionCreated,
    /// Initiator decided to offer; local description being generated.
    Offering,
    /// Waiting for the remote description: the answer after our offer went
    /// out, or the peer's offer when responding.
    AwaitingOffer,
    /// Both descriptions in place; ICE is connecting.
    NegotiationComplete,
    /// Media path established.
    Connected,
    /// Connection failed. Initiators restart automatically; responders stay
    /// here until a fresh remote offer arrives.
    Failed,
    /// Session torn down.
    Closed,
}

impl NegotiationState {
    /// `true` for states no offer/answer activity can leave on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Closed)
    }
}

/// Connection-level state as reported by the peer backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Failed,
    Closed,
}

impl From<RTCPeerConnectionState> for ConnectionState {
    fn from(st: RTCPeerConnectionState) -> Self {
        match st {
            RTCPeerConnectionState::New | RTCPeerConnectionState::Unspecified => Self::New,
            // A disconnect may still recover; treat it as in-flight until the
            // backend reports failed.
            RTCPeerConnectionState::Connecting | RTCPeerConnectionState::Disconnected => {
                Self::Connecting
            }
            RTCPeerConnectionState::Connected => Self::Connected,
            RTCPeerConnectionState::Failed => Self::Failed,
            RTCPeerConnectionState::Closed => Self::Closed,
        }
    }
}
