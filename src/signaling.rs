//! Signaling wire types and the transport seam.
//!
//! The signaling server is a thin room-keyed relay: clients `join` a room,
//! the first member becomes the initiator, and `offer` / `answer` /
//! `ice-candidate` payloads are forwarded to the other member verbatim.
//! Caption text recognized from the local camera travels the same channel as
//! `sign_text` and arrives at the peer as `receive_text`.

use serde::{Deserialize, Serialize};

use crate::handler::SessionEvent;
use crate::peer::types::{IceCandidate, SessionDescription};

/// Messages this client sends to the signaling server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    Join {
        room: String,
    },
    Offer {
        sdp: SessionDescription,
        room: String,
    },
    Answer {
        sdp: SessionDescription,
        room: String,
    },
    #[serde(rename = "ice-candidate")]
    IceCandidate {
        candidate: IceCandidate,
        room: String,
    },
    SignText {
        sentence: String,
        room: String,
    },
    Leave {
        room: String,
    },
}

/// Messages the signaling server delivers to this client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected {
        status: String,
    },
    JoinedRoom {
        initiator: bool,
        count: u32,
    },
    UserJoined {
        count: u32,
    },
    UserLeft {
        count: u32,
    },
    Offer {
        sdp: SessionDescription,
    },
    Answer {
        sdp: SessionDescription,
    },
    #[serde(rename = "ice-candidate")]
    IceCandidate {
        candidate: IceCandidate,
    },
    ReceiveText {
        sentence: Option<String>,
    },
}

impl ServerMessage {
    /// Maps an inbound signaling message onto the handler's event type.
    /// Connection acknowledgments carry no session semantics and map to
    /// `None`.
    pub fn into_event(self) -> Option<SessionEvent> {
        match self {
            ServerMessage::Connected { .. } => None,
            ServerMessage::JoinedRoom { initiator, count } => {
                Some(SessionEvent::Joined { initiator, count })
            }
            ServerMessage::UserJoined { count } => Some(SessionEvent::PeerJoined { count }),
            ServerMessage::UserLeft { count } => Some(SessionEvent::PeerLeft { count }),
            ServerMessage::Offer { sdp } => Some(SessionEvent::RemoteOffer { sdp }),
            ServerMessage::Answer { sdp } => Some(SessionEvent::RemoteAnswer { sdp }),
            ServerMessage::IceCandidate { candidate } => {
                Some(SessionEvent::RemoteCandidate { candidate })
            }
            ServerMessage::ReceiveText { sentence } => {
                Some(SessionEvent::CaptionReceived { sentence })
            }
        }
    }
}

/// Outbound half of the signaling channel.
///
/// `send` must not block and must not depend on asynchronous completion:
/// teardown emits the final `leave` through it synchronously. Typical
/// implementations push into an unbounded channel drained by a writer task.
pub trait SignalingTransport: Send + Sync {
    fn send(&self, message: ClientMessage);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbound_offer_shape() {
        let msg = ClientMessage::Offer {
            sdp: SessionDescription::offer("v=0\r\n"),
            room: "demo".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["event"], "offer");
        assert_eq!(json["data"]["room"], "demo");
        assert_eq!(json["data"]["sdp"]["type"], "offer");
    }

    #[test]
    fn candidate_event_name_is_hyphenated() {
        let msg = ClientMessage::IceCandidate {
            candidate: IceCandidate {
                candidate: "candidate:1 1 udp 1 192.0.2.1 5000 typ host".into(),
                sdp_mid: Some("0".into()),
                sdp_mline_index: Some(0),
            },
            room: "demo".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["event"], "ice-candidate");
    }

    #[test]
    fn inbound_join_ack_parses_and_maps() {
        let raw = r#"{"event":"joined_room","data":{"initiator":true,"count":1}}"#;
        let msg: ServerMessage = serde_json::from_str(raw).unwrap();
        match msg.into_event() {
            Some(SessionEvent::Joined { initiator, count }) => {
                assert!(initiator);
                assert_eq!(count, 1);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn connected_ack_maps_to_nothing() {
        let msg = ServerMessage::Connected {
            status: "connected".into(),
        };
        assert!(msg.into_event().is_none());
    }
}
