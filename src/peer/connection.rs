use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use tokio::sync::mpsc;
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::peer_connection::policy::bundle_policy::RTCBundlePolicy;
use webrtc::peer_connection::policy::rtcp_mux_policy::RTCRtcpMuxPolicy;
use webrtc::{
    api::APIBuilder,
    ice_transport::ice_server::RTCIceServer,
    peer_connection::{
        configuration::RTCConfiguration, peer_connection_state::RTCPeerConnectionState,
        RTCPeerConnection,
    },
};

use crate::error::NegotiationError;
use crate::handler::SessionEvent;
use crate::logger::{dump_candidate, dump_selected_pair, log};
use crate::media::{MediaHandle, MediaProvider};
use crate::peer::state::{ConnectionId, ConnectionState};
use crate::peer::types::{IceCandidate, ServerConfig, SessionDescription};
use crate::utils::add_ice_url_scheme;

/// ICE servers used when the application supplies none.
static DEFAULT_ICE_SERVERS: Lazy<Vec<ServerConfig>> = Lazy::new(|| {
    vec![
        ServerConfig {
            id: "default-stun-0".into(),
            r#type: "stun".into(),
            url: "stun:stun.l.google.com:19302".into(),
            username: None,
            credential: None,
        },
        ServerConfig {
            id: "default-stun-1".into(),
            r#type: "stun".into(),
            url: "stun:stun1.l.google.com:19302".into(),
            username: None,
            credential: None,
        },
    ]
});

/// One peer-connection resource.
///
/// The handler drives exactly one of these per negotiation round and never
/// reuses an instance after failure; restart means close + recreate.
#[async_trait]
pub trait PeerBackend: Send + Sync {
    /// Generates the local offer and publishes it as the local description.
    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError>;

    /// Generates the local answer and publishes it as the local description.
    async fn create_answer(&self) -> Result<SessionDescription, NegotiationError>;

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), NegotiationError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), NegotiationError>;

    /// Attaches local tracks; returns how many were added.
    async fn attach_tracks(&self, media: &MediaHandle) -> Result<usize, NegotiationError>;

    /// Begins closing the connection. Fire and forget: teardown must not
    /// wait on network I/O.
    fn close(&self);
}

/// Creates connections. A fresh backend is requested on session start and on
/// every initiator-side restart.
#[async_trait]
pub trait PeerFactory: Send + Sync {
    async fn create(&self, id: ConnectionId) -> Result<Arc<dyn PeerBackend>, NegotiationError>;
}

/// webrtc-rs implementation of [`PeerBackend`].
pub struct RtcPeerLink {
    id: ConnectionId,
    pc: Arc<RTCPeerConnection>,
}

impl RtcPeerLink {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

#[async_trait]
impl PeerBackend for RtcPeerLink {
    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError> {
        let gen_err = |e: webrtc::Error| NegotiationError::DescriptionGeneration(e.to_string());
        let offer = self.pc.create_offer(None).await.map_err(gen_err)?;
        self.pc.set_local_description(offer).await.map_err(gen_err)?;
        let local = self.pc.local_description().await.ok_or_else(|| {
            NegotiationError::DescriptionGeneration("local description missing after set".into())
        })?;
        SessionDescription::from_rtc(local)
    }

    async fn create_answer(&self) -> Result<SessionDescription, NegotiationError> {
        let gen_err = |e: webrtc::Error| NegotiationError::DescriptionGeneration(e.to_string());
        let answer = self.pc.create_answer(None).await.map_err(gen_err)?;
        self.pc
            .set_local_description(answer)
            .await
            .map_err(gen_err)?;
        let local = self.pc.local_description().await.ok_or_else(|| {
            NegotiationError::DescriptionGeneration("local description missing after set".into())
        })?;
        SessionDescription::from_rtc(local)
    }

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), NegotiationError> {
        let apply_err = |e: webrtc::Error| NegotiationError::RemoteDescriptionApply(e.to_string());
        let rtc = desc.into_rtc().map_err(apply_err)?;
        self.pc.set_remote_description(rtc).await.map_err(apply_err)
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), NegotiationError> {
        self.pc
            .add_ice_candidate(candidate.into())
            .await
            .map_err(|e| NegotiationError::CandidateApply(e.to_string()))
    }

    async fn attach_tracks(&self, media: &MediaHandle) -> Result<usize, NegotiationError> {
        let mut added = 0;
        for track in media.tracks() {
            self.pc
                .add_track(Arc::clone(track))
                .await
                .map_err(|e| NegotiationError::TrackAttach(e.to_string()))?;
            added += 1;
        }
        Ok(added)
    }

    fn close(&self) {
        let id = self.id;
        let pc = self.pc.clone();
        tokio::spawn(async move {
            if let Err(e) = pc.close().await {
                log(&format!("Error closing {id}: {e}"));
            }
        });
    }
}

/// webrtc-rs implementation of [`PeerFactory`].
///
/// Local candidates, connection-state changes and inbound tracks are fed
/// back into the session event loop tagged with the connection id, so stale
/// callbacks from a superseded connection can be discarded.
pub struct RtcPeerFactory {
    servers: Vec<ServerConfig>,
    events: mpsc::UnboundedSender<SessionEvent>,
    media: Arc<dyn MediaProvider>,
}

impl RtcPeerFactory {
    /// `servers` may be empty; the default STUN set is used then. The list
    /// is checked by [`validate_ice_servers`] each time a connection is
    /// created.
    pub fn new(
        servers: Vec<ServerConfig>,
        events: mpsc::UnboundedSender<SessionEvent>,
        media: Arc<dyn MediaProvider>,
    ) -> Self {
        Self {
            servers,
            events,
            media,
        }
    }
}

#[async_trait]
impl PeerFactory for RtcPeerFactory {
    async fn create(&self, id: ConnectionId) -> Result<Arc<dyn PeerBackend>, NegotiationError> {
        validate_ice_servers(&self.servers)?;
        let api = APIBuilder::new().build();
        let config = rtc_config(&self.servers);

        let pc = Arc::new(
            api.new_peer_connection(config)
                .await
                .map_err(|e| NegotiationError::ConnectionSetup(e.to_string()))?,
        );
        log(&format!("Peer connection {id} created"));

        let events = self.events.clone();
        pc.on_ice_candidate(Box::new(move |cand: Option<RTCIceCandidate>| {
            let events = events.clone();
            Box::pin(async move {
                if let Some(c) = cand {
                    dump_candidate("LOCAL", &c).await;
                    match c.to_json() {
                        Ok(init) => {
                            let _ = events.send(SessionEvent::LocalCandidate {
                                connection: id,
                                candidate: IceCandidate::from(init),
                            });
                        }
                        Err(e) => log(&format!("Failed to serialize local candidate: {e}")),
                    }
                } else {
                    // null candidate marks the end of gathering
                    log("ICE candidate gathering completed");
                }
            })
        }));

        pc.on_ice_gathering_state_change(Box::new(move |state| {
            log(&format!("ICE gathering state changed to: {state:?}"));
            Box::pin(async {})
        }));

        let events = self.events.clone();
        let pc_stats = pc.clone();
        pc.on_peer_connection_state_change(Box::new(move |st: RTCPeerConnectionState| {
            log(&format!("Peer connection {id} state changed to: {st:?}"));

            if st == RTCPeerConnectionState::Failed {
                let pc = pc_stats.clone();
                tokio::spawn(async move {
                    dump_selected_pair(&pc, "BEFORE-FAIL").await;
                });
            }

            let _ = events.send(SessionEvent::ConnectionStateChanged {
                connection: id,
                state: ConnectionState::from(st),
            });
            Box::pin(async {})
        }));

        let media = self.media.clone();
        pc.on_track(Box::new(move |track, _receiver, _transceiver| {
            media.render_remote(track);
            Box::pin(async {})
        }));

        Ok(Arc::new(RtcPeerLink { id, pc }))
    }
}

/// Builds the RTC configuration for one connection.
fn rtc_config(custom_servers: &[ServerConfig]) -> RTCConfiguration {
    let ice_servers = if custom_servers.is_empty() {
        to_rtc_servers(&DEFAULT_ICE_SERVERS)
    } else {
        to_rtc_servers(custom_servers)
    };

    RTCConfiguration {
        ice_servers,
        ice_candidate_pool_size: 10,
        bundle_policy: RTCBundlePolicy::MaxBundle,
        rtcp_mux_policy: RTCRtcpMuxPolicy::Require,
        ..Default::default()
    }
}

fn to_rtc_servers(servers: &[ServerConfig]) -> Vec<RTCIceServer> {
    servers
        .iter()
        .map(|config| RTCIceServer {
            urls: vec![add_ice_url_scheme(config)],
            username: config.username.clone().unwrap_or_default(),
            credential: config.credential.clone().unwrap_or_default(),
        })
        .collect()
}

/// Validates an application-supplied ICE server list. TURN entries need
/// credentials; anything without a URL is rejected.
pub fn validate_ice_servers(servers: &[ServerConfig]) -> Result<(), NegotiationError> {
    for server in servers {
        if server.url.is_empty() {
            return Err(NegotiationError::ConnectionSetup(
                "ICE server URL cannot be empty".into(),
            ));
        }
        if server.r#type == "turn" && (server.username.is_none() || server.credential.is_none()) {
            return Err(NegotiationError::ConnectionSetup(
                "TURN servers require username and credential".into(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(r#type: &str, url: &str, creds: bool) -> ServerConfig {
        ServerConfig {
            id: "x".into(),
            r#type: r#type.into(),
            url: url.into(),
            username: creds.then(|| "u".into()),
            credential: creds.then(|| "p".into()),
        }
    }

    #[test]
    fn turn_without_credentials_is_rejected() {
        let servers = vec![server("turn", "relay.example.com:443", false)];
        assert!(validate_ice_servers(&servers).is_err());
        let servers = vec![server("turn", "relay.example.com:443", true)];
        assert!(validate_ice_servers(&servers).is_ok());
    }

    #[tokio::test]
    async fn factory_refuses_to_create_with_invalid_servers() {
        let (events, _rx) = mpsc::unbounded_channel();
        let media = Arc::new(crate::media::SampleMediaProvider::new());
        let factory = RtcPeerFactory::new(
            vec![server("turn", "relay.example.com:443", false)],
            events,
            media,
        );
        assert!(factory.create(ConnectionId(1)).await.is_err());
    }

    #[test]
    fn empty_list_falls_back_to_defaults() {
        let config = rtc_config(&[]);
        assert!(!config.ice_servers.is_empty());
        assert!(config.ice_servers[0].urls[0].starts_with("stun:"));
    }
}
