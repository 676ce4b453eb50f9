//! Local capture and remote render seam.
//!
//! The negotiation core never touches devices itself; it acquires a
//! [`MediaHandle`] from a [`MediaProvider`] and attaches the tracks to the
//! peer connection. [`SampleMediaProvider`] is the production implementation:
//! it exposes webrtc sample tracks that the capture pipeline writes encoded
//! frames into.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

use crate::error::NegotiationError;
use crate::logger::log;
use crate::utils::random_id;

/// Handle to the local capture: the tracks to publish on a connection.
///
/// The handle is reused across connection restarts; tracks are re-attached
/// to every fresh connection.
pub struct MediaHandle {
    tracks: Vec<Arc<dyn TrackLocal + Send + Sync>>,
}

impl MediaHandle {
    pub fn new(tracks: Vec<Arc<dyn TrackLocal + Send + Sync>>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[Arc<dyn TrackLocal + Send + Sync>] {
        &self.tracks
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Capture/render capability consumed by the negotiation handler.
#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// Starts local capture. `MediaAccessDenied` is fatal to starting a
    /// session but a remote offer can still be answered receive-only.
    async fn acquire(&self) -> Result<MediaHandle, NegotiationError>;

    /// A remote track arrived on the connection.
    fn render_remote(&self, track: Arc<TrackRemote>);

    /// The remote side is gone; drop whatever is being rendered.
    fn clear_remote(&self);

    /// Stop local capture. Must be synchronous: teardown runs to completion
    /// without awaiting.
    fn stop_capture(&self);
}

/// Sample-track backed provider.
///
/// `acquire` creates one Opus audio and one VP8 video sample track under a
/// shared stream id; the capture pipeline obtains them via
/// [`SampleMediaProvider::video_track`] / [`SampleMediaProvider::audio_track`]
/// and writes encoded samples in.
#[derive(Default)]
pub struct SampleMediaProvider {
    video: Mutex<Option<Arc<TrackLocalStaticSample>>>,
    audio: Mutex<Option<Arc<TrackLocalStaticSample>>>,
    remote: Mutex<Option<Arc<TrackRemote>>>,
}

impl SampleMediaProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn video_track(&self) -> Option<Arc<TrackLocalStaticSample>> {
        self.video.lock().unwrap().clone()
    }

    pub fn audio_track(&self) -> Option<Arc<TrackLocalStaticSample>> {
        self.audio.lock().unwrap().clone()
    }

    pub fn remote_track(&self) -> Option<Arc<TrackRemote>> {
        self.remote.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaProvider for SampleMediaProvider {
    async fn acquire(&self) -> Result<MediaHandle, NegotiationError> {
        let stream_id = format!("webcam-{}", random_id());

        let video = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                ..Default::default()
            },
            "video".to_owned(),
            stream_id.clone(),
        ));
        let audio = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                ..Default::default()
            },
            "audio".to_owned(),
            stream_id,
        ));

        *self.video.lock().unwrap() = Some(video.clone());
        *self.audio.lock().unwrap() = Some(audio.clone());

        log("Local sample tracks created");
        Ok(MediaHandle::new(vec![video, audio]))
    }

    fn render_remote(&self, track: Arc<TrackRemote>) {
        log(&format!(
            "Remote track received: kind={} id={}",
            track.kind(),
            track.id()
        ));
        *self.remote.lock().unwrap() = Some(track);
    }

    fn clear_remote(&self) {
        *self.remote.lock().unwrap() = None;
    }

    fn stop_capture(&self) {
        *self.video.lock().unwrap() = None;
        *self.audio.lock().unwrap() = None;
        log("Local capture stopped");
    }
}
