use thiserror::Error;

/// Failure classes of the negotiation core.
///
/// Nothing here escapes as a panic: every variant is either logged and
/// swallowed at the call site or drives a recovery transition in the
/// negotiation handler.
#[derive(Debug, Error)]
pub enum NegotiationError {
    /// The user refused camera/microphone access. Fatal to starting a
    /// session locally; answering a remote offer is still possible.
    #[error("camera/microphone access denied")]
    MediaAccessDenied,

    /// The peer connection resource could not be created.
    #[error("failed to create peer connection: {0}")]
    ConnectionSetup(String),

    /// Local offer/answer generation failed. Logged, step aborted, no retry.
    #[error("failed to generate local description: {0}")]
    DescriptionGeneration(String),

    /// The remote description could not be applied. The negotiation stalls
    /// until a fresh offer or an ICE restart arrives.
    #[error("failed to apply remote description: {0}")]
    RemoteDescriptionApply(String),

    /// A single ICE candidate could not be applied. Skipped; the rest of the
    /// queue still drains.
    #[error("failed to apply ICE candidate: {0}")]
    CandidateApply(String),

    /// Local media tracks could not be attached to the connection.
    #[error("failed to attach local media tracks: {0}")]
    TrackAttach(String),

    /// The connection entered the failed state.
    #[error("peer connection failed")]
    ConnectionFailed,
}
