use thiserror::Error;

/// Failure taxonomy for the dictation paths.
///
/// Capture and transport variants are caught by the session controller and
/// surfaced as status updates; batch variants are returned per request.
#[derive(Debug, Clone, Error)]
pub enum DictationError {
    /// No usable audio input device, or the device could not be opened.
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The platform refused access to the microphone.
    #[error("microphone permission denied: {0}")]
    PermissionDenied(String),

    /// The websocket handshake with the transcription backend failed.
    #[error("failed to connect to transcription backend: {0}")]
    ConnectFailed(String),

    /// An established streaming connection dropped unexpectedly.
    #[error("connection to transcription backend lost: {0}")]
    ConnectionLost(String),

    /// The batch upload request could not be sent or its response read.
    #[error("upload failed: {0}")]
    UploadFailed(String),

    /// The batch endpoint answered with a non-success status code.
    #[error("transcription server returned status {0}")]
    ServerError(u16),

    /// A capability the live-streaming path requires is missing on this host.
    /// Fatal to live dictation only; the batch path does not need it.
    #[error("unsupported environment: {0}")]
    UnsupportedEnvironment(String),
}
