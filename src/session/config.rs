use crate::audio::CaptureProfile;
use crate::config::Config;
use std::time::Duration;

/// Configuration for a dictation session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Unique session identifier
    pub session_id: String,

    /// WebSocket endpoint of the streaming transcription backend
    pub streaming_url: String,

    /// Audio profile shared with the backend
    pub profile: CaptureProfile,

    /// Delay between halting capture and closing the transport, so fragments
    /// for the final chunks can still arrive
    pub grace_period: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("dictation-{}", uuid::Uuid::new_v4()),
            streaming_url: "ws://localhost:8000/ws/transcribe".to_string(),
            profile: CaptureProfile::default(),
            grace_period: Duration::from_millis(1500),
        }
    }
}

impl SessionConfig {
    /// Build a session config from the application config file.
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            session_id: format!("dictation-{}", uuid::Uuid::new_v4()),
            streaming_url: cfg.service.streaming_url.clone(),
            profile: CaptureProfile {
                channels: cfg.audio.channels,
                sample_rate: cfg.audio.sample_rate,
                bits_per_sample: cfg.audio.bits_per_sample,
                chunk_interval: Duration::from_millis(cfg.audio.chunk_interval_ms),
                ..CaptureProfile::default()
            },
            grace_period: Duration::from_millis(cfg.session.grace_period_ms),
        }
    }
}
