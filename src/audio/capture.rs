use crate::error::DictationError;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::mpsc;

/// Capture configuration handed to the device when a session starts.
///
/// The audio profile (16 kHz, mono, 16-bit) is part of the contract with the
/// transcription backend and must match on both ends.
#[derive(Debug, Clone)]
pub struct CaptureProfile {
    /// Number of channels (1 = mono)
    pub channels: u16,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Sample size in bits
    pub bits_per_sample: u16,
    /// Ask the device stack for echo cancellation
    pub echo_cancellation: bool,
    /// Ask the device stack for noise suppression
    pub noise_suppression: bool,
    /// Cadence at which encoded chunks are emitted
    pub chunk_interval: Duration,
}

impl Default for CaptureProfile {
    fn default() -> Self {
        Self {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            echo_cancellation: true,
            noise_suppression: true,
            chunk_interval: Duration::from_millis(1000),
        }
    }
}

/// One encoded audio chunk, produced at the profile cadence.
///
/// Chunk sizes depend on encoder behavior and are not uniform. Ownership
/// moves to the transport on emission; chunks are not retained afterwards.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Encoded audio bytes
    pub data: Vec<u8>,
    /// Production order, starting at 0
    pub sequence: u32,
    /// When the chunk was cut
    pub captured_at: DateTime<Utc>,
}

impl AudioChunk {
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// Audio capture source
///
/// Implementations:
/// - `MicrophoneCapture`: cpal input device (all platforms)
/// - test doubles that replay scripted chunks
#[async_trait::async_trait]
pub trait AudioCapture: Send + Sync {
    /// Open the device and start producing chunks.
    ///
    /// Returns a channel receiver delivering `AudioChunk`s at the profile
    /// cadence until `close` is called. Opening may await a permission
    /// prompt; a declined prompt surfaces as `PermissionDenied`, a missing
    /// or busy device as `DeviceUnavailable`.
    async fn open(
        &mut self,
        profile: &CaptureProfile,
    ) -> Result<mpsc::Receiver<AudioChunk>, DictationError>;

    /// Stop producing chunks and release the device. Idempotent.
    async fn close(&mut self) -> Result<()>;

    /// Check if the device is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get source name for logging
    fn name(&self) -> &str;
}

/// One-time startup probe for the live-streaming path.
///
/// Verifies the host exposes an audio input stack at all. Failure is fatal
/// to live dictation only; the batch path never touches audio devices.
pub fn environment_check() -> Result<(), DictationError> {
    use cpal::traits::HostTrait;

    let host = cpal::default_host();
    host.input_devices()
        .map_err(|e| DictationError::UnsupportedEnvironment(e.to_string()))?;

    Ok(())
}
