use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub session: SessionTimingConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    /// WebSocket endpoint for live streaming transcription.
    pub streaming_url: String,
    /// HTTP endpoint for one-shot file transcription.
    pub batch_url: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    /// Cadence at which capture emits encoded chunks.
    pub chunk_interval_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct SessionTimingConfig {
    /// Delay between halting capture and closing the transport, so fragments
    /// for the final chunks can still arrive.
    pub grace_period_ms: u64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
