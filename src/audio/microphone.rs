use super::capture::{AudioCapture, AudioChunk, CaptureProfile};
use crate::error::DictationError;
use anyhow::Result;
use chrono::Utc;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::StreamConfig;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Microphone capture source backed by cpal.
///
/// The cpal stream is not `Send`, so it lives on a dedicated thread for the
/// duration of a session; the audio callback pushes samples into a shared
/// buffer and a tokio task cuts the buffer into encoded chunks at the
/// profile cadence.
pub struct MicrophoneCapture {
    capturing: Arc<AtomicBool>,
    stream_thread: Option<std::thread::JoinHandle<()>>,
    chunker_task: Option<JoinHandle<()>>,
}

impl MicrophoneCapture {
    pub fn new() -> Self {
        Self {
            capturing: Arc::new(AtomicBool::new(false)),
            stream_thread: None,
            chunker_task: None,
        }
    }
}

impl Default for MicrophoneCapture {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AudioCapture for MicrophoneCapture {
    async fn open(
        &mut self,
        profile: &CaptureProfile,
    ) -> Result<mpsc::Receiver<AudioChunk>, DictationError> {
        if self.capturing.load(Ordering::SeqCst) {
            return Err(DictationError::DeviceUnavailable(
                "capture is already open".to_string(),
            ));
        }

        // The wire format is 16-bit PCM; any other depth in the profile
        // would be misencoded downstream.
        if profile.bits_per_sample != 16 {
            return Err(DictationError::UnsupportedEnvironment(format!(
                "{}-bit capture is not supported, the backend expects 16-bit PCM",
                profile.bits_per_sample
            )));
        }

        let sample_buffer: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));
        let (setup_tx, setup_rx) = oneshot::channel::<Result<u32, DictationError>>();

        self.capturing.store(true, Ordering::SeqCst);

        let capturing = Arc::clone(&self.capturing);
        let buffer = Arc::clone(&sample_buffer);
        let thread_profile = profile.clone();

        let thread = std::thread::Builder::new()
            .name("habla-capture".to_string())
            .spawn(move || {
                let (stream, device_rate) = match build_input_stream(&thread_profile, buffer) {
                    Ok(pair) => pair,
                    Err(e) => {
                        let _ = setup_tx.send(Err(e));
                        return;
                    }
                };

                if let Err(e) = stream.play() {
                    let _ = setup_tx.send(Err(DictationError::DeviceUnavailable(e.to_string())));
                    return;
                }

                let _ = setup_tx.send(Ok(device_rate));

                while capturing.load(Ordering::SeqCst) {
                    std::thread::sleep(Duration::from_millis(50));
                }

                // Dropping the stream releases the device.
                drop(stream);
                debug!("microphone stream released");
            })
            .map_err(|e| DictationError::DeviceUnavailable(e.to_string()))?;

        let device_rate = match setup_rx.await {
            Ok(Ok(rate)) => rate,
            Ok(Err(e)) => {
                self.capturing.store(false, Ordering::SeqCst);
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                self.capturing.store(false, Ordering::SeqCst);
                let _ = thread.join();
                return Err(DictationError::DeviceUnavailable(
                    "capture thread exited during setup".to_string(),
                ));
            }
        };

        self.stream_thread = Some(thread);

        info!(
            "Microphone open: device rate {} Hz, target {} Hz, chunk every {:?}",
            device_rate, profile.sample_rate, profile.chunk_interval
        );

        let (chunk_tx, chunk_rx) = mpsc::channel(32);
        let capturing = Arc::clone(&self.capturing);
        let chunker_profile = profile.clone();

        let chunker = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(chunker_profile.chunk_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // Skip the immediate first tick.
            ticker.tick().await;

            let mut sequence: u32 = 0;

            loop {
                ticker.tick().await;
                let running = capturing.load(Ordering::SeqCst);

                let samples = {
                    let Ok(mut buf) = sample_buffer.lock() else {
                        error!("sample buffer mutex poisoned, stopping capture");
                        break;
                    };
                    std::mem::take(&mut *buf)
                };

                if !samples.is_empty() {
                    let samples = if device_rate != chunker_profile.sample_rate {
                        resample(&samples, device_rate, chunker_profile.sample_rate)
                    } else {
                        samples
                    };

                    match encode_wav_chunk(&samples, &chunker_profile) {
                        Ok(data) => {
                            let chunk = AudioChunk {
                                data,
                                sequence,
                                captured_at: Utc::now(),
                            };
                            sequence += 1;
                            if chunk_tx.send(chunk).await.is_err() {
                                debug!("chunk consumer gone, stopping chunker");
                                break;
                            }
                        }
                        Err(e) => error!("Failed to encode audio chunk: {}", e),
                    }
                }

                // One last drain happens above after close flips the flag, so
                // audio buffered during the final interval is still emitted.
                if !running {
                    break;
                }
            }

            debug!("capture chunker stopped after {} chunks", sequence);
        });

        self.chunker_task = Some(chunker);

        Ok(chunk_rx)
    }

    async fn close(&mut self) -> Result<()> {
        if !self.capturing.swap(false, Ordering::SeqCst)
            && self.stream_thread.is_none()
            && self.chunker_task.is_none()
        {
            debug!("microphone already closed");
            return Ok(());
        }

        if let Some(thread) = self.stream_thread.take() {
            tokio::task::spawn_blocking(move || {
                if thread.join().is_err() {
                    warn!("capture thread panicked");
                }
            })
            .await?;
        }

        if let Some(task) = self.chunker_task.take() {
            if let Err(e) = task.await {
                error!("Capture chunker task panicked: {}", e);
            }
        }

        info!("Microphone closed");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

/// Build the cpal input stream on the capture thread.
///
/// Echo cancellation and noise suppression are applied by the OS input
/// stack where available; cpal exposes no switches for them.
fn build_input_stream(
    profile: &CaptureProfile,
    buffer: Arc<Mutex<Vec<f32>>>,
) -> Result<(cpal::Stream, u32), DictationError> {
    let host = cpal::default_host();

    let device = host.default_input_device().ok_or_else(|| {
        DictationError::DeviceUnavailable("no input device available".to_string())
    })?;

    let default_config = device
        .default_input_config()
        .map_err(|e| classify_device_error(&e.to_string()))?;

    let mut config: StreamConfig = default_config.into();

    // Prefer opening the device at the target rate so no resampling is
    // needed downstream.
    if let Ok(supported) = device.supported_input_configs() {
        for candidate in supported {
            if candidate.min_sample_rate().0 <= profile.sample_rate
                && candidate.max_sample_rate().0 >= profile.sample_rate
            {
                config.sample_rate = cpal::SampleRate(profile.sample_rate);
                break;
            }
        }
    }

    let device_rate = config.sample_rate.0;
    let channels = config.channels as usize;

    let err_fn = |err| error!("Audio stream error: {}", err);

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let Ok(mut buf) = buffer.lock() else {
                    return;
                };

                if channels == 1 {
                    buf.extend_from_slice(data);
                } else {
                    // Average channels down to mono.
                    for frame in data.chunks(channels) {
                        let mono: f32 = frame.iter().sum::<f32>() / channels as f32;
                        buf.push(mono);
                    }
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| classify_device_error(&e.to_string()))?;

    Ok((stream, device_rate))
}

fn classify_device_error(message: &str) -> DictationError {
    let lowered = message.to_lowercase();
    if lowered.contains("permission") || lowered.contains("denied") {
        DictationError::PermissionDenied(message.to_string())
    } else {
        DictationError::DeviceUnavailable(message.to_string())
    }
}

/// Encode one chunk of mono samples as a self-contained 16-bit PCM WAV
/// container at the profile rate. `open` rejects any other bit depth.
fn encode_wav_chunk(samples: &[f32], profile: &CaptureProfile) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: profile.channels,
        sample_rate: profile.sample_rate,
        bits_per_sample: profile.bits_per_sample,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            let quantized = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer.write_sample(quantized)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

/// Linear-interpolation resampling for devices that cannot open at the
/// target rate.
fn resample(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || input.is_empty() {
        return input.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (input.len() as f64 / ratio) as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_idx = i as f64 * ratio;
        let src_floor = src_idx.floor() as usize;
        let src_ceil = (src_floor + 1).min(input.len() - 1);
        let frac = (src_idx - src_floor as f64) as f32;

        output.push(input[src_floor] * (1.0 - frac) + input[src_ceil] * frac);
    }

    output
}
