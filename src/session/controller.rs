use super::config::SessionConfig;
use super::status::{SessionState, SessionStats, SessionStatus, StatusCode};
use crate::audio::{AudioCapture, AudioChunk};
use crate::error::DictationError;
use crate::transcript::TranscriptAssembler;
use crate::transport::{StreamingTransport, TransportEvent};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Orchestrates one dictation session at a time: audio capture, the
/// streaming transport, and transcript assembly, driven by a single task
/// reading from their event channels.
///
/// State machine: `Idle -> Connecting -> Capturing -> Stopping -> Idle`.
/// Capture or transport failures route through `Stopping` back to `Idle`;
/// nothing is retried automatically. A `start` while any session is still
/// winding down is rejected as a logged no-op.
pub struct SessionController {
    config: SessionConfig,

    /// The one capture source. Exclusively owned; opened and closed once
    /// per session.
    capture: Arc<Mutex<Box<dyn AudioCapture>>>,

    /// Transcript of the current (or last) session. Preserved across
    /// failures, reset on the next `start`.
    transcript: Arc<Mutex<TranscriptAssembler>>,

    /// Status projection; also the authority on the current state.
    status_tx: watch::Sender<SessionStatus>,

    /// When the current session started
    started_at: Mutex<Option<chrono::DateTime<Utc>>>,

    /// Driver task plus its stop signal, one pair per running session
    driver: Mutex<Option<(JoinHandle<()>, Arc<Notify>)>>,
}

impl SessionController {
    pub fn new(config: SessionConfig, capture: Box<dyn AudioCapture>) -> Self {
        let (status_tx, _) = watch::channel(SessionStatus::idle());

        Self {
            config,
            capture: Arc::new(Mutex::new(capture)),
            transcript: Arc::new(Mutex::new(TranscriptAssembler::new())),
            status_tx,
            started_at: Mutex::new(None),
            driver: Mutex::new(None),
        }
    }

    /// Subscribe to status updates. The receiver always holds the latest
    /// status; one update is published per state transition.
    pub fn status(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.status_tx.borrow().state
    }

    /// The transcript assembled so far, one cleaned fragment per line.
    pub async fn transcript_text(&self) -> String {
        self.transcript.lock().await.text().to_string()
    }

    /// Get current session statistics
    pub async fn stats(&self) -> SessionStats {
        SessionStats {
            state: self.state(),
            started_at: *self.started_at.lock().await,
            fragment_count: self.transcript.lock().await.fragment_count(),
        }
    }

    /// Start a new session.
    ///
    /// Connects the transport, opens the capture device, and hands both to
    /// the driver task. Returns once the session is `Capturing`. Bring-up
    /// failures settle the state machine back to `Idle` (with the matching
    /// status published) and are also returned to the caller.
    pub async fn start(&self) -> Result<(), DictationError> {
        let began = self.status_tx.send_if_modified(|status| {
            if status.state == SessionState::Idle {
                *status = SessionStatus {
                    state: SessionState::Connecting,
                    code: StatusCode::Connecting,
                    message: "Connecting to transcription backend".to_string(),
                };
                true
            } else {
                false
            }
        });

        if !began {
            warn!("start ignored: session is {:?}", self.state());
            return Ok(());
        }

        info!("Starting dictation session {}", self.config.session_id);

        // Reap the previous session's finished driver, if any.
        let previous = self.driver.lock().await.take();
        if let Some((task, _)) = previous {
            let _ = task.await;
        }

        // A new session gets a fresh transcript.
        self.transcript.lock().await.clear();
        *self.started_at.lock().await = Some(Utc::now());

        let (transport, mut events) =
            match StreamingTransport::connect(&self.config.streaming_url).await {
                Ok(pair) => pair,
                Err(e) => {
                    self.settle_failure(&e);
                    return Err(e);
                }
            };

        // The first event is Ready; anything else means the backend went
        // away before accepting us.
        match events.recv().await {
            Some(TransportEvent::Ready) => {}
            _ => {
                let e = DictationError::ConnectFailed(
                    "backend closed before becoming ready".to_string(),
                );
                transport.close().await;
                self.settle_failure(&e);
                return Err(e);
            }
        }

        let chunk_rx = {
            let mut capture = self.capture.lock().await;
            match capture.open(&self.config.profile).await {
                Ok(rx) => rx,
                Err(e) => {
                    transport.close().await;
                    self.settle_failure(&e);
                    return Err(e);
                }
            }
        };

        transition(
            &self.status_tx,
            SessionState::Capturing,
            StatusCode::Listening,
            "Listening... speak now",
        );

        let stop = Arc::new(Notify::new());
        let driver = tokio::spawn(drive_session(
            self.status_tx.clone(),
            Arc::clone(&self.transcript),
            Arc::clone(&self.capture),
            transport,
            events,
            chunk_rx,
            self.config.grace_period,
            Arc::clone(&stop),
        ));

        *self.driver.lock().await = Some((driver, stop));

        Ok(())
    }

    /// Stop the running session. Idempotent; only the first call acts.
    ///
    /// Capture halts immediately; the transport stays open for the grace
    /// period so fragments for the final chunks can still land. Returns
    /// once cleanup is complete and the state is back to `Idle`.
    pub async fn stop(&self) {
        let taken = self.driver.lock().await.take();

        let Some((task, stop)) = taken else {
            debug!("stop ignored: no active session");
            return;
        };

        stop.notify_one();

        if let Err(e) = task.await {
            error!("Session driver task panicked: {}", e);
        }
    }

    fn settle_failure(&self, err: &DictationError) {
        let code = StatusCode::from_error(err);
        let message = err.to_string();
        transition(&self.status_tx, SessionState::Stopping, code, &message);
        transition(&self.status_tx, SessionState::Idle, code, &message);
    }
}

fn transition(
    status_tx: &watch::Sender<SessionStatus>,
    state: SessionState,
    code: StatusCode,
    message: &str,
) {
    info!("Session state: {:?} ({})", state, message);
    status_tx.send_replace(SessionStatus {
        state,
        code,
        message: message.to_string(),
    });
}

enum Outcome {
    /// Cooperative stop requested by the caller
    Stopped,
    /// Transport failed or closed underneath us
    Lost(DictationError),
}

/// The single coordinator for one active session: forwards capture chunks
/// to the transport, appends incoming fragments to the transcript, and runs
/// the teardown sequence when stopped or when the transport dies.
#[allow(clippy::too_many_arguments)]
async fn drive_session(
    status_tx: watch::Sender<SessionStatus>,
    transcript: Arc<Mutex<TranscriptAssembler>>,
    capture: Arc<Mutex<Box<dyn AudioCapture>>>,
    transport: StreamingTransport,
    mut events: mpsc::Receiver<TransportEvent>,
    mut chunks: mpsc::Receiver<AudioChunk>,
    grace_period: Duration,
    stop: Arc<Notify>,
) {
    let mut chunks_open = true;

    let outcome = loop {
        tokio::select! {
            _ = stop.notified() => break Outcome::Stopped,

            chunk = chunks.recv(), if chunks_open => match chunk {
                Some(chunk) => transport.send(chunk),
                None => chunks_open = false,
            },

            event = events.recv() => match event {
                Some(TransportEvent::Fragment(text)) => {
                    let mut assembler = transcript.lock().await;
                    if assembler.append(&text) {
                        debug!(
                            "Appended fragment ({} total)",
                            assembler.fragment_count()
                        );
                    }
                }
                Some(TransportEvent::Error(e)) => break Outcome::Lost(e),
                Some(TransportEvent::Closed) | None => {
                    break Outcome::Lost(DictationError::ConnectionLost(
                        "backend closed the connection".to_string(),
                    ))
                }
                Some(TransportEvent::Ready) => {}
            },
        }
    };

    match outcome {
        Outcome::Stopped => {
            transition(
                &status_tx,
                SessionState::Stopping,
                StatusCode::Finalizing,
                "Finalizing transcription",
            );

            // Capture stops immediately; trailing chunks already cut are
            // still forwarded below.
            close_capture(&capture).await;

            // Grace period: fragment delivery lags chunk transmission, so
            // closing the socket right away would drop the transcription of
            // the final chunks.
            let deadline = tokio::time::Instant::now() + grace_period;
            loop {
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => break,

                    chunk = chunks.recv(), if chunks_open => match chunk {
                        Some(chunk) => transport.send(chunk),
                        None => chunks_open = false,
                    },

                    event = events.recv() => match event {
                        Some(TransportEvent::Fragment(text)) => {
                            transcript.lock().await.append(&text);
                        }
                        Some(TransportEvent::Ready) => {}
                        Some(_) | None => break,
                    },
                }
            }

            transport.close().await;

            transition(
                &status_tx,
                SessionState::Idle,
                StatusCode::Stopped,
                "Recording stopped",
            );
        }

        Outcome::Lost(e) => {
            let code = StatusCode::from_error(&e);
            let message = e.to_string();
            transition(&status_tx, SessionState::Stopping, code, &message);

            close_capture(&capture).await;
            transport.close().await;

            transition(&status_tx, SessionState::Idle, code, &message);
        }
    }
}

async fn close_capture(capture: &Arc<Mutex<Box<dyn AudioCapture>>>) {
    let mut capture = capture.lock().await;
    if let Err(e) = capture.close().await {
        error!("Failed to close capture device: {}", e);
    }
}
