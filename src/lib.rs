pub mod audio;
pub mod batch;
pub mod config;
pub mod error;
pub mod session;
pub mod transcript;
pub mod transport;

pub use audio::{environment_check, AudioCapture, AudioChunk, CaptureProfile, MicrophoneCapture};
pub use batch::BatchClient;
pub use config::Config;
pub use error::DictationError;
pub use session::{
    SessionConfig, SessionController, SessionState, SessionStats, SessionStatus, StatusCode,
};
pub use transcript::{clean_fragment, TranscriptAssembler};
pub use transport::{StreamingTransport, TransportEvent};
