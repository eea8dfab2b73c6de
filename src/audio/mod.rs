pub mod capture;
pub mod microphone;

pub use capture::{environment_check, AudioCapture, AudioChunk, CaptureProfile};
pub use microphone::MicrophoneCapture;
