//! Streaming transport to the transcription backend
//!
//! A thin websocket session: audio chunks out as binary messages, text
//! fragments in as text messages, lifecycle surfaced on a single event
//! channel. Retry policy belongs to the caller, not here.

mod stream;

pub use stream::{StreamingTransport, TransportEvent};
