//! Dictation session management
//!
//! This module provides the `SessionController` abstraction that manages:
//! - The session state machine (Idle, Connecting, Capturing, Stopping)
//! - Supervision of the capture source and the streaming transport
//! - Transcript assembly from incoming fragments
//! - The grace period between halting capture and closing the transport
//! - Status projection for UI collaborators

mod config;
mod controller;
mod status;

pub use config::SessionConfig;
pub use controller::SessionController;
pub use status::{SessionState, SessionStats, SessionStatus, StatusCode};
