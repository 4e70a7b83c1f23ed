//! Error taxonomy.
//!
//! Session-scoped failures (`Io`, `MalformedProtocol`) are contained by
//! the reactor: the offending session is closed and the loop continues.
//! Startup-scoped failures (`Storage`, a dead listener set) abort bringup.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HoneypotError {
    /// Caller contract violation. Surfaced, never recovered.
    #[error("invalid argument: {0}")]
    InvalidArg(&'static str),

    /// Listener/session/log capacity exhausted; the arrival is dropped.
    #[error("capacity exhausted: {0}")]
    Capacity(&'static str),

    /// Transient I/O on a single socket; closes that session only.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Persistent storage failure; refuses startup.
    #[error("storage error: {0}")]
    Storage(String),

    /// Record serialization failure.
    #[error("record serialization: {0}")]
    Json(#[from] serde_json::Error),

    /// Handler-local framing violation; the session is closed silently.
    #[error("malformed protocol data")]
    MalformedProtocol,

    /// Output buffer cannot hold the formatted record.
    #[error("output buffer too small")]
    BufferTooSmall,

    /// Configuration change attempted while the reactor is running.
    #[error("honeypot is running")]
    Busy,
}
