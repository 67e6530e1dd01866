//! Error types for the transport core and the native audio device
//!
//! None of these are fatal. Every call site that can hit one recovers locally
//! and logs a diagnostic; they exist so the recovery code can match on cause.

use thiserror::Error;

/// Failures of the underlying playback device
#[derive(Error, Debug)]
pub enum DeviceError {
    /// No output device on this host
    #[error("No audio output device available")]
    NoOutputDevice,

    /// Output device refused to report a usable configuration
    #[error("Failed to get device config: {0}")]
    Config(String),

    /// Failed to build the output stream
    #[error("Failed to build audio stream: {0}")]
    StreamBuild(String),

    /// Failed to start/resume the output stream
    #[error("Failed to start audio stream: {0}")]
    StreamPlay(String),

    /// The audio source could not be opened or decoded
    #[error("Failed to decode {source_url}: {reason}")]
    Decode { source_url: String, reason: String },

    /// Playback was rejected by the device (nothing loaded, blocked output)
    #[error("Playback rejected: {0}")]
    PlaybackRejected(String),
}

/// Failure to construct the pitch-shift effect
#[derive(Error, Debug)]
pub enum EffectError {
    /// The audio graph lacks what the effect needs
    #[error("Pitch effect unsupported: {0}")]
    Unsupported(String),
}

/// Rejected loop-bound edits
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum LoopError {
    /// B was set before A
    #[error("Loop end requires a loop start")]
    MissingStart,

    /// B would not lie after A
    #[error("Loop end {end:.3}s must be after loop start {start:.3}s")]
    EndNotAfterStart { start: f64, end: f64 },

    /// A would not lie before the existing B
    #[error("Loop start {start:.3}s must be before loop end {end:.3}s (clear B first)")]
    StartNotBeforeEnd { start: f64, end: f64 },

    /// Looping needs both bounds
    #[error("Looping needs both A and B set")]
    MissingBounds,

    /// NaN or infinite timestamp
    #[error("Invalid loop time")]
    InvalidTime,
}

/// Bookmark persistence failures
#[derive(Error, Debug)]
pub enum BookmarkError {
    #[error("Bookmark storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bookmark file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for device operations
pub type DeviceResult<T> = Result<T, DeviceError>;
