//! Boundary between the transport core and the playback primitive
//!
//! The transport never touches audio samples. It drives a `PlaybackDevice`
//! (decode + output + rate stage) and, when pitch is shifted, a `PitchEffect`
//! that the device constructs on request.

use crate::error::{DeviceResult, EffectError};

/// Notifications the device posts asynchronously
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// Source decoded; duration known. `peaks` are per-bucket absolute peaks
    /// of the decoded audio when the device computed them.
    MetadataLoaded {
        duration: f64,
        peaks: Option<Vec<f32>>,
    },
    /// Periodic playback clock report, in seconds
    TimeUpdate(f64),
    /// Playback reached the end of the source
    Ended,
    /// Asynchronous failure (decode error, stream error)
    Error(String),
}

/// The underlying decode/output device
pub trait PlaybackDevice {
    /// Start loading a new source. Metadata arrives later as an event.
    fn load(&mut self, source_url: &str) -> DeviceResult<()>;

    /// Drop the current source and stop output.
    fn unload(&mut self);

    /// Device clock in seconds. Reflects `seek` immediately.
    fn current_time(&self) -> f64;

    fn seek(&mut self, seconds: f64);

    fn play(&mut self) -> DeviceResult<()>;

    fn pause(&mut self);

    /// Make sure the output context is running before `play`.
    fn resume_context(&mut self) -> DeviceResult<()>;

    fn set_playback_rate(&mut self, rate: f64);

    /// Native pitch preservation during rate changes
    fn set_preserves_pitch(&mut self, preserve: bool);

    /// Construct a pitch-shift effect and insert it after the source.
    fn create_pitch_effect(&mut self) -> Result<Box<dyn PitchEffect>, EffectError>;

    /// Wire the source straight to the output, bypassing any effect.
    fn connect_direct(&mut self) -> DeviceResult<()>;

    /// Take all events posted since the last call.
    fn drain_events(&mut self) -> Vec<DeviceEvent>;
}

/// Handle to an inserted pitch-shift effect
pub trait PitchEffect {
    fn set_semitones(&mut self, semitones: f64);

    /// 0.0 = dry only (bypassed), 1.0 = fully processed
    fn set_wet(&mut self, wet: f64);

    /// Remove the effect from the graph. Must tolerate repeated calls.
    fn dispose(&mut self);
}
