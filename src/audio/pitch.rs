//! Pitch-shift stage inserted after the rate stage
//!
//! A second signalsmith stretcher running 1:1 (no time change) with a
//! transpose factor, mixed against the dry signal. Wet changes ramp across
//! one block so engaging or bypassing the stage never clicks.

use std::sync::{Arc, Mutex};

use signalsmith_stretch::Stretch;

use super::playback::PlaybackState;
use super::lock_state;
use crate::transport::device::PitchEffect;

pub(crate) struct PitchStage {
    pub(crate) id: u64,
    stretch: Stretch,
    channels: usize,
    semitones: f32,
    wet: f32,
    target_wet: f32,
    dry: Vec<f32>,
    shifted: Vec<f32>,
}

impl PitchStage {
    pub(crate) fn new(id: u64, channels: usize, sample_rate: u32) -> Self {
        Self {
            id,
            stretch: Stretch::preset_default(channels as u32, sample_rate),
            channels: channels.max(1),
            semitones: 0.0,
            wet: 0.0,
            target_wet: 0.0,
            dry: Vec::new(),
            shifted: Vec::new(),
        }
    }

    pub(crate) fn set_semitones(&mut self, semitones: f32) {
        if semitones != self.semitones {
            self.semitones = semitones;
            self.stretch.set_transpose_factor_semitones(semitones, None);
        }
    }

    pub(crate) fn set_wet(&mut self, wet: f32) {
        self.target_wet = wet.clamp(0.0, 1.0);
    }

    /// Drop buffered audio (after a seek)
    pub(crate) fn reset(&mut self) {
        self.stretch.reset();
    }

    /// Process one interleaved block in place.
    pub(crate) fn process(&mut self, block: &mut [f32]) {
        if self.wet == 0.0 && self.target_wet == 0.0 {
            return;
        }
        if self.wet == 0.0 {
            // Coming out of bypass: nothing stale in the stretcher
            self.stretch.reset();
        }
        self.dry.clear();
        self.dry.extend_from_slice(block);
        self.shifted.resize(block.len(), 0.0);
        self.stretch.process(&self.dry[..], &mut self.shifted[..]);
        mix_ramp(&self.dry, &self.shifted, block, self.channels, self.wet, self.target_wet);
        self.wet = self.target_wet;
    }
}

/// `out = dry * (1 - w) + wet * w`, with `w` ramping linearly from `from`
/// to `to` across the block.
pub(crate) fn mix_ramp(dry: &[f32], wet: &[f32], out: &mut [f32], channels: usize, from: f32, to: f32) {
    let channels = channels.max(1);
    let frames = out.len() / channels;
    if frames == 0 {
        return;
    }
    for f in 0..frames {
        let w = from + (to - from) * (f + 1) as f32 / frames as f32;
        for c in 0..channels {
            let i = f * channels + c;
            out[i] = dry[i] * (1.0 - w) + wet[i] * w;
        }
    }
}

/// Handle the transport holds for the inserted stage
pub struct CpalPitchEffect {
    pub(crate) state: Arc<Mutex<PlaybackState>>,
    pub(crate) id: u64,
}

impl CpalPitchEffect {
    fn with_stage(&self, f: impl FnOnce(&mut PitchStage)) {
        let mut state = lock_state(&self.state);
        if let Some(stage) = state.pitch.as_mut().filter(|s| s.id == self.id) {
            f(stage);
        }
    }
}

impl PitchEffect for CpalPitchEffect {
    fn set_semitones(&mut self, semitones: f64) {
        self.with_stage(|stage| stage.set_semitones(semitones as f32));
    }

    fn set_wet(&mut self, wet: f64) {
        self.with_stage(|stage| stage.set_wet(wet as f32));
    }

    fn dispose(&mut self) {
        let mut state = lock_state(&self.state);
        if state.pitch.as_ref().is_some_and(|s| s.id == self.id) {
            state.pitch = None;
            log::debug!("pitch stage {} removed", self.id);
        }
    }
}
