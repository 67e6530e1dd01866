//! Tempo and pitch
//!
//! Two independent knobs. Tempo always maps straight onto the device rate.
//! Pitch needs an effect the device may or may not be able to build, so it
//! is attached lazily the first time pitch leaves zero and then kept around,
//! muted, for the rest of the track.

use crate::transport::device::{PitchEffect, PlaybackDevice};

pub const MIN_TEMPO_PERCENT: f64 = 50.0;
pub const MAX_TEMPO_PERCENT: f64 = 200.0;
pub const DEFAULT_TEMPO_PERCENT: f64 = 100.0;

pub const MIN_PITCH_SEMITONES: f64 = -12.0;
pub const MAX_PITCH_SEMITONES: f64 = 12.0;

/// Step of the tempo +/- buttons
pub const TEMPO_STEP: f64 = 1.0;

/// Step of the pitch +/- buttons
pub const PITCH_STEP: f64 = 0.1;

/// Speed presets offered in settings, as multiples of normal speed
pub const TEMPO_PRESETS: [f64; 6] = [0.5, 0.75, 1.0, 1.25, 1.5, 2.0];

/// Observable state of the pitch effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PitchEffectState {
    /// Never built, disposed, or construction failed
    Unattached,
    /// Attached with wet = 0
    Muted,
    /// Attached with wet = 1
    Active,
}

enum EffectSlot {
    Unattached { failed: bool },
    Attached(Box<dyn PitchEffect>),
}

pub struct DspController {
    tempo_percent: f64,
    pitch_semitones: f64,
    slot: EffectSlot,
}

impl Default for DspController {
    fn default() -> Self {
        Self::new()
    }
}

impl DspController {
    pub fn new() -> Self {
        Self {
            tempo_percent: DEFAULT_TEMPO_PERCENT,
            pitch_semitones: 0.0,
            slot: EffectSlot::Unattached { failed: false },
        }
    }

    pub fn tempo_percent(&self) -> f64 {
        self.tempo_percent
    }

    pub fn pitch_semitones(&self) -> f64 {
        self.pitch_semitones
    }

    /// Device playback rate implied by the tempo knob
    pub fn playback_rate(&self) -> f64 {
        self.tempo_percent / 100.0
    }

    pub fn effect_state(&self) -> PitchEffectState {
        match self.slot {
            EffectSlot::Unattached { .. } => PitchEffectState::Unattached,
            EffectSlot::Attached(_) if self.pitch_semitones == 0.0 => PitchEffectState::Muted,
            EffectSlot::Attached(_) => PitchEffectState::Active,
        }
    }

    /// Whether the last attach attempt failed and is waiting for `repair`
    pub fn effect_failed(&self) -> bool {
        matches!(self.slot, EffectSlot::Unattached { failed: true })
    }

    fn engaged(&self) -> bool {
        self.pitch_semitones != 0.0 && matches!(self.slot, EffectSlot::Attached(_))
    }

    pub fn set_tempo(&mut self, percent: f64, device: &mut dyn PlaybackDevice) {
        if percent.is_nan() {
            return;
        }
        self.tempo_percent = percent.clamp(MIN_TEMPO_PERCENT, MAX_TEMPO_PERCENT);
        device.set_playback_rate(self.playback_rate());
        device.set_preserves_pitch(!self.engaged());
    }

    pub fn nudge_tempo(&mut self, steps: f64, device: &mut dyn PlaybackDevice) {
        self.set_tempo(self.tempo_percent + steps * TEMPO_STEP, device);
    }

    pub fn set_pitch(&mut self, semitones: f64, device: &mut dyn PlaybackDevice) {
        if semitones.is_nan() {
            return;
        }
        // Round away float drift from repeated 0.1 steps so "back to zero" really is zero
        let semitones = (semitones * 100.0).round() / 100.0;
        self.pitch_semitones = semitones.clamp(MIN_PITCH_SEMITONES, MAX_PITCH_SEMITONES);
        if self.pitch_semitones != 0.0 {
            self.ensure_attached(device);
        }
        self.apply_pitch(device);
    }

    pub fn nudge_pitch(&mut self, steps: f64, device: &mut dyn PlaybackDevice) {
        self.set_pitch(self.pitch_semitones + steps * PITCH_STEP, device);
    }

    /// Tempo 100, pitch 0. Loop and seek state are untouched.
    pub fn reset_defaults(&mut self, device: &mut dyn PlaybackDevice) {
        self.set_tempo(DEFAULT_TEMPO_PERCENT, device);
        self.set_pitch(0.0, device);
    }

    /// Retry a failed effect construction ("repair audio").
    pub fn repair(&mut self, device: &mut dyn PlaybackDevice) {
        if !self.effect_failed() {
            return;
        }
        log::info!("repair: retrying pitch effect construction");
        self.slot = EffectSlot::Unattached { failed: false };
        if self.pitch_semitones != 0.0 {
            self.ensure_attached(device);
            self.apply_pitch(device);
        }
    }

    /// Detach the effect. Safe to call any number of times.
    pub fn dispose(&mut self) {
        let slot = std::mem::replace(&mut self.slot, EffectSlot::Unattached { failed: false });
        if let EffectSlot::Attached(mut effect) = slot {
            effect.dispose();
            log::debug!("dispose: pitch effect detached");
        }
    }

    /// Dispose the effect and put both knobs back to defaults for a new track.
    pub fn reset_for_track(&mut self, device: &mut dyn PlaybackDevice) {
        self.dispose();
        self.tempo_percent = DEFAULT_TEMPO_PERCENT;
        self.pitch_semitones = 0.0;
        device.set_playback_rate(self.playback_rate());
        device.set_preserves_pitch(true);
    }

    fn ensure_attached(&mut self, device: &mut dyn PlaybackDevice) {
        if !matches!(self.slot, EffectSlot::Unattached { failed: false }) {
            return;
        }
        match device.create_pitch_effect() {
            Ok(effect) => {
                log::debug!("set_pitch: pitch effect attached");
                self.slot = EffectSlot::Attached(effect);
            }
            Err(e) => {
                log::warn!("set_pitch: {}, playing unprocessed audio", e);
                if let Err(e) = device.connect_direct() {
                    log::error!("set_pitch: fallback connection failed: {}", e);
                }
                self.slot = EffectSlot::Unattached { failed: true };
            }
        }
    }

    fn apply_pitch(&mut self, device: &mut dyn PlaybackDevice) {
        let semitones = self.pitch_semitones;
        let EffectSlot::Attached(effect) = &mut self.slot else {
            return;
        };
        let engaged = semitones != 0.0;
        effect.set_semitones(semitones);
        effect.set_wet(if engaged { 1.0 } else { 0.0 });
        device.set_preserves_pitch(!engaged);
        if let Err(e) = device.resume_context() {
            log::warn!("set_pitch: could not resume output: {}", e);
        }
    }
}
