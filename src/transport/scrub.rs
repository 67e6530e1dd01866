//! Scrub/seek gestures
//!
//! Dragging the waveform or the progress slider only previews a position
//! (the clock's `scrub` value). The device is touched once, when the gesture
//! ends and the preview is committed as a seek.

use crate::transport::clock::PlaybackClock;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    /// Waveform drag. The waveform scrolls under a fixed play-head, so moving
    /// the pointer left moves time forward.
    Waveform { origin_x: f32, origin_time: f64 },
    /// Range-slider drag
    Slider,
}

/// Window-level release listener, registered only while a gesture is active
///
/// The UI consults `is_armed()` each frame and, while armed, forwards any
/// pointer release anywhere in the window to `ScrubHandler::on_global_release`.
#[derive(Debug, Clone, Default)]
pub struct ReleaseGuard {
    armed: bool,
    registrations: u32,
}

impl ReleaseGuard {
    fn arm(&mut self) {
        if !self.armed {
            self.armed = true;
            self.registrations += 1;
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// How many times the listener was registered
    pub fn registrations(&self) -> u32 {
        self.registrations
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScrubHandler {
    gesture: Option<Gesture>,
    guard: ReleaseGuard,
}

impl ScrubHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.gesture, Some(Gesture::Waveform { .. }))
    }

    pub fn is_active(&self) -> bool {
        self.gesture.is_some()
    }

    pub fn guard(&self) -> &ReleaseGuard {
        &self.guard
    }

    /// Begin a waveform drag at pointer `x`. Ignored until the duration is known.
    pub fn on_drag_start(&mut self, x: f32, clock: &mut PlaybackClock) -> bool {
        if !clock.has_duration() || !x.is_finite() {
            return false;
        }
        let origin_time = clock.read();
        self.gesture = Some(Gesture::Waveform { origin_x: x, origin_time });
        clock.set_scrub(origin_time);
        self.guard.arm();
        true
    }

    /// Update the preview from the horizontal distance dragged so far.
    pub fn on_drag_move(&mut self, x: f32, pixels_per_second: f64, clock: &mut PlaybackClock) {
        let Some(Gesture::Waveform { origin_x, origin_time }) = self.gesture else {
            return;
        };
        if !x.is_finite() || !(pixels_per_second.is_finite() && pixels_per_second > 0.0) {
            return;
        }
        let dx = f64::from(x - origin_x);
        clock.set_scrub(origin_time - dx / pixels_per_second);
    }

    /// End the drag. Returns the position to seek to.
    pub fn on_drag_end(&mut self, clock: &mut PlaybackClock) -> Option<f64> {
        if !self.is_dragging() {
            return None;
        }
        self.finish(clock)
    }

    pub fn on_seek_start(&mut self, clock: &mut PlaybackClock) {
        if self.gesture.is_some() {
            return;
        }
        self.gesture = Some(Gesture::Slider);
        clock.set_scrub(clock.read());
        self.guard.arm();
    }

    /// Preview only; nothing reaches the device until `on_seek_end`.
    pub fn on_seek_change(&mut self, value: f64, clock: &mut PlaybackClock) {
        if value.is_nan() {
            return;
        }
        if self.gesture.is_none() {
            self.on_seek_start(clock);
        }
        if matches!(self.gesture, Some(Gesture::Slider)) {
            clock.set_scrub(value);
        }
    }

    pub fn on_seek_end(&mut self, clock: &mut PlaybackClock) -> Option<f64> {
        if !matches!(self.gesture, Some(Gesture::Slider)) {
            return None;
        }
        self.finish(clock)
    }

    /// Pointer released outside the interactive element. Finalizes whatever
    /// gesture is in flight so it can never stay stuck.
    pub fn on_global_release(&mut self, clock: &mut PlaybackClock) -> Option<f64> {
        if !self.guard.is_armed() {
            return None;
        }
        self.finish(clock)
    }

    /// Drop the gesture without committing (track switch, close).
    pub fn cancel(&mut self, clock: &mut PlaybackClock) {
        self.gesture = None;
        self.guard.disarm();
        clock.clear_scrub();
    }

    fn finish(&mut self, clock: &mut PlaybackClock) -> Option<f64> {
        self.gesture = None;
        self.guard.disarm();
        clock.take_scrub()
    }
}
