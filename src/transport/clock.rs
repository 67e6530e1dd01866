//! Playback clock
//!
//! Single source of truth for "where are we in the track". The device clock
//! is authoritative; a scrub preview overrides it for display while a drag
//! is in progress.

/// Outcome of feeding a device time report into the clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeUpdate {
    /// Position followed the device
    Advanced,
    /// Loop end reached; the device must be sent back to `to`
    Wrapped { to: f64 },
    /// Report ignored (NaN or infinite)
    Ignored,
}

#[derive(Debug, Clone, Default)]
pub struct PlaybackClock {
    position: f64,
    duration: f64,
    scrub: Option<f64>,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Effective time: the scrub preview while dragging, else the device time
    pub fn read(&self) -> f64 {
        self.scrub.unwrap_or(self.position)
    }

    /// Last device-reported (or seeked) position, ignoring any scrub
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Track duration, 0 while metadata is unknown
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn has_duration(&self) -> bool {
        self.duration > 0.0
    }

    pub fn scrub(&self) -> Option<f64> {
        self.scrub
    }

    pub fn is_scrubbing(&self) -> bool {
        self.scrub.is_some()
    }

    /// Fraction of the track played, 0 when the duration is unknown
    pub fn progress(&self) -> f64 {
        if self.has_duration() {
            (self.read() / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.duration = if duration.is_finite() && duration > 0.0 {
            duration
        } else {
            0.0
        };
    }

    /// Feed a device time report.
    ///
    /// `active_loop` is the armed loop region, if any. Reaching or passing B
    /// snaps the position to A in the same tick so the play-head never shows
    /// past B.
    pub fn on_device_time_update(&mut self, t: f64, active_loop: Option<(f64, f64)>) -> TimeUpdate {
        if !t.is_finite() {
            return TimeUpdate::Ignored;
        }
        if let Some((a, b)) = active_loop {
            if t >= b {
                self.position = a;
                return TimeUpdate::Wrapped { to: a };
            }
        }
        self.position = t.max(0.0);
        TimeUpdate::Advanced
    }

    /// Clamp `target` into the track. Without a known duration only the lower
    /// bound applies.
    pub fn clamp_to_track(&self, target: f64) -> f64 {
        let upper = if self.has_duration() { self.duration } else { f64::INFINITY };
        target.clamp(0.0, upper)
    }

    /// Move the position to `target` (clamped) without waiting for the device.
    ///
    /// Returns the clamped target to write through to the device, or `None`
    /// for a NaN target.
    pub fn seek(&mut self, target: f64) -> Option<f64> {
        if target.is_nan() {
            return None;
        }
        let clamped = self.clamp_to_track(target);
        self.position = clamped;
        Some(clamped)
    }

    pub(crate) fn set_scrub(&mut self, value: f64) {
        self.scrub = Some(self.clamp_to_track(value));
    }

    pub(crate) fn take_scrub(&mut self) -> Option<f64> {
        self.scrub.take()
    }

    pub(crate) fn clear_scrub(&mut self) {
        self.scrub = None;
    }

    /// Forget everything about the previous track
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock_with_duration(d: f64) -> PlaybackClock {
        let mut clock = PlaybackClock::new();
        clock.set_duration(d);
        clock
    }

    #[test]
    fn test_read_follows_device_without_scrub() {
        let mut clock = clock_with_duration(60.0);
        assert_eq!(clock.on_device_time_update(12.5, None), TimeUpdate::Advanced);
        assert_eq!(clock.read(), 12.5);
    }

    #[test]
    fn test_scrub_overrides_read() {
        let mut clock = clock_with_duration(60.0);
        clock.on_device_time_update(10.0, None);
        clock.set_scrub(30.0);
        clock.on_device_time_update(10.3, None);
        assert_eq!(clock.read(), 30.0);
        assert_eq!(clock.position(), 10.3);
        assert_eq!(clock.take_scrub(), Some(30.0));
        assert_eq!(clock.read(), 10.3);
    }

    #[test]
    fn test_loop_wraparound_snaps_in_same_tick() {
        let mut clock = clock_with_duration(60.0);
        let update = clock.on_device_time_update(20.01, Some((5.0, 20.0)));
        assert_eq!(update, TimeUpdate::Wrapped { to: 5.0 });
        assert!(clock.read() <= 5.0 + 1e-9);
    }

    #[test]
    fn test_wraparound_never_overshoots_for_any_report() {
        let (a, b) = (3.0, 9.0);
        let mut t = 0.0;
        while t < 30.0 {
            let mut clock = clock_with_duration(60.0);
            clock.on_device_time_update(t, Some((a, b)));
            if t >= b {
                assert!(clock.read() <= a + 1e-9, "overshoot at {t}");
            }
            t += 0.37;
        }
    }

    #[test]
    fn test_seek_round_trip_is_immediate() {
        let mut clock = clock_with_duration(100.0);
        assert_eq!(clock.seek(42.0), Some(42.0));
        assert_eq!(clock.read(), 42.0);
    }

    #[test]
    fn test_seek_clamps_silently() {
        let mut clock = clock_with_duration(100.0);
        assert_eq!(clock.seek(250.0), Some(100.0));
        assert_eq!(clock.seek(-4.0), Some(0.0));
        assert_eq!(clock.seek(f64::NAN), None);
        assert_eq!(clock.read(), 0.0);
    }

    #[test]
    fn test_seek_without_duration_only_clamps_lower_bound() {
        let mut clock = PlaybackClock::new();
        assert_eq!(clock.seek(75.0), Some(75.0));
        assert_eq!(clock.seek(-1.0), Some(0.0));
    }

    #[test]
    fn test_progress_guards_unknown_duration() {
        let mut clock = PlaybackClock::new();
        clock.on_device_time_update(15.0, None);
        assert_eq!(clock.progress(), 0.0);
        clock.set_duration(60.0);
        assert!((clock.progress() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_bad_duration_reads_as_unknown() {
        let mut clock = PlaybackClock::new();
        clock.set_duration(f64::NAN);
        assert!(!clock.has_duration());
        clock.set_duration(f64::INFINITY);
        assert_eq!(clock.duration(), 0.0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut clock = clock_with_duration(60.0);
        clock.on_device_time_update(20.0, None);
        clock.set_scrub(12.0);
        clock.reset();
        assert_eq!(clock.position(), 0.0);
        assert_eq!(clock.duration(), 0.0);
        assert_eq!(clock.scrub(), None);
    }
}
