//! Sleep timer: pause playback after a countdown

use std::time::Duration;

const TICK: Duration = Duration::from_secs(1);

/// Countdown presets in minutes
pub const PRESET_MINUTES: [u32; 8] = [5, 10, 15, 30, 45, 60, 90, 120];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepTick {
    /// Timer unset or not ticking
    Idle,
    /// Seconds left after this tick
    Counting(u32),
    /// Countdown finished and the timer cleared itself
    Expired { pause_requested: bool },
}

#[derive(Debug, Clone, Default)]
pub struct SleepTimer {
    remaining: Option<u32>,
    /// Time accumulated toward the next whole-second tick
    elapsed: Duration,
}

impl SleepTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remaining(&self) -> Option<u32> {
        self.remaining
    }

    pub fn is_active(&self) -> bool {
        matches!(self.remaining, Some(r) if r > 0)
    }

    /// Start a countdown of `seconds`. Zero clears the timer.
    pub fn set_seconds(&mut self, seconds: u32) {
        self.elapsed = Duration::ZERO;
        self.remaining = (seconds > 0).then_some(seconds);
    }

    pub fn set_minutes(&mut self, minutes: u32) {
        self.set_seconds(minutes.saturating_mul(60));
    }

    pub fn set_hours_minutes(&mut self, hours: u32, minutes: u32) {
        self.set_seconds(hours.saturating_mul(3600).saturating_add(minutes.saturating_mul(60)));
    }

    /// Stop the countdown. Also drops any partial second so nothing fires later.
    pub fn cancel(&mut self) {
        self.remaining = None;
        self.elapsed = Duration::ZERO;
    }

    /// Advance by wall-clock `dt`, firing one tick per whole second.
    pub fn advance(&mut self, dt: Duration, is_playing: bool) -> SleepTick {
        if !is_playing || !self.is_active() {
            // Interval is not running while paused; a resumed countdown starts a fresh second
            self.elapsed = Duration::ZERO;
            return SleepTick::Idle;
        }
        self.elapsed += dt;
        let mut last = SleepTick::Idle;
        while self.elapsed >= TICK {
            self.elapsed -= TICK;
            last = self.tick(is_playing);
            if let SleepTick::Expired { .. } = last {
                break;
            }
        }
        last
    }

    /// One one-second tick.
    pub fn tick(&mut self, is_playing: bool) -> SleepTick {
        let Some(remaining) = self.remaining else {
            return SleepTick::Idle;
        };
        if !is_playing || remaining == 0 {
            return SleepTick::Idle;
        }
        if remaining <= 1 {
            self.cancel();
            return SleepTick::Expired { pause_requested: is_playing };
        }
        self.remaining = Some(remaining - 1);
        SleepTick::Counting(remaining - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_requests_pause_and_clears() {
        let mut timer = SleepTimer::new();
        timer.set_seconds(1);
        assert_eq!(timer.tick(true), SleepTick::Expired { pause_requested: true });
        assert_eq!(timer.remaining(), None);
    }

    #[test]
    fn test_counts_down_only_while_playing() {
        let mut timer = SleepTimer::new();
        timer.set_seconds(3);
        assert_eq!(timer.tick(false), SleepTick::Idle);
        assert_eq!(timer.tick(true), SleepTick::Counting(2));
        assert_eq!(timer.advance(Duration::from_secs(5), false), SleepTick::Idle);
        assert_eq!(timer.remaining(), Some(2));
    }

    #[test]
    fn test_advance_accumulates_partial_seconds() {
        let mut timer = SleepTimer::new();
        timer.set_seconds(10);
        for _ in 0..2 {
            assert_eq!(timer.advance(Duration::from_millis(400), true), SleepTick::Idle);
        }
        // 1.2 s elapsed => exactly one tick so far
        assert_eq!(timer.advance(Duration::from_millis(400), true), SleepTick::Counting(9));
        assert_eq!(timer.remaining(), Some(9));
        assert_eq!(timer.advance(Duration::from_millis(2900), true), SleepTick::Counting(6));
    }

    #[test]
    fn test_advance_stops_at_expiry() {
        let mut timer = SleepTimer::new();
        timer.set_seconds(2);
        assert_eq!(
            timer.advance(Duration::from_secs(10), true),
            SleepTick::Expired { pause_requested: true }
        );
        assert_eq!(timer.remaining(), None);
        assert_eq!(timer.advance(Duration::from_secs(10), true), SleepTick::Idle);
    }

    #[test]
    fn test_cancel_stops_ticking_immediately() {
        let mut timer = SleepTimer::new();
        timer.set_seconds(5);
        timer.advance(Duration::from_millis(900), true);
        timer.cancel();
        assert_eq!(timer.advance(Duration::from_millis(200), true), SleepTick::Idle);
        assert_eq!(timer.remaining(), None);
    }

    #[test]
    fn test_hours_minutes_entry() {
        let mut timer = SleepTimer::new();
        timer.set_hours_minutes(1, 30);
        assert_eq!(timer.remaining(), Some(5400));
        timer.set_minutes(0);
        assert!(!timer.is_active());
        timer.set_minutes(PRESET_MINUTES[0]);
        assert_eq!(timer.remaining(), Some(300));
    }
}
