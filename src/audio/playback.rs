//! State shared between the UI thread and the cpal callback

use crossbeam_channel::Sender;
use signalsmith_stretch::Stretch;

use super::pitch::PitchStage;
use crate::transport::device::DeviceEvent;

/// Source time between two time reports, seconds
pub(crate) const REPORT_INTERVAL_SECS: f64 = 0.25;

/// Device event stamped with the load generation and seek epoch it was
/// produced under
#[derive(Debug, Clone)]
pub(crate) struct Stamped {
    pub generation: u64,
    pub seek_epoch: u64,
    pub event: DeviceEvent,
}

impl Stamped {
    /// Whether this event still describes the current source and position
    pub(crate) fn is_current(&self, generation: u64, seek_epoch: u64) -> bool {
        if self.generation != generation {
            return false;
        }
        match self.event {
            DeviceEvent::TimeUpdate(_) | DeviceEvent::Ended => self.seek_epoch >= seek_epoch,
            _ => true,
        }
    }
}

pub(crate) struct PlaybackState {
    pub pcm: Vec<f32>,
    pub source_rate: u32,
    pub source_channels: usize,
    /// Read position in source frames
    pub cursor: f64,
    pub playing: bool,
    pub ended: bool,
    pub rate: f64,
    pub preserves_pitch: bool,
    pub pitch: Option<PitchStage>,
    pub generation: u64,
    pub seek_epoch: u64,
    /// Stretchers must drop buffered audio before the next block
    pub reset_pending: bool,
    last_report: f64,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            pcm: Vec::new(),
            source_rate: 44100,
            source_channels: 2,
            cursor: 0.0,
            playing: false,
            ended: false,
            rate: 1.0,
            preserves_pitch: true,
            pitch: None,
            generation: 0,
            seek_epoch: 0,
            reset_pending: false,
            last_report: 0.0,
        }
    }
}

/// Per-stream resources owned by the output callback
pub(crate) struct StreamState {
    pub stretch: Stretch,
    pub channels: usize,
    pub sample_rate: u32,
    input: Vec<f32>,
    events: Sender<Stamped>,
}

impl StreamState {
    pub(crate) fn new(channels: usize, sample_rate: u32, events: Sender<Stamped>) -> Self {
        Self {
            stretch: Stretch::preset_default(channels as u32, sample_rate),
            channels: channels.max(1),
            sample_rate,
            input: Vec::new(),
            events,
        }
    }
}

impl PlaybackState {
    pub(crate) fn frames(&self) -> usize {
        if self.source_channels == 0 {
            0
        } else {
            self.pcm.len() / self.source_channels
        }
    }

    pub(crate) fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.source_rate.max(1))
    }

    pub(crate) fn current_time(&self) -> f64 {
        self.cursor / f64::from(self.source_rate.max(1))
    }

    /// Replace the source, keeping any position set while it was loading.
    pub(crate) fn install(&mut self, pcm: Vec<f32>, sample_rate: u32, channels: usize) {
        let seconds = self.current_time();
        self.pcm = pcm;
        self.source_rate = sample_rate.max(1);
        self.source_channels = channels.max(1);
        self.cursor = (seconds * f64::from(self.source_rate))
            .floor()
            .min(self.frames() as f64);
        self.last_report = self.cursor;
        self.reset_pending = true;
    }

    /// Forget the source; a new generation makes queued events stale.
    pub(crate) fn clear_source(&mut self) {
        self.pcm.clear();
        self.cursor = 0.0;
        self.last_report = 0.0;
        self.playing = false;
        self.ended = false;
        self.generation += 1;
        self.reset_pending = true;
    }

    pub(crate) fn seek(&mut self, seconds: f64) {
        let target = (seconds.max(0.0) * f64::from(self.source_rate)).floor();
        self.cursor = if self.pcm.is_empty() {
            target
        } else {
            target.min(self.frames() as f64)
        };
        self.last_report = self.cursor;
        self.ended = false;
        self.seek_epoch += 1;
        self.reset_pending = true;
    }

    fn send(&self, stream: &StreamState, event: DeviceEvent) {
        // The receiver only disappears when the device is dropped
        let _ = stream.events.send(Stamped {
            generation: self.generation,
            seek_epoch: self.seek_epoch,
            event,
        });
    }

    fn finish(&mut self, stream: &StreamState) {
        if self.ended {
            return;
        }
        self.ended = true;
        self.playing = false;
        self.send(stream, DeviceEvent::TimeUpdate(self.duration_secs()));
        self.send(stream, DeviceEvent::Ended);
    }

    /// Fill one interleaved output block.
    pub(crate) fn render(&mut self, out: &mut [f32], stream: &mut StreamState) {
        out.fill(0.0);
        if self.reset_pending {
            stream.stretch.reset();
            if let Some(pitch) = self.pitch.as_mut() {
                pitch.reset();
            }
            self.reset_pending = false;
        }

        let channels = stream.channels;
        let frames_out = out.len() / channels;
        if !self.playing || self.pcm.is_empty() || frames_out == 0 {
            return;
        }

        let total = self.frames();
        let start = self.cursor as usize;
        if start >= total {
            self.finish(stream);
            return;
        }

        // Source frames consumed per output frame
        let step = self.rate * f64::from(self.source_rate) / f64::from(stream.sample_rate.max(1));
        let wanted = ((frames_out as f64 * step).round() as usize).max(1);
        let n_in = wanted.min(total - start);
        let n_out = if n_in < wanted {
            ((n_in as f64 / step).floor() as usize).clamp(1, frames_out)
        } else {
            frames_out
        };

        let src_channels = self.source_channels;
        stream.input.clear();
        for f in 0..n_in {
            let base = (start + f) * src_channels;
            for c in 0..channels {
                stream.input.push(self.pcm[base + c.min(src_channels - 1)]);
            }
        }

        // Resampling keeps real-world pitch; without preservation the rate
        // also transposes, like a tape
        let mut transpose = f64::from(self.source_rate) / f64::from(stream.sample_rate.max(1));
        if !self.preserves_pitch {
            transpose *= self.rate;
        }
        stream.stretch.set_transpose_factor(transpose as f32, None);
        let block = &mut out[..n_out * channels];
        stream.stretch.process(&stream.input[..], &mut block[..]);

        if let Some(pitch) = self.pitch.as_mut() {
            pitch.process(block);
        }

        self.cursor += n_in as f64;
        let interval = REPORT_INTERVAL_SECS * f64::from(self.source_rate);
        if self.cursor - self.last_report >= interval {
            self.last_report = self.cursor;
            self.send(stream, DeviceEvent::TimeUpdate(self.current_time()));
        }
        if self.cursor as usize >= total {
            self.finish(stream);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn stream(rate: u32) -> (StreamState, crossbeam_channel::Receiver<Stamped>) {
        let (tx, rx) = unbounded();
        (StreamState::new(2, rate, tx), rx)
    }

    fn loaded(seconds: usize, rate: u32) -> PlaybackState {
        let mut state = PlaybackState::default();
        state.install(vec![0.1; seconds * rate as usize * 2], rate, 2);
        state
    }

    #[test]
    fn test_paused_renders_silence() {
        let (mut st, rx) = stream(48000);
        let mut state = loaded(1, 48000);
        let mut out = vec![1.0f32; 512];
        state.render(&mut out, &mut st);
        assert!(out.iter().all(|&x| x == 0.0));
        assert_eq!(state.cursor, 0.0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_cursor_follows_rate() {
        let (mut st, _rx) = stream(48000);
        let mut state = loaded(2, 48000);
        state.playing = true;
        state.rate = 1.5;
        let mut out = vec![0.0f32; 512 * 2];
        state.render(&mut out, &mut st);
        assert_eq!(state.cursor, 768.0);
    }

    #[test]
    fn test_resampling_consumes_source_frames() {
        let (mut st, _rx) = stream(48000);
        let mut state = loaded(2, 24000);
        state.playing = true;
        let mut out = vec![0.0f32; 480 * 2];
        state.render(&mut out, &mut st);
        assert_eq!(state.cursor, 240.0);
    }

    #[test]
    fn test_end_of_data_reports_once() {
        let (mut st, rx) = stream(8000);
        let mut state = loaded(1, 8000);
        state.playing = true;
        state.seek(0.99);
        let mut out = vec![0.0f32; 256 * 2];
        state.render(&mut out, &mut st);
        state.render(&mut out, &mut st);
        let events: Vec<_> = rx.try_iter().map(|s| s.event).collect();
        assert_eq!(events.iter().filter(|e| **e == DeviceEvent::Ended).count(), 1);
        assert!(!state.playing);
        assert!(state.ended);
    }

    #[test]
    fn test_time_updates_are_throttled() {
        let (mut st, rx) = stream(8000);
        let mut state = loaded(4, 8000);
        state.playing = true;
        let mut out = vec![0.0f32; 400 * 2];
        // 10 blocks of 50 ms
        for _ in 0..10 {
            state.render(&mut out, &mut st);
        }
        let updates = rx
            .try_iter()
            .filter(|s| matches!(s.event, DeviceEvent::TimeUpdate(_)))
            .count();
        assert_eq!(updates, 2);
    }

    #[test]
    fn test_seek_while_loading_survives_install() {
        let mut state = PlaybackState::default();
        state.clear_source();
        state.seek(1.5);
        state.install(vec![0.0; 8000 * 2 * 3], 8000, 2);
        assert!((state.current_time() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_stale_events_are_filtered() {
        let stale_time = Stamped { generation: 1, seek_epoch: 0, event: DeviceEvent::TimeUpdate(3.0) };
        let fresh_time = Stamped { generation: 1, seek_epoch: 1, event: DeviceEvent::TimeUpdate(9.0) };
        let old_track = Stamped {
            generation: 0,
            seek_epoch: 1,
            event: DeviceEvent::MetadataLoaded { duration: 1.0, peaks: None },
        };
        let metadata = Stamped {
            generation: 1,
            seek_epoch: 0,
            event: DeviceEvent::MetadataLoaded { duration: 1.0, peaks: None },
        };
        assert!(!stale_time.is_current(1, 1));
        assert!(fresh_time.is_current(1, 1));
        assert!(!old_track.is_current(1, 1));
        assert!(metadata.is_current(1, 1));
    }
}
