//! Native playback device
//!
//! Decodes a whole file on a background thread (symphonia), plays it through
//! a lazily built cpal output stream, and runs the tempo stage and optional
//! pitch stage with signalsmith-stretch inside the callback.
//!
//! ```text
//! ┌──────────────┐  lock   ┌──────────────────┐  lock   ┌───────────────┐
//! │  UI thread   │────────►│  PlaybackState   │◄────────│ cpal callback │
//! │ (Transport)  │         │ (Arc<Mutex<_>>)  │         │ rate + pitch  │
//! └──────▲───────┘         └────────▲─────────┘         └───────┬───────┘
//!        │ drain_events()           │ install()                 │
//!        │                 ┌────────┴─────────┐                 │
//!        └─────────────────│  decode thread   │◄── crossbeam ───┘
//!          Stamped events  └──────────────────┘     Stamped events
//! ```

pub mod decode;
pub mod pitch;
pub(crate) mod playback;

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::error::{DeviceError, DeviceResult, EffectError};
use crate::transport::device::{DeviceEvent, PitchEffect, PlaybackDevice};
use crate::waveform::{compute_peaks, PEAK_RESOLUTION};

use decode::{decode_file, local_path};
use pitch::{CpalPitchEffect, PitchStage};
use playback::{PlaybackState, Stamped, StreamState};

/// Lock the shared state, recovering it if a panicking thread poisoned it
pub(crate) fn lock_state(state: &Mutex<PlaybackState>) -> MutexGuard<'_, PlaybackState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Output stream plus the format it was opened with
struct OutputStream {
    _stream: cpal::Stream,
    channels: usize,
    sample_rate: u32,
}

pub struct CpalDevice {
    state: Arc<Mutex<PlaybackState>>,
    events_tx: Sender<Stamped>,
    events_rx: Receiver<Stamped>,
    output: Option<OutputStream>,
    next_effect_id: u64,
}

impl Default for CpalDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl CpalDevice {
    /// Create the device. The output stream is opened on first use.
    pub fn new() -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            state: Arc::new(Mutex::new(PlaybackState::default())),
            events_tx,
            events_rx,
            output: None,
            next_effect_id: 1,
        }
    }

    fn ensure_output(&mut self) -> DeviceResult<&OutputStream> {
        if self.output.is_none() {
            self.output = Some(self.open_output()?);
        }
        self.output
            .as_ref()
            .ok_or_else(|| DeviceError::StreamBuild("output stream missing".into()))
    }

    fn open_output(&self) -> DeviceResult<OutputStream> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(DeviceError::NoOutputDevice)?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        log::info!("Using audio device: {}", device_name);

        let config = device
            .default_output_config()
            .map_err(|e| DeviceError::Config(e.to_string()))?
            .config();
        let channels = usize::from(config.channels);
        let sample_rate = config.sample_rate.0;
        log::info!("Audio config: {} channels, {}Hz", channels, sample_rate);

        let state = Arc::clone(&self.state);
        let mut stream_state = StreamState::new(channels, sample_rate, self.events_tx.clone());
        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                    let Ok(mut state) = state.lock() else {
                        data.fill(0.0);
                        return;
                    };
                    state.render(data, &mut stream_state);
                },
                move |err| {
                    log::error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| DeviceError::StreamBuild(e.to_string()))?;

        Ok(OutputStream {
            _stream: stream,
            channels,
            sample_rate,
        })
    }

    fn spawn_decoder(&self, source_url: String, generation: u64) {
        let state = Arc::clone(&self.state);
        let events = self.events_tx.clone();
        thread::spawn(move || {
            let stamp = |event| Stamped {
                generation,
                seek_epoch: 0,
                event,
            };
            match decode_file(local_path(&source_url)) {
                Ok(audio) => {
                    let peaks = compute_peaks(&audio.pcm, PEAK_RESOLUTION);
                    let duration = audio.duration_secs();
                    {
                        let mut state = lock_state(&state);
                        if state.generation != generation {
                            log::debug!("decoder: dropping stale result for {}", source_url);
                            return;
                        }
                        state.install(audio.pcm, audio.sample_rate, audio.channels);
                    }
                    let _ = events.send(stamp(DeviceEvent::MetadataLoaded {
                        duration,
                        peaks: Some(peaks),
                    }));
                }
                Err(e) => {
                    log::error!("decoder: {}", e);
                    let _ = events.send(stamp(DeviceEvent::Error(e.to_string())));
                }
            }
        });
    }
}

impl PlaybackDevice for CpalDevice {
    fn load(&mut self, source_url: &str) -> DeviceResult<()> {
        let generation = {
            let mut state = lock_state(&self.state);
            state.clear_source();
            state.pitch = None;
            state.rate = 1.0;
            state.preserves_pitch = true;
            state.generation
        };
        if !local_path(source_url).exists() {
            return Err(DeviceError::Decode {
                source_url: source_url.to_string(),
                reason: "file not found".into(),
            });
        }
        self.spawn_decoder(source_url.to_string(), generation);
        Ok(())
    }

    fn unload(&mut self) {
        let mut state = lock_state(&self.state);
        state.clear_source();
        state.pitch = None;
    }

    fn current_time(&self) -> f64 {
        lock_state(&self.state).current_time()
    }

    fn seek(&mut self, seconds: f64) {
        if seconds.is_finite() {
            lock_state(&self.state).seek(seconds);
        }
    }

    fn play(&mut self) -> DeviceResult<()> {
        let mut state = lock_state(&self.state);
        if state.generation == 0 {
            return Err(DeviceError::PlaybackRejected("nothing loaded".into()));
        }
        // Playing again after the end starts over
        if state.ended {
            state.ended = false;
            state.seek(0.0);
        }
        state.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        lock_state(&self.state).playing = false;
    }

    fn resume_context(&mut self) -> DeviceResult<()> {
        self.ensure_output()?;
        if let Some(output) = &self.output {
            output
                ._stream
                .play()
                .map_err(|e| DeviceError::StreamPlay(e.to_string()))?;
        }
        Ok(())
    }

    fn set_playback_rate(&mut self, rate: f64) {
        if rate.is_finite() && rate > 0.0 {
            lock_state(&self.state).rate = rate;
        }
    }

    fn set_preserves_pitch(&mut self, preserve: bool) {
        lock_state(&self.state).preserves_pitch = preserve;
    }

    fn create_pitch_effect(&mut self) -> Result<Box<dyn PitchEffect>, EffectError> {
        let (channels, sample_rate) = match self.ensure_output() {
            Ok(output) => (output.channels, output.sample_rate),
            Err(e) => return Err(EffectError::Unsupported(e.to_string())),
        };
        let id = self.next_effect_id;
        self.next_effect_id += 1;
        lock_state(&self.state).pitch = Some(PitchStage::new(id, channels, sample_rate));
        log::debug!("pitch stage {} inserted ({} ch, {} Hz)", id, channels, sample_rate);
        Ok(Box::new(CpalPitchEffect {
            state: Arc::clone(&self.state),
            id,
        }))
    }

    fn connect_direct(&mut self) -> DeviceResult<()> {
        lock_state(&self.state).pitch = None;
        Ok(())
    }

    fn drain_events(&mut self) -> Vec<DeviceEvent> {
        let (generation, seek_epoch) = {
            let state = lock_state(&self.state);
            (state.generation, state.seek_epoch)
        };
        self.events_rx
            .try_iter()
            .filter(|stamped| stamped.is_current(generation, seek_epoch))
            .map(|stamped| stamped.event)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait_for_metadata(device: &mut CpalDevice) -> Vec<DeviceEvent> {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let events = device.drain_events();
            if !events.is_empty() || Instant::now() > deadline {
                return events;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_play_without_source_is_rejected() {
        let mut device = CpalDevice::new();
        assert!(matches!(device.play(), Err(DeviceError::PlaybackRejected(_))));
    }

    #[test]
    fn test_missing_file_fails_load() {
        let mut device = CpalDevice::new();
        assert!(device.load("/nonexistent/zema/none.flac").is_err());
    }

    #[test]
    fn test_load_reports_duration_and_peaks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        decode::tests::write_wav(&path, 8000, &vec![8192i16; 16000]);

        let mut device = CpalDevice::new();
        device.load(path.to_str().unwrap()).unwrap();
        let events = wait_for_metadata(&mut device);
        match events.first() {
            Some(DeviceEvent::MetadataLoaded { duration, peaks }) => {
                assert!((duration - 2.0).abs() < 1e-9);
                assert!(peaks.as_ref().is_some_and(|p| !p.is_empty()));
            }
            other => panic!("expected metadata, got {other:?}"),
        }
    }

    #[test]
    fn test_seek_is_visible_immediately_and_drops_stale_updates() {
        let mut device = CpalDevice::new();
        device.seek(12.0);
        assert!((device.current_time() - 12.0).abs() < 1e-3);

        let generation = lock_state(&device.state).generation;
        device
            .events_tx
            .send(Stamped {
                generation,
                seek_epoch: 0,
                event: DeviceEvent::TimeUpdate(1.0),
            })
            .unwrap();
        assert!(device.drain_events().is_empty());
    }

    #[test]
    fn test_reload_discards_previous_track_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.wav");
        decode::tests::write_wav(&path, 8000, &[0i16; 800]);
        let mut device = CpalDevice::new();
        device.load(path.to_str().unwrap()).unwrap();
        let old = lock_state(&device.state).generation;
        device.load(path.to_str().unwrap()).unwrap();
        device
            .events_tx
            .send(Stamped {
                generation: old,
                seek_epoch: 0,
                event: DeviceEvent::Ended,
            })
            .unwrap();
        let events = wait_for_metadata(&mut device);
        assert!(!events.contains(&DeviceEvent::Ended));
    }
}
