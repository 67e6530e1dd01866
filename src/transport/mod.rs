//! Transport: the playback core for one loaded track
//!
//! Owns the clock, the DSP knobs, the loop region, scrub gestures, bookmarks
//! and the sleep timer, and drives a single `PlaybackDevice`. Everything runs
//! on the UI thread; the device's own thread only reaches us through
//! `DeviceEvent`s drained in `handle_device_events`.
//!
//! Two kinds of change are distinguished:
//! - structural changes (track loaded, loop bounds, bookmarks, waveform)
//!   bump `revision()` so the surrounding UI can rebuild what it caches;
//! - the play-head moves every frame and is pushed by the render loop
//!   straight into its display readout instead.

pub mod bookmarks;
pub mod clock;
pub mod device;
pub mod dsp;
pub mod looping;
pub mod scrub;
pub mod sleep_timer;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::LoopError;
use crate::track::Track;
use crate::waveform::{Waveform, DEFAULT_BARS};

use bookmarks::{Bookmark, BookmarkStore, Bookmarks};
use clock::{PlaybackClock, TimeUpdate};
use device::{DeviceEvent, PlaybackDevice};
use dsp::DspController;
use looping::LoopController;
use scrub::ScrubHandler;
use sleep_timer::{SleepTick, SleepTimer};

/// Skip distances offered in settings, seconds
pub const SEEK_AMOUNTS: [f64; 5] = [3.0, 5.0, 10.0, 15.0, 30.0];

pub const DEFAULT_SEEK_AMOUNT: f64 = 10.0;

/// What happens when a track ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    /// Handled by the caller's queue; the transport just reports the end
    All,
    /// Restart the same track
    One,
}

impl RepeatMode {
    /// Off -> All -> One -> Off
    pub fn next(self) -> Self {
        match self {
            Self::Off => Self::All,
            Self::All => Self::One,
            Self::One => Self::Off,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Off => "Repeat off",
            Self::All => "Repeat all",
            Self::One => "Repeat one",
        }
    }
}

/// Notifications for the layer that owns history and queues
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A different track than before started; prepend it to history
    TrackStarted(Track),
    /// The track played to the end and was not restarted
    TrackEnded { track_id: String },
}

/// Construction-time settings
#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub seek_amount: f64,
    pub waveform_bars: usize,
    pub repeat: RepeatMode,
    pub bookmark_store: BookmarkStore,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            seek_amount: DEFAULT_SEEK_AMOUNT,
            waveform_bars: DEFAULT_BARS,
            repeat: RepeatMode::Off,
            bookmark_store: BookmarkStore::in_memory(),
        }
    }
}

pub struct Transport<D: PlaybackDevice> {
    device: D,
    track: Option<Track>,
    is_playing: bool,
    clock: PlaybackClock,
    dsp: DspController,
    loop_ctl: LoopController,
    scrub: ScrubHandler,
    waveform: Waveform,
    waveform_bars: usize,
    bookmarks: Bookmarks,
    bookmark_store: BookmarkStore,
    sleep_timer: SleepTimer,
    repeat: RepeatMode,
    seek_amount: f64,
    revision: u64,
    events: Vec<TransportEvent>,
}

impl<D: PlaybackDevice> Transport<D> {
    pub fn new(device: D, settings: TransportSettings) -> Self {
        Self {
            device,
            track: None,
            is_playing: false,
            clock: PlaybackClock::new(),
            dsp: DspController::new(),
            loop_ctl: LoopController::new(),
            scrub: ScrubHandler::new(),
            waveform: Waveform::empty(),
            waveform_bars: Waveform::clamp_bars(settings.waveform_bars),
            bookmarks: Bookmarks::default(),
            bookmark_store: settings.bookmark_store,
            sleep_timer: SleepTimer::new(),
            repeat: settings.repeat,
            seek_amount: sanitize_seek_amount(settings.seek_amount),
            revision: 0,
            events: Vec::new(),
        }
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    pub fn current_track(&self) -> Option<&Track> {
        self.track.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn dsp(&self) -> &DspController {
        &self.dsp
    }

    pub fn loop_region(&self) -> &LoopController {
        &self.loop_ctl
    }

    pub fn scrub(&self) -> &ScrubHandler {
        &self.scrub
    }

    pub fn waveform(&self) -> &Waveform {
        &self.waveform
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        self.bookmarks.items()
    }

    pub fn sleep_timer(&self) -> &SleepTimer {
        &self.sleep_timer
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat
    }

    pub fn seek_amount(&self) -> f64 {
        self.seek_amount
    }

    /// Bumped on every structural change
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Take the notifications raised since the last call
    pub fn take_events(&mut self) -> Vec<TransportEvent> {
        std::mem::take(&mut self.events)
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    // ---------------------------------------------------------------------
    // Track lifecycle
    // ---------------------------------------------------------------------

    /// "Play requested" from the library. A new id loads and resets; the
    /// current id just resumes.
    pub fn play_track(&mut self, track: Track) {
        let same = self.track.as_ref().is_some_and(|t| t.id == track.id);
        if !same {
            self.load_track(track);
        }
        self.set_playing(true);
    }

    /// Load `track` paused, discarding every per-track state.
    pub fn load_track(&mut self, track: Track) {
        self.teardown_track();

        log::info!("load_track: {} ({})", track.title, track.id);
        // Library hint until the device reports the real duration
        if let Some(hint) = track.duration {
            self.clock.set_duration(hint);
        }
        self.waveform = Waveform::synthesize(&track.id, self.waveform_bars);
        self.bookmarks = match self.bookmark_store.load(&track.id) {
            Ok(items) => Bookmarks::from_items(items),
            Err(e) => {
                log::warn!("load_track: could not load bookmarks for {}: {}", track.id, e);
                Bookmarks::default()
            }
        };

        self.dsp.reset_for_track(&mut self.device);
        if let Err(e) = self.device.load(&track.audio_url) {
            log::error!("load_track: {}", e);
        }

        self.events.push(TransportEvent::TrackStarted(track.clone()));
        self.track = Some(track);
        self.touch();
    }

    /// Unload the track entirely (player closed).
    pub fn close(&mut self) {
        self.teardown_track();
        self.device.unload();
        self.sleep_timer.cancel();
        self.is_playing = false;
        self.track = None;
        self.waveform = Waveform::empty();
        self.bookmarks = Bookmarks::default();
        self.touch();
    }

    /// Release per-track resources. Safe to call repeatedly.
    fn teardown_track(&mut self) {
        self.scrub.cancel(&mut self.clock);
        self.dsp.dispose();
        self.clock.reset();
        self.loop_ctl.clear();
    }

    // ---------------------------------------------------------------------
    // Play / pause
    // ---------------------------------------------------------------------

    pub fn set_playing(&mut self, playing: bool) {
        self.is_playing = playing;
        if playing {
            self.begin_playback();
        } else {
            self.device.pause();
        }
    }

    pub fn toggle_play(&mut self) {
        self.set_playing(!self.is_playing);
    }

    /// Resume output, then play. Failures are logged; the play intent stays
    /// set so the user can simply press play again.
    fn begin_playback(&mut self) {
        if self.track.is_none() {
            return;
        }
        if let Err(e) = self.device.resume_context() {
            log::warn!("begin_playback: output not resumed: {}", e);
        }
        if let Err(e) = self.device.play() {
            log::warn!("begin_playback: playback error: {}", e);
        }
    }

    // ---------------------------------------------------------------------
    // Device events and clock
    // ---------------------------------------------------------------------

    pub fn handle_device_events(&mut self) {
        for event in self.device.drain_events() {
            match event {
                DeviceEvent::MetadataLoaded { duration, peaks } => {
                    self.on_metadata_loaded(duration, peaks);
                }
                DeviceEvent::TimeUpdate(t) => self.on_device_time_update(t),
                DeviceEvent::Ended => self.on_ended(),
                DeviceEvent::Error(message) => {
                    log::error!("handle_device_events: device error: {}", message);
                }
            }
        }
    }

    fn on_metadata_loaded(&mut self, duration: f64, peaks: Option<Vec<f32>>) {
        // An unusable report keeps the library hint, if any
        if duration.is_finite() && duration > 0.0 {
            self.clock.set_duration(duration);
        }
        log::debug!("on_metadata_loaded: duration {:.2}s", self.clock.duration());
        if let Some(peaks) = peaks.filter(|p| !p.is_empty()) {
            self.waveform = Waveform::from_peaks(&peaks, self.waveform_bars);
        }
        self.touch();
        if self.is_playing {
            self.begin_playback();
        }
    }

    /// Feed a device time report through the clock, applying loop wraparound.
    pub fn on_device_time_update(&mut self, t: f64) {
        if let TimeUpdate::Wrapped { to } = self.clock.on_device_time_update(t, self.loop_ctl.active_region()) {
            log::trace!("on_device_time_update: loop wrap {:.3} -> {:.3}", t, to);
            self.device.seek(to);
        }
    }

    /// Sample the device clock now (render loop, once per frame).
    pub fn sync_clock(&mut self) {
        let t = self.device.current_time();
        self.on_device_time_update(t);
    }

    fn on_ended(&mut self) {
        let Some(track_id) = self.track.as_ref().map(|t| t.id.clone()) else {
            return;
        };
        if self.repeat == RepeatMode::One || self.sleep_timer.is_active() {
            log::debug!("on_ended: restarting {}", track_id);
            self.seek(0.0);
            self.is_playing = true;
            self.begin_playback();
        } else {
            self.is_playing = false;
            self.events.push(TransportEvent::TrackEnded { track_id });
        }
    }

    /// Drive time-based helpers; `dt` is wall-clock time since the last call.
    pub fn tick(&mut self, dt: Duration) {
        if let SleepTick::Expired { pause_requested } = self.sleep_timer.advance(dt, self.is_playing) {
            log::info!("tick: sleep timer expired");
            if pause_requested {
                self.set_playing(false);
            }
        }
    }

    // ---------------------------------------------------------------------
    // Seeking
    // ---------------------------------------------------------------------

    /// Seek to `target`, clamped to the track. NaN is ignored.
    pub fn seek(&mut self, target: f64) {
        if let Some(clamped) = self.clock.seek(target) {
            self.device.seek(clamped);
        }
    }

    pub fn skip_forward(&mut self) {
        self.seek(self.clock.read() + self.seek_amount);
    }

    pub fn skip_backward(&mut self) {
        self.seek(self.clock.read() - self.seek_amount);
    }

    pub fn set_seek_amount(&mut self, seconds: f64) {
        self.seek_amount = sanitize_seek_amount(seconds);
    }

    pub fn begin_waveform_drag(&mut self, x: f32) {
        self.scrub.on_drag_start(x, &mut self.clock);
    }

    pub fn drag_waveform(&mut self, x: f32, pixels_per_second: f64) {
        self.scrub.on_drag_move(x, pixels_per_second, &mut self.clock);
    }

    pub fn end_waveform_drag(&mut self) {
        if let Some(target) = self.scrub.on_drag_end(&mut self.clock) {
            self.seek(target);
        }
    }

    pub fn begin_slider_seek(&mut self) {
        self.scrub.on_seek_start(&mut self.clock);
    }

    pub fn slider_seek_changed(&mut self, value: f64) {
        self.scrub.on_seek_change(value, &mut self.clock);
    }

    pub fn end_slider_seek(&mut self) {
        if let Some(target) = self.scrub.on_seek_end(&mut self.clock) {
            self.seek(target);
        }
    }

    /// Pointer released anywhere in the window while a gesture was active
    pub fn on_global_release(&mut self) {
        if let Some(target) = self.scrub.on_global_release(&mut self.clock) {
            self.seek(target);
        }
    }

    // ---------------------------------------------------------------------
    // Loop
    // ---------------------------------------------------------------------

    pub fn set_loop_a(&mut self, t: f64) -> Result<(), LoopError> {
        self.loop_ctl.set_a(t)?;
        self.touch();
        Ok(())
    }

    pub fn set_loop_b(&mut self, t: f64) -> Result<(), LoopError> {
        self.loop_ctl.set_b(t)?;
        self.touch();
        Ok(())
    }

    /// The A button: mark A at the play-head, or clear it if already set.
    pub fn toggle_loop_a(&mut self) {
        if self.loop_ctl.a().is_some() {
            self.loop_ctl.clear_a();
        } else if let Err(e) = self.loop_ctl.set_a(self.clock.read()) {
            log::debug!("toggle_loop_a: {}", e);
        }
        self.touch();
    }

    /// The B button: mark B at the play-head (arming the loop), or clear it.
    pub fn toggle_loop_b(&mut self) {
        if self.loop_ctl.b().is_some() {
            self.loop_ctl.clear_b();
        } else if let Err(e) = self.loop_ctl.set_b(self.clock.read()) {
            log::debug!("toggle_loop_b: {}", e);
        }
        self.touch();
    }

    pub fn toggle_looping(&mut self) {
        if let Err(e) = self.loop_ctl.toggle_looping() {
            log::debug!("toggle_looping: {}", e);
        }
        self.touch();
    }

    pub fn clear_loop(&mut self) {
        self.loop_ctl.clear();
        self.touch();
    }

    /// Loop editor "Done": replace both bounds at once, turn looping on and
    /// jump to A. Invalid bounds leave the current loop untouched.
    pub fn commit_loop(&mut self, a: f64, b: f64) -> Result<(), LoopError> {
        let mut next = LoopController::new();
        next.set_a(self.clock.clamp_to_track(a))?;
        next.set_b(self.clock.clamp_to_track(b))?;
        self.loop_ctl = next;
        self.touch();
        self.seek(a);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // DSP
    // ---------------------------------------------------------------------

    pub fn set_tempo(&mut self, percent: f64) {
        self.dsp.set_tempo(percent, &mut self.device);
    }

    pub fn nudge_tempo(&mut self, steps: f64) {
        self.dsp.nudge_tempo(steps, &mut self.device);
    }

    pub fn set_pitch(&mut self, semitones: f64) {
        self.dsp.set_pitch(semitones, &mut self.device);
    }

    pub fn nudge_pitch(&mut self, steps: f64) {
        self.dsp.nudge_pitch(steps, &mut self.device);
    }

    /// Settings "reset to defaults": tempo, pitch and skip distance.
    pub fn reset_defaults(&mut self) {
        self.dsp.reset_defaults(&mut self.device);
        self.seek_amount = DEFAULT_SEEK_AMOUNT;
    }

    /// Retry the pitch effect after a construction failure.
    pub fn repair_audio(&mut self) {
        self.dsp.repair(&mut self.device);
    }

    // ---------------------------------------------------------------------
    // Bookmarks, sleep timer, repeat
    // ---------------------------------------------------------------------

    pub fn add_bookmark(&mut self) -> Option<String> {
        self.track.as_ref()?;
        let id = self.bookmarks.add(self.clock.read()).id.clone();
        self.persist_bookmarks();
        Some(id)
    }

    pub fn rename_bookmark(&mut self, id: &str, label: &str) {
        if self.bookmarks.rename(id, label) {
            self.persist_bookmarks();
        }
    }

    pub fn remove_bookmark(&mut self, id: &str) {
        if self.bookmarks.remove(id) {
            self.persist_bookmarks();
        }
    }

    pub fn jump_to_bookmark(&mut self, id: &str) {
        if let Some(time) = self.bookmarks.get(id).map(|b| b.time) {
            self.seek(time);
        }
    }

    fn persist_bookmarks(&mut self) {
        self.touch();
        let Some(track) = &self.track else {
            return;
        };
        if let Err(e) = self.bookmark_store.save(&track.id, self.bookmarks.items()) {
            log::warn!("persist_bookmarks: {}", e);
        }
    }

    pub fn set_sleep_timer_minutes(&mut self, minutes: u32) {
        self.sleep_timer.set_minutes(minutes);
    }

    pub fn set_sleep_timer_hours_minutes(&mut self, hours: u32, minutes: u32) {
        self.sleep_timer.set_hours_minutes(hours, minutes);
    }

    pub fn cancel_sleep_timer(&mut self) {
        self.sleep_timer.cancel();
    }

    pub fn cycle_repeat(&mut self) {
        self.repeat = self.repeat.next();
    }
}

impl<D: PlaybackDevice> Drop for Transport<D> {
    fn drop(&mut self) {
        self.dsp.dispose();
    }
}

fn sanitize_seek_amount(seconds: f64) -> f64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        DEFAULT_SEEK_AMOUNT
    }
}
