//! Per-frame render loop
//!
//! Runs once per eframe update while any player surface is visible. Each
//! frame samples the device clock through the transport, lays out the
//! scrolling waveform, and writes the play-head into a `DisplayReadout`
//! that the widgets read directly. Nothing here mutates transport state
//! other than the clock sync.

pub mod layout;
pub mod paint;

use eframe::egui::{Rect, Vec2};

use crate::timefmt::format_time;
use crate::transport::device::PlaybackDevice;
use crate::transport::Transport;

use layout::{FrameInput, FrameLayout, WaveGeometry, MAX_ZOOM, MIN_ZOOM};

/// Which view hosts the waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfaceKind {
    /// Bottom bar, slider only
    #[default]
    Mini,
    Expanded,
    Fullscreen,
}

/// Backing size of the drawing surface
///
/// Tracks logical size and pixel density so the waveform is only re-laid
/// out for a new size when one of them actually changed.
#[derive(Debug, Clone, Default)]
pub struct Surface {
    logical: Vec2,
    pixels_per_point: f32,
    physical: [u32; 2],
}

impl Surface {
    /// Returns true if the backing size changed.
    pub fn resize_if_needed(&mut self, logical: Vec2, pixels_per_point: f32) -> bool {
        let physical = [
            (logical.x * pixels_per_point).round().max(0.0) as u32,
            (logical.y * pixels_per_point).round().max(0.0) as u32,
        ];
        if physical == self.physical && pixels_per_point == self.pixels_per_point {
            return false;
        }
        self.logical = logical;
        self.pixels_per_point = pixels_per_point;
        self.physical = physical;
        true
    }

    pub fn logical(&self) -> Vec2 {
        self.logical
    }

    pub fn physical(&self) -> [u32; 2] {
        self.physical
    }

    pub fn is_empty(&self) -> bool {
        self.physical[0] == 0 || self.physical[1] == 0
    }
}

/// Play-head values the widgets show, refreshed every frame
#[derive(Debug, Clone, Default)]
pub struct DisplayReadout {
    /// 0..=100
    pub progress_percent: f64,
    pub time_label: String,
    pub slider_value: f64,
}

impl DisplayReadout {
    pub fn update(&mut self, current: f64, duration: f64) {
        self.progress_percent = if duration > 0.0 {
            (current / duration * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };
        self.slider_value = current;
        self.time_label = format_time(current);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// No surface open; the loop stopped rescheduling itself
    Stopped,
    /// Zero-sized surface; nothing drawn but the loop keeps going
    Skipped,
    Rendered,
}

#[derive(Debug)]
pub struct RenderLoop {
    running: bool,
    surface: Surface,
    layout: FrameLayout,
    readout: DisplayReadout,
    zoom: u8,
    kind: SurfaceKind,
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new(MIN_ZOOM)
    }
}

impl RenderLoop {
    pub fn new(zoom: u8) -> Self {
        Self {
            running: false,
            surface: Surface::default(),
            layout: FrameLayout::new(),
            readout: DisplayReadout::default(),
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            kind: SurfaceKind::Mini,
        }
    }

    pub fn start(&mut self) {
        if !self.running {
            log::debug!("render loop started");
        }
        self.running = true;
    }

    pub fn stop(&mut self) {
        if self.running {
            log::debug!("render loop stopped");
        }
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: u8) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: SurfaceKind) {
        self.kind = kind;
    }

    pub fn readout(&self) -> &DisplayReadout {
        &self.readout
    }

    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Current time scale of the waveform, shared with drag scrubbing
    pub fn pixels_per_second<D: PlaybackDevice>(&self, transport: &Transport<D>) -> Option<f64> {
        WaveGeometry::new(transport.waveform().len(), self.zoom)
            .pixels_per_second(transport.clock().duration())
    }

    /// Run one frame against `rect`. Call every update while running.
    pub fn frame<D: PlaybackDevice>(
        &mut self,
        transport: &mut Transport<D>,
        visible: bool,
        rect: Rect,
        pixels_per_point: f32,
    ) -> FrameOutcome {
        if !visible || !self.running {
            self.stop();
            return FrameOutcome::Stopped;
        }

        if self.surface.resize_if_needed(rect.size(), pixels_per_point) {
            log::trace!("surface resized to {:?}", self.surface.physical());
        }

        // The device clock only matters while no gesture overrides it
        if !transport.clock().is_scrubbing() {
            transport.sync_clock();
        }
        let clock = transport.clock();
        let current = clock.read();
        self.readout.update(current, clock.duration());

        if self.surface.is_empty() {
            self.layout.clear();
            return FrameOutcome::Skipped;
        }

        let loop_region = transport.loop_region();
        let input = FrameInput {
            amplitudes: transport.waveform().amplitudes(),
            current,
            duration: clock.duration(),
            loop_a: loop_region.a(),
            loop_b: loop_region.b(),
            active_loop: loop_region.active_region(),
            zoom: self.zoom,
        };
        self.layout.compute(rect, &input);
        FrameOutcome::Rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDevice;
    use crate::track::Track;
    use crate::transport::device::DeviceEvent;
    use crate::transport::TransportSettings;
    use eframe::egui::{pos2, vec2};

    fn playing_transport(duration: f64) -> Transport<MockDevice> {
        let mut t = Transport::new(MockDevice::new(), TransportSettings::default());
        t.play_track(Track::new("x", "Wazema", "/audio/x.flac"));
        t.device_mut().push(DeviceEvent::MetadataLoaded { duration, peaks: None });
        t.handle_device_events();
        t
    }

    fn rect(w: f32, h: f32) -> Rect {
        Rect::from_min_size(pos2(0.0, 0.0), vec2(w, h))
    }

    #[test]
    fn test_resize_only_on_change() {
        let mut surface = Surface::default();
        assert!(surface.resize_if_needed(vec2(300.0, 100.0), 2.0));
        assert_eq!(surface.physical(), [600, 200]);
        assert!(!surface.resize_if_needed(vec2(300.0, 100.0), 2.0));
        assert!(surface.resize_if_needed(vec2(300.0, 100.0), 1.0));
    }

    #[test]
    fn test_readout_formats_progress_and_time() {
        let mut readout = DisplayReadout::default();
        readout.update(75.0, 150.0);
        assert_eq!(readout.progress_percent, 50.0);
        assert_eq!(readout.time_label, "1:15");
        assert_eq!(readout.slider_value, 75.0);
        readout.update(12.0, 0.0);
        assert_eq!(readout.progress_percent, 0.0);
        assert_eq!(readout.time_label, "0:12");
    }

    #[test]
    fn test_frame_stops_without_visible_surface() {
        let mut t = playing_transport(100.0);
        let mut render = RenderLoop::new(1);
        render.start();
        assert_eq!(render.frame(&mut t, false, rect(300.0, 100.0), 1.0), FrameOutcome::Stopped);
        assert!(!render.is_running());
    }

    #[test]
    fn test_frame_samples_device_clock() {
        let mut t = playing_transport(100.0);
        let mut render = RenderLoop::new(1);
        render.start();
        t.device_mut().time = 25.0;
        assert_eq!(render.frame(&mut t, true, rect(300.0, 100.0), 1.0), FrameOutcome::Rendered);
        assert_eq!(render.readout().slider_value, 25.0);
        assert_eq!(render.readout().progress_percent, 25.0);
        assert!(render.layout().bar_count() > 0);
    }

    #[test]
    fn test_scrub_preview_wins_over_device() {
        let mut t = playing_transport(100.0);
        let mut render = RenderLoop::new(1);
        render.start();
        t.begin_slider_seek();
        t.slider_seek_changed(80.0);
        t.device_mut().time = 5.0;
        render.frame(&mut t, true, rect(300.0, 100.0), 1.0);
        assert_eq!(render.readout().slider_value, 80.0);
    }

    #[test]
    fn test_zero_sized_surface_is_skipped() {
        let mut t = playing_transport(100.0);
        let mut render = RenderLoop::new(1);
        render.start();
        assert_eq!(render.frame(&mut t, true, rect(0.0, 100.0), 1.0), FrameOutcome::Skipped);
        assert!(render.is_running());
    }

    #[test]
    fn test_drag_scale_matches_rendered_scale() {
        let t = playing_transport(100.0);
        let mut render = RenderLoop::new(1);
        // 400 bars * 2.5 px over 100 s
        assert_eq!(render.pixels_per_second(&t), Some(10.0));
        render.set_zoom(3);
        assert_eq!(render.pixels_per_second(&t), Some(22.5));
    }
}
