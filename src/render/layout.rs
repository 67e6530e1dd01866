//! Scrolling waveform geometry
//!
//! The waveform scrolls under a fixed play-head at the horizontal center.
//! Layout is pure math over `egui::Rect`s so it can be checked without a
//! graphics context; painting lives in `paint`.

use eframe::egui::{pos2, Rect};

/// Base width of one bar, before zoom
pub const BAR_WIDTH: f32 = 1.5;

/// Base gap between bars, before zoom
pub const BAR_GAP: f32 = 1.0;

/// Bars further than this outside the surface are not laid out
pub const CULL_MARGIN: f32 = 50.0;

/// Smallest bar height, so silence still shows a line
pub const MIN_BAR_HEIGHT: f32 = 2.0;

/// Fraction of the surface height a full-scale bar occupies
pub const HEIGHT_SCALE: f32 = 0.85;

pub const MIN_ZOOM: u8 = 1;
pub const MAX_ZOOM: u8 = 10;

/// Horizontal scale for a zoom level (1 = no zoom)
pub fn zoom_factor(zoom: u8) -> f32 {
    let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    1.5f32.powi(i32::from(zoom) - 1)
}

pub fn bar_height(amplitude: f32, height: f32) -> f32 {
    let amplitude = if amplitude.is_finite() { amplitude.max(0.0) } else { 0.0 };
    (amplitude * height * HEIGHT_SCALE).max(MIN_BAR_HEIGHT)
}

/// Bar geometry for one waveform at one zoom level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveGeometry {
    pub bar_width: f32,
    pub gap: f32,
    pub bars: usize,
}

impl WaveGeometry {
    pub fn new(bars: usize, zoom: u8) -> Self {
        let factor = zoom_factor(zoom);
        Self {
            bar_width: BAR_WIDTH * factor,
            gap: BAR_GAP * factor,
            bars,
        }
    }

    /// Distance from one bar's left edge to the next
    pub fn stride(&self) -> f32 {
        self.bar_width + self.gap
    }

    pub fn total_width(&self) -> f32 {
        self.bars as f32 * self.stride()
    }

    /// Pixels per second of audio. `None` until the duration is known.
    ///
    /// Scrubbing uses this same value, so a drag of N pixels moves the
    /// waveform exactly N pixels under the pointer.
    pub fn pixels_per_second(&self, duration: f64) -> Option<f64> {
        if !(duration.is_finite() && duration > 0.0) || self.bars == 0 {
            return None;
        }
        Some(f64::from(self.total_width()) / duration)
    }
}

/// What a frame needs to know about the transport
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    pub amplitudes: &'a [f32],
    /// Effective time (scrub preview while dragging)
    pub current: f64,
    pub duration: f64,
    pub loop_a: Option<f64>,
    pub loop_b: Option<f64>,
    /// Armed and looping region; bars outside it are grayed
    pub active_loop: Option<(f64, f64)>,
    pub zoom: u8,
}

/// Laid-out bars and markers for one frame
///
/// The rect buffers are reused across frames.
#[derive(Debug, Default)]
pub struct FrameLayout {
    /// Not yet played, inside the loop (or no loop)
    pub unplayed: Vec<Rect>,
    /// Already played, inside the loop (or no loop)
    pub played: Vec<Rect>,
    /// Outside an active loop, whether played or not
    pub outside_loop: Vec<Rect>,
    pub marker_a: Option<f32>,
    pub marker_b: Option<f32>,
    pub center_x: f32,
    /// Screen x of the waveform's first bar
    pub offset_x: f32,
}

impl FrameLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.unplayed.clear();
        self.played.clear();
        self.outside_loop.clear();
        self.marker_a = None;
        self.marker_b = None;
    }

    pub fn bar_count(&self) -> usize {
        self.unplayed.len() + self.played.len() + self.outside_loop.len()
    }

    pub fn compute(&mut self, rect: Rect, input: &FrameInput<'_>) {
        self.clear();
        let geometry = WaveGeometry::new(input.amplitudes.len(), input.zoom);
        let width = rect.width();
        let height = rect.height();
        let stride = geometry.stride();
        let total_width = geometry.total_width();

        let has_duration = input.duration.is_finite() && input.duration > 0.0;
        let progress = if has_duration {
            (input.current / input.duration).clamp(0.0, 1.0) as f32
        } else {
            0.0
        };
        let pixels_played = progress * total_width;

        self.center_x = rect.left() + width / 2.0;
        self.offset_x = self.center_x - pixels_played;

        for (i, &amplitude) in input.amplitudes.iter().enumerate() {
            let x = i as f32 * stride;
            let screen_x = x + self.offset_x - rect.left();
            if screen_x < -CULL_MARGIN || screen_x > width + CULL_MARGIN {
                continue;
            }

            let h = bar_height(amplitude, height);
            let top = rect.top() + (height - h) / 2.0;
            let bar = Rect::from_min_max(
                pos2(self.offset_x + x, top),
                pos2(self.offset_x + x + geometry.bar_width, top + h),
            );

            let outside = match input.active_loop {
                Some((a, b)) if has_duration => {
                    let time_at_x = f64::from(x / total_width) * input.duration;
                    time_at_x < a || time_at_x > b
                }
                _ => false,
            };

            if outside {
                self.outside_loop.push(bar);
            } else if x < pixels_played {
                self.played.push(bar);
            } else {
                self.unplayed.push(bar);
            }
        }

        if let Some(pps) = geometry.pixels_per_second(input.duration) {
            let center_x = self.center_x;
            let marker = |bound: f64| center_x + ((bound - input.current) * pps) as f32;
            self.marker_a = input.loop_a.map(marker);
            self.marker_b = input.loop_b.map(marker);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::vec2;

    fn surface(w: f32, h: f32) -> Rect {
        Rect::from_min_size(pos2(0.0, 0.0), vec2(w, h))
    }

    fn input(amplitudes: &[f32], current: f64, duration: f64) -> FrameInput<'_> {
        FrameInput {
            amplitudes,
            current,
            duration,
            loop_a: None,
            loop_b: None,
            active_loop: None,
            zoom: 1,
        }
    }

    #[test]
    fn test_silent_bar_still_two_pixels() {
        assert_eq!(bar_height(0.0, 100.0), 2.0);
        assert_eq!(bar_height(f32::NAN, 100.0), 2.0);
        assert!((bar_height(1.0, 100.0) - 85.0).abs() < 1e-4);

        let amps = [0.0f32; 10];
        let mut layout = FrameLayout::new();
        layout.compute(surface(400.0, 80.0), &input(&amps, 0.0, 10.0));
        assert!(layout.unplayed.iter().all(|r| r.height() >= 2.0));
    }

    #[test]
    fn test_zoom_factor_and_geometry() {
        assert_eq!(zoom_factor(1), 1.0);
        assert!((zoom_factor(3) - 2.25).abs() < 1e-6);
        assert_eq!(zoom_factor(0), 1.0);
        assert_eq!(zoom_factor(42), zoom_factor(10));

        let g = WaveGeometry::new(400, 1);
        assert_eq!(g.stride(), 2.5);
        assert_eq!(g.total_width(), 1000.0);
        assert_eq!(g.pixels_per_second(100.0), Some(10.0));
        assert_eq!(g.pixels_per_second(0.0), None);
    }

    #[test]
    fn test_play_head_position_sits_at_center() {
        let amps = [0.5f32; 400];
        let mut layout = FrameLayout::new();
        layout.compute(surface(300.0, 100.0), &input(&amps, 50.0, 100.0));
        assert_eq!(layout.center_x, 150.0);
        // Halfway through a 1000 px waveform
        assert_eq!(layout.offset_x, 150.0 - 500.0);
        assert!(layout.played.iter().all(|r| r.left() < 150.0));
        assert!(layout.unplayed.iter().all(|r| r.left() >= 150.0));
    }

    #[test]
    fn test_offscreen_bars_are_culled() {
        let amps = [0.5f32; 3000];
        let mut layout = FrameLayout::new();
        let rect = surface(200.0, 100.0);
        layout.compute(rect, &input(&amps, 100.0, 300.0));
        assert!(layout.bar_count() < amps.len());
        for r in layout.played.iter().chain(&layout.unplayed) {
            assert!(r.left() >= -CULL_MARGIN && r.left() <= 200.0 + CULL_MARGIN);
        }
    }

    #[test]
    fn test_outside_loop_overrides_played() {
        let amps = [0.5f32; 100];
        let mut layout = FrameLayout::new();
        let mut frame = input(&amps, 60.0, 100.0);
        frame.loop_a = Some(40.0);
        frame.loop_b = Some(80.0);
        frame.active_loop = Some((40.0, 80.0));
        layout.compute(surface(1000.0, 100.0), &frame);

        // Bars before A are played but must be gray
        assert!(!layout.outside_loop.is_empty());
        assert!(layout.outside_loop.iter().any(|r| r.left() < layout.center_x));
        let a_x = layout.marker_a.unwrap();
        let b_x = layout.marker_b.unwrap();
        assert!(a_x < layout.center_x && b_x > layout.center_x);
        for r in &layout.played {
            assert!(r.left() >= a_x - 0.01);
        }
    }

    #[test]
    fn test_markers_follow_time_scale() {
        let amps = [0.5f32; 400];
        let mut layout = FrameLayout::new();
        let mut frame = input(&amps, 10.0, 100.0);
        frame.loop_a = Some(20.0);
        layout.compute(surface(300.0, 100.0), &frame);
        // 10 px per second, A is 10 s ahead
        assert_eq!(layout.marker_a, Some(250.0));
        assert_eq!(layout.marker_b, None);
    }

    #[test]
    fn test_unknown_duration_places_no_markers() {
        let amps = [0.5f32; 400];
        let mut layout = FrameLayout::new();
        let mut frame = input(&amps, 0.0, 0.0);
        frame.loop_a = Some(1.0);
        frame.active_loop = Some((1.0, 2.0));
        layout.compute(surface(300.0, 100.0), &frame);
        assert_eq!(layout.marker_a, None);
        assert!(layout.outside_loop.is_empty());
        assert!(layout.played.is_empty());
    }
}
