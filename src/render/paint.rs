//! Waveform painting
//!
//! Each bar population goes out as a single mesh so a frame costs a handful
//! of shapes no matter how many bars are visible.

use eframe::egui::{self, pos2, Align2, Color32, FontId, Mesh, Painter, Rect, Shape, Stroke};

use super::layout::FrameLayout;
use super::SurfaceKind;

const UNPLAYED: Color32 = Color32::from_rgba_premultiplied(51, 51, 51, 51);
const OUTSIDE_LOOP: Color32 = Color32::from_rgba_premultiplied(13, 13, 13, 13);
const PLAYED_START: Color32 = Color32::from_rgb(0x10, 0xb9, 0x81);
const PLAYED_END: Color32 = Color32::from_rgb(0x2d, 0xd4, 0xbf);
const GLOW: Color32 = Color32::from_rgba_premultiplied(8, 46, 32, 64);
const MARKER: Color32 = Color32::from_rgb(0x00, 0xa3, 0xff);
const PLAY_HEAD: Color32 = Color32::from_rgba_premultiplied(128, 128, 128, 128);

const GLOW_SPREAD: f32 = 2.0;
const FADE_WIDTH: f32 = 60.0;
const MARKER_DASH: f32 = 5.0;
const MARKER_GAP: f32 = 3.0;

fn background(kind: SurfaceKind) -> Color32 {
    match kind {
        SurfaceKind::Fullscreen => Color32::BLACK,
        _ => Color32::from_rgb(2, 6, 23),
    }
}

fn lerp_color(a: Color32, b: Color32, t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    let mix = |x: u8, y: u8| (f32::from(x) + (f32::from(y) - f32::from(x)) * t).round() as u8;
    Color32::from_rgba_premultiplied(
        mix(a.r(), b.r()),
        mix(a.g(), b.g()),
        mix(a.b(), b.b()),
        mix(a.a(), b.a()),
    )
}

/// Quad with a left and a right color
fn add_horizontal_gradient(mesh: &mut Mesh, rect: Rect, left: Color32, right: Color32) {
    let idx = mesh.vertices.len() as u32;
    mesh.colored_vertex(rect.left_top(), left);
    mesh.colored_vertex(rect.right_top(), right);
    mesh.colored_vertex(rect.right_bottom(), right);
    mesh.colored_vertex(rect.left_bottom(), left);
    mesh.add_triangle(idx, idx + 1, idx + 2);
    mesh.add_triangle(idx, idx + 2, idx + 3);
}

fn solid_mesh(bars: &[Rect], color: Color32) -> Mesh {
    let mut mesh = Mesh::default();
    for bar in bars {
        mesh.add_colored_rect(*bar, color);
    }
    mesh
}

pub fn paint_waveform(painter: &Painter, rect: Rect, layout: &FrameLayout, kind: SurfaceKind) {
    let bg = background(kind);
    painter.rect_filled(rect, 0.0, bg);

    if !layout.unplayed.is_empty() {
        painter.add(Shape::mesh(solid_mesh(&layout.unplayed, UNPLAYED)));
    }

    if !layout.played.is_empty() {
        let glow = layout
            .played
            .iter()
            .map(|bar| bar.expand(GLOW_SPREAD))
            .collect::<Vec<_>>();
        painter.add(Shape::mesh(solid_mesh(&glow, GLOW)));

        // Gradient spans the surface, not the individual bar
        let mut played = Mesh::default();
        let width = rect.width().max(1.0);
        for bar in &layout.played {
            let left = lerp_color(PLAYED_START, PLAYED_END, (bar.left() - rect.left()) / width);
            let right = lerp_color(PLAYED_START, PLAYED_END, (bar.right() - rect.left()) / width);
            add_horizontal_gradient(&mut played, *bar, left, right);
        }
        painter.add(Shape::mesh(played));
    }

    if !layout.outside_loop.is_empty() {
        painter.add(Shape::mesh(solid_mesh(&layout.outside_loop, OUTSIDE_LOOP)));
    }

    for (x, label) in [(layout.marker_a, "A"), (layout.marker_b, "B")] {
        let Some(x) = x else { continue };
        painter.extend(Shape::dashed_line(
            &[pos2(x, rect.top()), pos2(x, rect.bottom())],
            Stroke::new(2.0, MARKER),
            MARKER_DASH,
            MARKER_GAP,
        ));
        painter.text(
            pos2(x + 5.0, rect.top() + 8.0),
            Align2::LEFT_TOP,
            label,
            FontId::proportional(12.0),
            MARKER,
        );
    }

    painter.line_segment(
        [pos2(layout.center_x, rect.top()), pos2(layout.center_x, rect.bottom())],
        Stroke::new(1.0, PLAY_HEAD),
    );

    let fade = FADE_WIDTH.min(rect.width() / 2.0);
    let mut edges = Mesh::default();
    add_horizontal_gradient(
        &mut edges,
        Rect::from_min_max(rect.left_top(), pos2(rect.left() + fade, rect.bottom())),
        bg,
        Color32::TRANSPARENT,
    );
    add_horizontal_gradient(
        &mut edges,
        Rect::from_min_max(pos2(rect.right() - fade, rect.top()), rect.right_bottom()),
        Color32::TRANSPARENT,
        bg,
    );
    painter.add(Shape::mesh(edges));
}

/// Allocate a waveform canvas and paint the current layout into it.
///
/// Returns the canvas response so the caller can route drags into the
/// transport.
pub fn waveform_canvas(ui: &mut egui::Ui, height: f32, layout: &FrameLayout, kind: SurfaceKind) -> egui::Response {
    let size = egui::vec2(ui.available_width(), height);
    let (response, painter) = ui.allocate_painter(size, egui::Sense::click_and_drag());
    paint_waveform(&painter, response.rect, layout, kind);
    response
}

/// Horizontal extent of `[a, b]` as fractions of the track
fn span_fraction(a: f64, b: f64, duration: f64) -> Option<(f32, f32)> {
    if duration <= 0.0 || !duration.is_finite() || !a.is_finite() || !b.is_finite() {
        return None;
    }
    let start = (a / duration).clamp(0.0, 1.0);
    let end = (b / duration).clamp(start, 1.0);
    Some((start as f32, end as f32))
}

/// Whole-track overview for the loop editor: every fourth bar, with the
/// A-B span highlighted.
pub fn loop_overview(ui: &mut egui::Ui, amplitudes: &[f32], duration: f64, a: f64, b: f64) -> egui::Response {
    let size = egui::vec2(ui.available_width(), 48.0);
    let (response, painter) = ui.allocate_painter(size, egui::Sense::hover());
    let rect = response.rect;
    painter.rect_filled(rect, 6.0, background(SurfaceKind::Expanded));

    let bars: Vec<f32> = amplitudes.iter().step_by(4).copied().collect();
    if !bars.is_empty() {
        let stride = rect.width() / bars.len() as f32;
        let mut mesh = Mesh::default();
        for (i, amp) in bars.iter().enumerate() {
            let x = rect.left() + stride * (i as f32 + 0.5);
            let h = (amp.clamp(0.0, 1.0) * rect.height()).max(1.0);
            let bar = Rect::from_center_size(pos2(x, rect.center().y), egui::vec2(2.0_f32.min(stride), h));
            mesh.add_colored_rect(bar, UNPLAYED);
        }
        painter.add(Shape::mesh(mesh));
    }

    if let Some((start, end)) = span_fraction(a, b, duration) {
        let left = rect.left() + rect.width() * start;
        let right = (rect.left() + rect.width() * end).max(left + 2.0);
        let span = Rect::from_x_y_ranges(left..=right, rect.y_range());
        painter.rect_filled(span, 0.0, MARKER.gamma_multiply(0.3));
        painter.line_segment([span.left_top(), span.left_bottom()], Stroke::new(2.0, MARKER));
        painter.line_segment([span.right_top(), span.right_bottom()], Stroke::new(2.0, MARKER));
    }
    response
}
