//! eframe application: wires the transport, render loop and views together

use std::path::PathBuf;
use std::time::Instant;

use eframe::egui;

use crate::audio::CpalDevice;
use crate::config::{save_config, PlayerConfig};
use crate::render::{RenderLoop, SurfaceKind};
use crate::track::Track;
use crate::transport::looping::LoopDraft;
use crate::transport::{Transport, TransportEvent};

use super::history::RecentlyPlayed;

/// Floating windows over the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Panel {
    Settings,
    Bookmarks,
    SleepTimer,
    LoopEditor,
}

pub struct ZemaApp {
    pub(super) transport: Transport<CpalDevice>,
    pub(super) render: RenderLoop,
    pub(super) config: PlayerConfig,
    pub(super) config_path: PathBuf,
    pub(super) recent: RecentlyPlayed,
    pub(super) panel: Option<Panel>,
    /// Bookmark being renamed: (id, draft label)
    pub(super) renaming: Option<(String, String)>,
    pub(super) sleep_hours: u32,
    pub(super) sleep_minutes: u32,
    /// Bounds shown in the loop editor until "Done"
    pub(super) loop_draft: LoopDraft,
    /// Waveform canvas from the previous frame
    pub(super) canvas_rect: egui::Rect,
    last_tick: Instant,
    fullscreen: bool,
}

impl ZemaApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        config: PlayerConfig,
        config_path: PathBuf,
        initial_path: Option<PathBuf>,
    ) -> Self {
        let transport = Transport::new(CpalDevice::new(), config.transport_settings());
        let render = RenderLoop::new(config.display.waveform_zoom());
        let mut app = Self {
            transport,
            render,
            config,
            config_path,
            recent: RecentlyPlayed::new(),
            panel: None,
            renaming: None,
            sleep_hours: 0,
            sleep_minutes: 30,
            loop_draft: LoopDraft::default(),
            canvas_rect: egui::Rect::ZERO,
            last_tick: Instant::now(),
            fullscreen: false,
        };

        if let Some(path) = initial_path {
            app.open_path(path);
        }
        app
    }

    pub(super) fn open_path(&mut self, path: PathBuf) {
        if !path.exists() {
            log::warn!("open_path: {:?} does not exist", path);
            return;
        }
        self.play(Track::from_path(&path));
    }

    pub(super) fn play(&mut self, track: Track) {
        self.transport.play_track(track);
        self.render.start();
    }

    pub(super) fn close_player(&mut self) {
        self.transport.close();
        self.render.stop();
        self.render.set_kind(SurfaceKind::Mini);
        self.panel = None;
        self.renaming = None;
    }

    pub(super) fn persist_config(&mut self) {
        self.config.transport.seek_amount_secs = self.transport.seek_amount();
        self.config.transport.repeat_mode = self.transport.repeat_mode();
        self.config.display.waveform_zoom = self.render.zoom();
        if let Err(e) = save_config(&self.config, &self.config_path) {
            log::warn!("persist_config: {:#}", e);
        }
    }

    pub(super) fn toggle_panel(&mut self, panel: Panel) {
        self.panel = if self.panel == Some(panel) { None } else { Some(panel) };
        if self.panel == Some(Panel::LoopEditor) {
            self.loop_draft =
                LoopDraft::from_region(self.transport.loop_region(), self.transport.clock().read());
        }
    }

    fn handle_transport_events(&mut self) {
        for event in self.transport.take_events() {
            match event {
                TransportEvent::TrackStarted(track) => {
                    log::info!("now playing: {}", track.title);
                    self.recent.push(track);
                    let tempo = self.config.transport.default_tempo();
                    if tempo != self.transport.dsp().tempo_percent() {
                        self.transport.set_tempo(tempo);
                    }
                    if self.config.display.open_fullscreen_on_track_change {
                        self.render.set_kind(SurfaceKind::Fullscreen);
                    }
                }
                TransportEvent::TrackEnded { track_id } => {
                    log::info!("track ended: {}", track_id);
                }
            }
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() || self.transport.current_track().is_none() {
            return;
        }
        let pressed = |key| ctx.input(|i| i.key_pressed(key));

        if pressed(egui::Key::Space) {
            self.transport.toggle_play();
        }
        if pressed(egui::Key::ArrowLeft) {
            self.transport.skip_backward();
        }
        if pressed(egui::Key::ArrowRight) {
            self.transport.skip_forward();
        }
        if pressed(egui::Key::OpenBracket) {
            self.transport.toggle_loop_a();
        }
        if pressed(egui::Key::CloseBracket) {
            self.transport.toggle_loop_b();
        }
        if pressed(egui::Key::L) {
            self.transport.toggle_looping();
        }
        if pressed(egui::Key::M) {
            self.transport.add_bookmark();
        }
        if pressed(egui::Key::Escape) && self.render.kind() == SurfaceKind::Fullscreen {
            self.render.set_kind(SurfaceKind::Expanded);
        }
    }

    /// A drag or slider gesture released outside its widget still has to end
    fn handle_global_release(&mut self, ctx: &egui::Context) {
        if !self.transport.scrub().guard().is_armed() {
            return;
        }
        let released = ctx.input(|i| i.pointer.any_released() || !i.pointer.any_down());
        if released {
            self.transport.on_global_release();
        }
    }

    fn sync_fullscreen(&mut self, ctx: &egui::Context) {
        let want = self.render.kind() == SurfaceKind::Fullscreen;
        if want != self.fullscreen {
            ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(want));
            self.fullscreen = want;
        }
    }
}

impl eframe::App for ZemaApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.transport.handle_device_events();

        let now = Instant::now();
        self.transport.tick(now - self.last_tick);
        self.last_tick = now;

        self.handle_transport_events();
        self.handle_shortcuts(ctx);

        let visible = self.transport.current_track().is_some();
        if visible {
            self.render.start();
        }
        let canvas = if self.render.kind() == SurfaceKind::Mini {
            egui::Rect::ZERO
        } else {
            self.canvas_rect
        };
        self.render
            .frame(&mut self.transport, visible, canvas, ctx.pixels_per_point());

        self.mini_player(ctx);
        egui::CentralPanel::default().show(ctx, |ui| self.central_panel(ui));
        self.panels(ctx);

        self.handle_global_release(ctx);
        self.sync_fullscreen(ctx);

        // Keep ticking the sleep timer even when nothing is drawn
        if self.render.is_running() {
            ctx.request_repaint();
        } else if self.transport.sleep_timer().is_active() {
            ctx.request_repaint_after(std::time::Duration::from_millis(250));
        }
    }
}
