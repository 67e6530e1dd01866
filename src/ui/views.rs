//! Player views: mini bar, expanded/fullscreen player, floating panels

use eframe::egui::{self, RichText};
use rfd::FileDialog;

use crate::render::layout::{MAX_ZOOM, MIN_ZOOM};
use crate::render::paint::{loop_overview, waveform_canvas};
use crate::render::SurfaceKind;
use crate::timefmt::{format_countdown, format_time};
use crate::transport::dsp::{
    MAX_PITCH_SEMITONES, MAX_TEMPO_PERCENT, MIN_PITCH_SEMITONES, MIN_TEMPO_PERCENT, TEMPO_PRESETS,
};
use crate::transport::looping::{join_time, split_time, LoopDraft, LoopPhase};
use crate::transport::sleep_timer::PRESET_MINUTES;
use crate::transport::SEEK_AMOUNTS;

use super::app::{Panel, ZemaApp};

impl ZemaApp {
    /// Progress slider routed through the scrub handler: previews while
    /// dragging, seeks once on release.
    fn seek_slider(&mut self, ui: &mut egui::Ui) {
        let duration = self.transport.clock().duration().max(0.0);
        let mut value = self.render.readout().slider_value;
        let response = ui.add_enabled(
            duration > 0.0,
            egui::Slider::new(&mut value, 0.0..=duration.max(f64::EPSILON)).show_value(false),
        );
        if response.drag_started() {
            self.transport.begin_slider_seek();
        }
        if response.changed() {
            self.transport.slider_seek_changed(value);
        }
        if response.drag_stopped() || (response.clicked() && !response.dragged()) {
            self.transport.end_slider_seek();
        }
    }

    fn play_button(&mut self, ui: &mut egui::Ui) {
        let label = if self.transport.is_playing() { "Pause" } else { "Play" };
        if ui.button(label).clicked() {
            self.transport.toggle_play();
        }
    }

    pub(super) fn mini_player(&mut self, ctx: &egui::Context) {
        if self.transport.current_track().is_none() || self.render.kind() == SurfaceKind::Fullscreen {
            return;
        }
        egui::TopBottomPanel::bottom("mini_player").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                let title = self
                    .transport
                    .current_track()
                    .map(|t| t.title.clone())
                    .unwrap_or_default();
                ui.label(RichText::new(title).strong());
                ui.separator();
                if ui.button("<<").clicked() {
                    self.transport.skip_backward();
                }
                self.play_button(ui);
                if ui.button(">>").clicked() {
                    self.transport.skip_forward();
                }
                ui.separator();
                let expand = match self.render.kind() {
                    SurfaceKind::Mini => "Expand",
                    _ => "Collapse",
                };
                if ui.button(expand).clicked() {
                    let next = match self.render.kind() {
                        SurfaceKind::Mini => SurfaceKind::Expanded,
                        _ => SurfaceKind::Mini,
                    };
                    self.render.set_kind(next);
                }
                if ui.button("Close").clicked() {
                    self.close_player();
                }
            });
            ui.horizontal(|ui| {
                ui.label(self.render.readout().time_label.clone());
                ui.spacing_mut().slider_width = (ui.available_width() - 60.0).max(60.0);
                self.seek_slider(ui);
                ui.label(format_time(self.transport.clock().duration()));
            });
            ui.add_space(4.0);
        });
    }

    pub(super) fn central_panel(&mut self, ui: &mut egui::Ui) {
        if self.transport.current_track().is_none() || self.render.kind() == SurfaceKind::Mini {
            self.library(ui);
            return;
        }
        self.player(ui);
    }

    /// Stand-in for the library: open a file or replay a recent track
    fn library(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(10.0);
            if ui.button("Open File").clicked() {
                if let Some(path) = FileDialog::new().pick_file() {
                    self.open_path(path);
                }
            }
        });
        if self.recent.is_empty() {
            return;
        }
        ui.add_space(10.0);
        ui.heading("Recently played");
        let mut chosen = None;
        for track in self.recent.iter() {
            if ui.selectable_label(false, &track.title).clicked() {
                chosen = Some(track.clone());
            }
        }
        if let Some(track) = chosen {
            self.play(track);
        }
    }

    fn player(&mut self, ui: &mut egui::Ui) {
        let fullscreen = self.render.kind() == SurfaceKind::Fullscreen;
        ui.horizontal(|ui| {
            if let Some(track) = self.transport.current_track() {
                ui.heading(&track.title);
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let label = if fullscreen { "Exit fullscreen" } else { "Fullscreen" };
                if ui.button(label).clicked() {
                    let next = if fullscreen { SurfaceKind::Expanded } else { SurfaceKind::Fullscreen };
                    self.render.set_kind(next);
                }
                egui::ComboBox::from_id_source("zoom")
                    .selected_text(format!("Zoom {}x", self.render.zoom()))
                    .show_ui(ui, |ui| {
                        for level in MIN_ZOOM..=MAX_ZOOM {
                            if ui
                                .selectable_label(self.render.zoom() == level, format!("{level}x"))
                                .clicked()
                            {
                                self.render.set_zoom(level);
                                self.persist_config();
                            }
                        }
                    });
            });
        });

        let height = if fullscreen {
            (ui.available_height() * 0.5).max(120.0)
        } else {
            160.0
        };
        let response = waveform_canvas(ui, height, self.render.layout(), self.render.kind());
        self.canvas_rect = response.rect;
        self.waveform_gestures(&response);

        if fullscreen {
            ui.horizontal(|ui| {
                ui.label(self.render.readout().time_label.clone());
                ui.spacing_mut().slider_width = (ui.available_width() - 60.0).max(60.0);
                self.seek_slider(ui);
                ui.label(format_time(self.transport.clock().duration()));
            });
            ui.horizontal(|ui| {
                if ui.button("<<").clicked() {
                    self.transport.skip_backward();
                }
                self.play_button(ui);
                if ui.button(">>").clicked() {
                    self.transport.skip_forward();
                }
            });
        }

        ui.add_space(8.0);
        self.dsp_controls(ui);
        ui.add_space(8.0);
        self.loop_controls(ui);
        ui.add_space(8.0);
        ui.horizontal(|ui| {
            if ui.button("Bookmarks").clicked() {
                self.toggle_panel(Panel::Bookmarks);
            }
            let sleep = match self.transport.sleep_timer().remaining() {
                Some(secs) => format!("Sleep {}", format_countdown(secs)),
                None => "Sleep timer".to_string(),
            };
            if ui.button(sleep).clicked() {
                self.toggle_panel(Panel::SleepTimer);
            }
            if ui.button(self.transport.repeat_mode().display_name()).clicked() {
                self.transport.cycle_repeat();
                self.persist_config();
            }
            if ui.button("Settings").clicked() {
                self.toggle_panel(Panel::Settings);
            }
        });
    }

    fn waveform_gestures(&mut self, response: &egui::Response) {
        let pointer_x = response.interact_pointer_pos().map(|p| p.x);
        if response.drag_started() {
            if let Some(x) = pointer_x {
                self.transport.begin_waveform_drag(x);
            }
        }
        if response.dragged() {
            if let (Some(x), Some(pps)) = (pointer_x, self.render.pixels_per_second(&self.transport)) {
                self.transport.drag_waveform(x, pps);
            }
        }
        if response.drag_stopped() {
            self.transport.end_waveform_drag();
        }
    }

    fn dsp_controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Tempo");
            if ui.small_button("-").clicked() {
                self.transport.nudge_tempo(-1.0);
            }
            let mut tempo = self.transport.dsp().tempo_percent();
            if ui
                .add(egui::Slider::new(&mut tempo, MIN_TEMPO_PERCENT..=MAX_TEMPO_PERCENT).suffix("%").max_decimals(0))
                .changed()
            {
                self.transport.set_tempo(tempo);
            }
            if ui.small_button("+").clicked() {
                self.transport.nudge_tempo(1.0);
            }
        });
        ui.horizontal(|ui| {
            ui.label("Pitch");
            if ui.small_button("-").clicked() {
                self.transport.nudge_pitch(-1.0);
            }
            let mut pitch = self.transport.dsp().pitch_semitones();
            if ui
                .add(
                    egui::Slider::new(&mut pitch, MIN_PITCH_SEMITONES..=MAX_PITCH_SEMITONES)
                        .step_by(0.1)
                        .suffix(" st")
                        .max_decimals(1),
                )
                .changed()
            {
                self.transport.set_pitch(pitch);
            }
            if ui.small_button("+").clicked() {
                self.transport.nudge_pitch(1.0);
            }
            if self.transport.dsp().effect_failed() && ui.button("Repair audio").clicked() {
                self.transport.repair_audio();
            }
        });
    }

    fn loop_controls(&mut self, ui: &mut egui::Ui) {
        let region = self.transport.loop_region().clone();
        ui.horizontal(|ui| {
            let a = match region.a() {
                Some(t) => format!("A {}", format_time(t)),
                None => "Set A".to_string(),
            };
            if ui.selectable_label(region.a().is_some(), a).clicked() {
                self.transport.toggle_loop_a();
            }
            let b = match region.b() {
                Some(t) => format!("B {}", format_time(t)),
                None => "Set B".to_string(),
            };
            let b_enabled = region.phase() != LoopPhase::Unset;
            if ui
                .add_enabled(b_enabled, egui::SelectableLabel::new(region.b().is_some(), b))
                .clicked()
            {
                self.transport.toggle_loop_b();
            }
            if region.phase() == LoopPhase::Armed {
                let label = if region.is_looping() { "Looping" } else { "Loop off" };
                if ui.selectable_label(region.is_looping(), label).clicked() {
                    self.transport.toggle_looping();
                }
            }
            if region.phase() != LoopPhase::Unset && ui.button("Clear loop").clicked() {
                self.transport.clear_loop();
            }
            if ui.button("Edit loop").clicked() {
                self.toggle_panel(Panel::LoopEditor);
            }
        });
    }

    /// Minutes : seconds . milliseconds for one loop bound
    fn bound_picker(ui: &mut egui::Ui, label: &str, value: &mut f64, max_minutes: u32) {
        let (mut minutes, mut seconds, mut millis) = split_time(*value);
        ui.horizontal(|ui| {
            ui.label(RichText::new(label).strong());
            let mut changed = ui
                .add(egui::DragValue::new(&mut minutes).range(0..=max_minutes))
                .changed();
            ui.label(":");
            changed |= ui.add(egui::DragValue::new(&mut seconds).range(0..=59)).changed();
            ui.label(".");
            changed |= ui
                .add(egui::DragValue::new(&mut millis).range(0..=999).speed(5.0))
                .changed();
            if changed {
                *value = join_time(minutes, seconds, millis);
            }
        });
    }

    fn loop_editor_panel(&mut self, ui: &mut egui::Ui) {
        let duration = self.transport.clock().duration();
        ui.label(format_time(self.transport.clock().read()));
        loop_overview(
            ui,
            self.transport.waveform().amplitudes(),
            duration,
            self.loop_draft.a,
            self.loop_draft.b,
        );
        ui.add_space(6.0);

        let max_minutes = (duration / 60.0).floor().max(0.0) as u32;
        Self::bound_picker(ui, "A", &mut self.loop_draft.a, max_minutes);
        Self::bound_picker(ui, "B", &mut self.loop_draft.b, max_minutes);
        if !self.loop_draft.is_valid() {
            ui.label(RichText::new("B must be after A").weak());
        }

        ui.add_space(6.0);
        let looping = self.transport.loop_region().is_looping();
        let armed = self.transport.loop_region().phase() == LoopPhase::Armed;
        if ui
            .add_enabled(armed, egui::SelectableLabel::new(looping, "Enable loop"))
            .clicked()
        {
            self.transport.toggle_looping();
        }
        ui.horizontal(|ui| {
            let done = ui.add_enabled(self.loop_draft.is_valid(), egui::Button::new("Done"));
            if done.clicked() {
                let LoopDraft { a, b } = self.loop_draft;
                match self.transport.commit_loop(a, b) {
                    Ok(()) => self.panel = None,
                    Err(e) => log::warn!("loop_editor_panel: {}", e),
                }
            }
            if ui.button("Clear loop").clicked() {
                self.transport.clear_loop();
                self.loop_draft = LoopDraft::from_region(self.transport.loop_region(), self.transport.clock().read());
            }
        });
    }

    pub(super) fn panels(&mut self, ctx: &egui::Context) {
        let Some(panel) = self.panel else {
            return;
        };
        let mut open = true;
        match panel {
            Panel::Settings => {
                egui::Window::new("Settings")
                    .open(&mut open)
                    .show(ctx, |ui| self.settings_panel(ui));
            }
            Panel::Bookmarks => {
                egui::Window::new("Bookmarks")
                    .open(&mut open)
                    .show(ctx, |ui| self.bookmarks_panel(ui));
            }
            Panel::SleepTimer => {
                egui::Window::new("Sleep timer")
                    .open(&mut open)
                    .show(ctx, |ui| self.sleep_timer_panel(ui));
            }
            Panel::LoopEditor => {
                egui::Window::new("A-B loop")
                    .open(&mut open)
                    .show(ctx, |ui| self.loop_editor_panel(ui));
            }
        }
        if !open {
            self.panel = None;
            self.renaming = None;
        }
    }

    fn settings_panel(&mut self, ui: &mut egui::Ui) {
        ui.label("Skip distance");
        ui.horizontal(|ui| {
            for amount in SEEK_AMOUNTS {
                if ui
                    .selectable_label(self.transport.seek_amount() == amount, format!("{amount}s"))
                    .clicked()
                {
                    self.transport.set_seek_amount(amount);
                    self.persist_config();
                }
            }
        });

        ui.add_space(6.0);
        ui.label("Playback speed");
        ui.horizontal(|ui| {
            for speed in TEMPO_PRESETS {
                let percent = speed * 100.0;
                let selected = self.transport.dsp().tempo_percent() == percent;
                if ui.selectable_label(selected, format!("{speed}x")).clicked() {
                    self.transport.set_tempo(percent);
                }
            }
        });

        ui.add_space(6.0);
        if ui
            .checkbox(
                &mut self.config.display.open_fullscreen_on_track_change,
                "Open fullscreen when a track starts",
            )
            .changed()
        {
            self.persist_config();
        }

        ui.add_space(6.0);
        ui.horizontal(|ui| {
            if ui.button("Reset to defaults").clicked() {
                self.transport.reset_defaults();
                self.persist_config();
            }
            if ui.button("Repair audio").clicked() {
                self.transport.repair_audio();
            }
        });
    }

    fn bookmarks_panel(&mut self, ui: &mut egui::Ui) {
        if ui.button("Add bookmark here").clicked() {
            self.transport.add_bookmark();
        }
        ui.separator();

        let bookmarks = self.transport.bookmarks().to_vec();
        if bookmarks.is_empty() {
            ui.label("No bookmarks yet");
            return;
        }
        egui::ScrollArea::vertical().max_height(240.0).show(ui, |ui| {
            for bookmark in bookmarks {
                ui.horizontal(|ui| {
                    if ui.button(format_time(bookmark.time)).clicked() {
                        self.transport.jump_to_bookmark(&bookmark.id);
                    }
                    let editing = self.renaming.as_ref().is_some_and(|(id, _)| *id == bookmark.id);
                    if editing {
                        let mut commit = false;
                        if let Some((_, draft)) = self.renaming.as_mut() {
                            let response = ui.text_edit_singleline(draft);
                            commit = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                        }
                        if commit || ui.button("Save").clicked() {
                            if let Some((id, draft)) = self.renaming.take() {
                                self.transport.rename_bookmark(&id, draft.trim());
                            }
                        }
                    } else {
                        ui.label(&bookmark.label);
                        if ui.small_button("Rename").clicked() {
                            self.renaming = Some((bookmark.id.clone(), bookmark.label.clone()));
                        }
                    }
                    if ui.small_button("Delete").clicked() {
                        self.transport.remove_bookmark(&bookmark.id);
                    }
                });
            }
        });
    }

    fn sleep_timer_panel(&mut self, ui: &mut egui::Ui) {
        match self.transport.sleep_timer().remaining() {
            Some(secs) => {
                ui.label(RichText::new(format_countdown(secs)).heading());
            }
            None => {
                ui.label("Off");
            }
        }
        ui.add_space(6.0);
        ui.horizontal_wrapped(|ui| {
            for minutes in PRESET_MINUTES {
                if ui.button(format!("{minutes} min")).clicked() {
                    self.transport.set_sleep_timer_minutes(minutes);
                }
            }
        });
        ui.add_space(6.0);
        ui.horizontal(|ui| {
            ui.add(egui::Slider::new(&mut self.sleep_hours, 0..=12).suffix(" h"));
            ui.add(egui::Slider::new(&mut self.sleep_minutes, 0..=59).suffix(" min"));
            if ui.button("Set").clicked() {
                self.transport
                    .set_sleep_timer_hours_minutes(self.sleep_hours, self.sleep_minutes);
            }
        });
        if self.transport.sleep_timer().is_active() && ui.button("Cancel timer").clicked() {
            self.transport.cancel_sleep_timer();
        }
    }
}
