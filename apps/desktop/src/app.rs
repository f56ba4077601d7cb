use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use eframe::egui;
use editor::{ClockSurface, EditorConfig, EditorError, Session};
use media_io::{FfprobeProbe, MediaError, MediaInfo, MediaProbe};
use timeline::{format_time, EffectPreset, PRESETS};
use tracing::{error, warn};

/// Stands in when ffprobe cannot be found, so uploads fail visibly instead of the app refusing to start.
struct MissingProbe(String);

impl MediaProbe for MissingProbe {
    fn probe(&self, _path: &Path) -> Result<MediaInfo, MediaError> {
        Err(MediaError::ToolMissing(self.0.clone()))
    }
}

pub(crate) struct App {
    pub(crate) session: Session<ClockSurface>,
    /// Last user-visible failure, shown under the toolbar.
    pub(crate) status: Option<String>,
}

impl App {
    pub(crate) fn new(config: EditorConfig) -> Self {
        let probe: Arc<dyn MediaProbe> = match FfprobeProbe::locate(config.ffprobe.as_deref()) {
            Ok(p) => Arc::new(p),
            Err(e) => {
                error!("{e}; uploads will not resolve durations");
                Arc::new(MissingProbe(e.to_string()))
            }
        };
        Self { session: Session::new(&config, ClockSurface::new(), probe), status: None }
    }

    pub(crate) fn report(&mut self, result: Result<(), EditorError>) {
        if let Err(e) = result {
            warn!("{e}");
            self.status = Some(e.to_string());
        }
    }

    fn upload(&mut self, paths: Vec<PathBuf>) {
        match self.session.upload(&paths) {
            Ok(r) if r.queued.is_empty() && !r.ignored.is_empty() => {
                self.status = Some("Only video files can be added.".into());
            }
            Ok(_) => {}
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    fn poll_session(&mut self) {
        let report = self.session.poll();
        if let Some(p) = report.unresolved.last() {
            let name = p.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            self.status = Some(format!("Could not read the duration of {name}."));
        }
    }

    fn toolbar_ui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("quickcut");
            ui.separator();
            if ui.button("Upload Video").clicked() {
                let exts = media_io::video_extensions();
                if let Some(paths) = rfd::FileDialog::new().add_filter("Video", exts.as_slice()).pick_files() {
                    self.upload(paths);
                }
            }
            if self.session.pending_probes() > 0 {
                ui.spinner();
                ui.label(format!("Reading {} file(s)...", self.session.pending_probes()));
            }
            if let Some(job) = &self.session.state().processing {
                ui.spinner();
                ui.label(match job.kind {
                    jobs::JobKind::AutoEdit => "AI is editing...",
                    jobs::JobKind::Export => "Exporting...",
                });
            }
        });
        if let Some(msg) = self.status.clone() {
            ui.horizontal(|ui| {
                ui.colored_label(egui::Color32::LIGHT_RED, msg);
                if ui.small_button("x").clicked() {
                    self.status = None;
                }
            });
        }
    }

    fn transport_ui(&mut self, ui: &mut egui::Ui) {
        let state = self.session.state().clone();
        let enabled = state.has_active_clip();
        ui.horizontal(|ui| {
            let play = if state.is_playing { "Pause (Space)" } else { "Play (Space)" };
            if ui.add_enabled(enabled, egui::Button::new(play)).clicked() {
                let r = self.session.toggle_play();
                self.report(r);
            }
            if ui.add_enabled(enabled, egui::Button::new("Reset")).clicked() {
                let r = self.session.reset();
                self.report(r);
            }
            let mute = if state.is_muted { "Unmute" } else { "Mute" };
            if ui.add_enabled(enabled, egui::Button::new(mute)).clicked() {
                let r = self.session.toggle_mute();
                self.report(r);
            }
            ui.separator();
            let max = state.max_seek();
            let mut t = state.current_time.min(max);
            let slider = egui::Slider::new(&mut t, 0.0..=max).show_value(false);
            if ui.add_enabled(enabled && max > 0.0, slider).changed() {
                let r = self.session.seek(t);
                self.report(r);
            }
            ui.monospace(format!("{} / {}", format_time(state.current_time), format_time(max)));
        });
    }

    fn tools_ui(&mut self, ui: &mut egui::Ui) {
        let state = self.session.state().clone();
        let editable = state.has_active_clip() && !state.is_processing();

        ui.heading("Effects");
        let current = EffectPreset::matching(&state.effect);
        ui.horizontal_wrapped(|ui| {
            for preset in PRESETS.iter() {
                let selected = current.is_some_and(|c| c.name == preset.name);
                if ui.add_enabled(editable, egui::SelectableLabel::new(selected, preset.name)).clicked() {
                    let r = self.session.set_effect(preset.token());
                    self.report(r);
                }
            }
        });
        if current.is_none() && !state.effect.is_none() {
            ui.small(format!("custom: {}", state.effect));
        }

        ui.separator();
        ui.heading("Text");
        if ui.add_enabled(editable, egui::Button::new("Add Text")).clicked() {
            let r = self.session.add_text_overlay();
            self.report(r);
        }
        for o in &state.overlays {
            ui.small(format!("\"{}\" at {}%, {}%", o.text, o.x, o.y));
        }

        ui.separator();
        ui.heading("AI");
        if ui.add_enabled(editable, egui::Button::new("AI Auto-Edit")).clicked() {
            let r = self.session.auto_edit().map(drop);
            self.report(r);
        }
        if ui.add_enabled(editable, egui::Button::new("Export")).clicked() {
            let r = self.session.export().map(drop);
            self.report(r);
        }
        if state.exceeds_limit() {
            ui.add_space(8.0);
            ui.colored_label(
                egui::Color32::YELLOW,
                format!(
                    "This video is {} long. Only the first {} will be used; AI Auto-Edit can pick the best part.",
                    format_time(state.duration),
                    format_time(state.limit)
                ),
            );
        }
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_session();

        let state = self.session.state();
        if state.is_playing {
            ctx.request_repaint_after(Duration::from_millis(16));
        } else if state.is_processing() || self.session.pending_probes() > 0 {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        if ctx.input(|i| i.key_pressed(egui::Key::Space)) {
            let r = self.session.toggle_play();
            self.report(r);
        }

        egui::TopBottomPanel::top("top").show(ctx, |ui| self.toolbar_ui(ui));
        egui::SidePanel::right("tools").min_width(220.0).show(ctx, |ui| self.tools_ui(ui));
        egui::TopBottomPanel::bottom("timeline").min_height(140.0).show(ctx, |ui| self.strip_ui(ui));
        egui::CentralPanel::default().show(ctx, |ui| {
            self.transport_ui(ui);
            ui.separator();
            self.preview_ui(ui);
        });
        self.notice_window(ctx);
    }
}
