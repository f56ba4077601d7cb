use eframe::egui::{self, Color32};
use egui_extras::{Column, TableBuilder};
use timeline::{format_time, timeline_header, ClipId};

use crate::App;

const ACTIVE: Color32 = Color32::from_rgb(40, 90, 160);

impl App {
    /// Clip list. Clicking a clip makes it active.
    pub(crate) fn strip_ui(&mut self, ui: &mut egui::Ui) {
        let state = self.session.state();
        ui.strong(timeline_header(state.clips.len()));
        if state.clips.is_empty() {
            ui.weak("No clips yet.");
            return;
        }

        let mut picked: Option<ClipId> = None;
        TableBuilder::new(ui)
            .striped(true)
            .column(Column::auto())
            .column(Column::remainder())
            .column(Column::auto())
            .column(Column::auto())
            .header(18.0, |mut h| {
                h.col(|ui| { ui.strong("#"); });
                h.col(|ui| { ui.strong("Clip"); });
                h.col(|ui| { ui.strong("Length"); });
                h.col(|ui| { ui.strong("Used"); });
            })
            .body(|mut b| {
                for (i, clip) in state.clips.iter().enumerate() {
                    let active = state.active == Some(clip.id);
                    b.row(20.0, |mut r| {
                        r.col(|ui| { ui.monospace(format!("{}", i + 1)); });
                        r.col(|ui| {
                            let text = egui::RichText::new(clip.label());
                            let text = if active { text.color(ACTIVE).strong() } else { text };
                            if ui.selectable_label(active, text).clicked() && !active {
                                picked = Some(clip.id);
                            }
                        });
                        r.col(|ui| { ui.monospace(format_time(clip.duration)); });
                        r.col(|ui| {
                            let used = format!("{}-{}", format_time(clip.trim.start), format_time(clip.trim.end));
                            if clip.trimmed_duration() < clip.duration {
                                ui.colored_label(Color32::YELLOW, used);
                            } else {
                                ui.monospace(used);
                            }
                        });
                    });
                }
            });

        if let Some(id) = picked {
            let r = self.session.select(id);
            self.report(r);
        }
    }
}
