use eframe::egui::{self, pos2, Align2, Color32, FontId, Rect, Stroke};

use super::{filter_ops, overlay_color, overlay_pos, plate_colors, tinted_bands, BANDS};
use crate::App;

/// Overlay font sizes are authored against a 360px-high frame.
const REFERENCE_HEIGHT: f32 = 360.0;

impl App {
    pub(crate) fn preview_ui(&mut self, ui: &mut egui::Ui) {
        // 16:9 box that fits the available space
        let avail = ui.available_size();
        let mut w = avail.x.max(320.0);
        let mut h = (w * 9.0 / 16.0).round();
        if h > avail.y { h = avail.y.max(180.0); w = (h * 16.0 / 9.0).round(); }

        let (rect, _resp) = ui.allocate_exact_size(egui::vec2(w, h), egui::Sense::hover());
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 4.0, Color32::from_rgb(12, 12, 12));

        let state = self.session.state();
        let Some(clip) = state.active_clip() else {
            painter.text(rect.center(), Align2::CENTER_CENTER, "Upload a video to get started", FontId::proportional(16.0), Color32::GRAY);
            return;
        };

        let ops = filter_ops(&state.effect);
        let bands = tinted_bands(&ops, plate_colors(clip.id), BANDS);
        let band_w = rect.width() / bands.len() as f32;
        for (i, color) in bands.iter().enumerate() {
            let x0 = rect.min.x + band_w * i as f32;
            let band = Rect::from_min_max(pos2(x0, rect.min.y), pos2(x0 + band_w + 0.5, rect.max.y));
            painter.rect_filled(band, 0.0, *color);
        }
        painter.text(
            rect.left_bottom() + egui::vec2(8.0, -8.0),
            Align2::LEFT_BOTTOM,
            clip.label(),
            FontId::monospace(12.0),
            Color32::from_white_alpha(160),
        );

        let scale = rect.height() / REFERENCE_HEIGHT;
        for o in &state.overlays {
            painter.text(
                overlay_pos(rect, o.x, o.y),
                Align2::CENTER_CENTER,
                &o.text,
                FontId::proportional((o.font_size * scale).max(8.0)),
                overlay_color(&o.color),
            );
        }

        // playhead progress along the bottom edge
        let max = state.max_seek();
        if max > 0.0 {
            let frac = (state.current_time / max).clamp(0.0, 1.0) as f32;
            let y = rect.max.y - 2.0;
            painter.line_segment([pos2(rect.min.x, y), pos2(rect.min.x + rect.width() * frac, y)], Stroke::new(3.0, Color32::from_rgb(230, 60, 60)));
        }
        if state.is_muted {
            painter.text(rect.right_top() + egui::vec2(-8.0, 8.0), Align2::RIGHT_TOP, "muted", FontId::proportional(12.0), Color32::LIGHT_GRAY);
        }
    }
}
