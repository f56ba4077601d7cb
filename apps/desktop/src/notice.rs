use eframe::egui;

use crate::App;

impl App {
    /// Modal-style window for the session notice (the export message).
    pub(crate) fn notice_window(&mut self, ctx: &egui::Context) {
        let Some(text) = self.session.state().notice.clone() else { return; };
        let mut dismiss = false;
        egui::Window::new("Export")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.set_max_width(360.0);
                ui.label(text);
                ui.add_space(6.0);
                if ui.button("OK").clicked() {
                    dismiss = true;
                }
            });
        if dismiss {
            let r = self.session.dismiss_notice();
            self.report(r);
        }
    }
}
