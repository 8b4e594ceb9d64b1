use chrono::{Datelike, Local};
use eframe::egui::{self, Align, Layout, Ui};

use crate::records::KnowledgeLinkKind;

use super::super::Workspace;

impl Workspace {
    pub(in crate::app) fn draw_top_bar(&mut self, ui: &mut Ui) {
        let status = self.engine.status();
        let loading = self.is_loading();

        ui.horizontal(|ui| {
            ui.heading("knowledge-atlas");
            ui.separator();

            let mut next_year = None;
            ui.add_enabled_ui(!loading, |ui| {
                if ui
                    .button("◀")
                    .on_hover_text("Previous year")
                    .clicked()
                {
                    next_year = Some(self.year - 1);
                }
                ui.strong(self.year.to_string());
                if ui.button("▶").on_hover_text("Next year").clicked() {
                    next_year = Some(self.year + 1);
                }
                let current = Local::now().year();
                if ui
                    .add_enabled(self.year != current, egui::Button::new("This year"))
                    .clicked()
                {
                    next_year = Some(current);
                }
                if ui
                    .button("Reload")
                    .on_hover_text("Fetch the records for this year again.")
                    .clicked()
                {
                    next_year = Some(self.year);
                }
            });
            if let Some(year) = next_year {
                self.request_load(year);
            }
            if loading {
                ui.spinner();
            }

            ui.separator();

            let mut link_mode = status.link_mode;
            if ui
                .toggle_value(&mut link_mode, "Link mode")
                .on_hover_text("Click two knowledge items to connect them. Esc leaves link mode.")
                .changed()
            {
                self.engine.toggle_link_mode();
            }

            let mut kind = self.engine.link_kind();
            egui::ComboBox::from_id_salt("link_kind")
                .selected_text(kind.as_str())
                .show_ui(ui, |ui| {
                    for option in KnowledgeLinkKind::ALL {
                        ui.selectable_value(&mut kind, option, option.as_str());
                    }
                });
            if kind != self.engine.link_kind() {
                self.engine.set_link_kind(kind);
            }

            if status.link_mode {
                match &status.pending_label {
                    Some(label) => ui.label(format!("{label} → pick a target")),
                    None => ui.label("pick a source item"),
                };
            }
            if self.mutations_in_flight > 0 {
                ui.label(format!("saving {}…", self.mutations_in_flight));
            }

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                ui.label(format!("zoom: {}%", status.zoom_percent));
                ui.label(format!(
                    "nodes: {} ({} visible)",
                    status.node_count, status.visible_nodes
                ));
                ui.label(format!("links: {}", status.knowledge_link_count));
                ui.label(if status.settled { "settled" } else { "laying out" });
            });
        });
    }
}
