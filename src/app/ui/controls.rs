use eframe::egui::{self, Key, RichText, Ui};

use super::super::graph::NodeKind;
use super::super::physics::ForceConfig;
use super::super::{Workspace, apply_chrome_theme};

impl Workspace {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Graph Controls");
        ui.separator();
        ui.add_space(4.0);

        ui.label("Search")
            .on_hover_text("Fuzzy-highlight nodes whose label matches.");
        let search_response = ui.text_edit_singleline(&mut self.search);
        if search_response.changed() {
            self.engine.set_search(&self.search);
        }
        let submitted =
            search_response.lost_focus() && ui.input(|input| input.key_pressed(Key::Enter));
        let status = self.engine.status();
        ui.horizontal(|ui| {
            if !self.search.trim().is_empty() {
                ui.label(format!("{} matches", status.search_matches));
            }
            let jump = ui
                .add_enabled(status.search_matches > 0, egui::Button::new("Jump to best"))
                .on_hover_text("Centre the view on the best match and select it. Enter does the same.");
            if (jump.clicked() || submitted) && self.engine.jump_to_best_match().is_none() {
                self.toasts.info("No visible node matches the search");
            }
        });

        ui.separator();
        ui.label(RichText::new("Item kinds").strong());
        for kind in NodeKind::ITEM_KINDS {
            let mut shown = !self.engine.hidden_kinds().contains(&kind);
            if ui.checkbox(&mut shown, kind.display_name()).changed() {
                self.engine.set_hidden(kind, !shown);
            }
        }

        ui.separator();
        ui.horizontal(|ui| {
            let theme = self.palette.theme();
            if ui
                .button(format!("Theme: {theme}"))
                .on_hover_text("Switch between the dark and light palettes.")
                .clicked()
            {
                let next = theme.toggled();
                self.palette.set_theme(next);
                apply_chrome_theme(ui.ctx(), next);
            }
            if ui
                .button("Reset view")
                .on_hover_text("Zoom back to 100% and centre the layout.")
                .clicked()
            {
                self.engine.reset_view();
            }
        });

        ui.separator();
        ui.collapsing("Physics tuning", |ui| self.draw_physics_tuning(ui));

        ui.separator();
        let stats = status.stats;
        ui.label(RichText::new("Last build").strong());
        ui.label(format!("records read: {}", stats.records));
        ui.label(format!("skipped (no usable date): {}", stats.skipped_undated));
        ui.label(format!("outside {}: {}", status.year, stats.skipped_out_of_year));
        ui.label(format!("dangling links dropped: {}", stats.dropped_links));
    }

    fn draw_physics_tuning(&mut self, ui: &mut Ui) {
        let mut config = self.engine.force_config();

        ui.add(
            egui::Slider::new(&mut config.repulsion_scale, 0.1..=4.0)
                .text("Repulsion")
                .clamping(egui::SliderClamping::Always),
        )
        .on_hover_text("Scales how hard nodes push each other apart.");
        ui.add(
            egui::Slider::new(&mut config.link_scale, 0.1..=3.0)
                .text("Link strength")
                .clamping(egui::SliderClamping::Always),
        )
        .on_hover_text("Scales the pull of hierarchy and knowledge links.");
        ui.add(
            egui::Slider::new(&mut config.collision_scale, 0.0..=2.0)
                .text("Collision")
                .clamping(egui::SliderClamping::Always),
        )
        .on_hover_text("How firmly overlapping nodes are separated.");
        ui.add(
            egui::Slider::new(&mut config.velocity_decay, 0.05..=0.9)
                .text("Velocity decay")
                .clamping(egui::SliderClamping::Always),
        )
        .on_hover_text("Fraction of velocity lost every tick; higher settles faster.");
        ui.add(
            egui::Slider::new(&mut config.center_strength, 0.0..=0.3)
                .text("Centering")
                .clamping(egui::SliderClamping::Always),
        )
        .on_hover_text("Pull of the whole layout towards the canvas centre.");

        if ui.button("Defaults").clicked() {
            config = ForceConfig::default();
        }
        self.engine.set_force_config(config);
    }
}
