use chrono::NaiveDate;
use eframe::egui::{self, RichText, Ui};

use crate::records::RecordKind;

use super::super::Workspace;
use super::super::engine::GraphCallbacks;
use super::super::graph::NodeKind;
use super::super::inspector::Activation;

const LINK_LABEL_BUDGET: usize = 32;

enum DetailsAction {
    Dismiss,
    RemoveLink(String),
    Open { node_id: String, source_id: String },
}

impl Workspace {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Details");
        ui.add_space(6.0);

        let action = match self.inspector.activation().cloned() {
            None => {
                ui.label("Click an item or a date in the graph.");
                None
            }
            Some(Activation::Item { source_id }) => self.draw_item_details(ui, &source_id),
            Some(Activation::Date(date)) => self.draw_date_details(ui, date),
        };

        match action {
            Some(DetailsAction::Dismiss) => self.inspector.dismiss(),
            Some(DetailsAction::RemoveLink(link_id)) => self.delete_link(link_id),
            Some(DetailsAction::Open { node_id, source_id }) => {
                self.engine.select_node_id(&node_id);
                self.inspector.on_node_activated(&source_id);
            }
            None => {}
        }
    }

    fn draw_item_details(&self, ui: &mut Ui, source_id: &str) -> Option<DetailsAction> {
        let kind = self
            .engine
            .selected_node()
            .filter(|node| node.source_id.as_deref() == Some(source_id))
            .and_then(|node| node.record_kind());
        let mut action = None;

        let Some(record) = self.inspector.record(kind, source_id) else {
            ui.label("This item is not part of the loaded data any more.");
            if ui.button("Close").clicked() {
                action = Some(DetailsAction::Dismiss);
            }
            return action;
        };

        ui.label(RichText::new(record.label_source()).strong());
        ui.small(format!(
            "{} · {}",
            NodeKind::from(record.kind()).display_name(),
            record.id()
        ));
        ui.add_space(6.0);

        egui::Grid::new("record_fields")
            .num_columns(2)
            .striped(true)
            .show(ui, |ui| {
                for (name, value) in record.detail_fields() {
                    ui.label(name);
                    ui.label(value);
                    ui.end_row();
                }
            });

        if record.kind() == RecordKind::Kb {
            ui.separator();
            ui.label(RichText::new("Knowledge links").strong());
            let links = self.inspector.links_for(source_id);
            if links.is_empty() {
                ui.label("No links yet. Use link mode to connect this item.");
            }
            for link in links {
                ui.horizontal(|ui| {
                    let (arrow, other) = if link.source_id == source_id {
                        ("→", &link.target_id)
                    } else {
                        ("←", &link.source_id)
                    };
                    ui.label(format!(
                        "{arrow} {} ({})",
                        self.inspector.kb_label(other, LINK_LABEL_BUDGET),
                        link.link_type
                    ));
                    if ui
                        .small_button("Remove")
                        .on_hover_text("Delete this link from the data source.")
                        .clicked()
                    {
                        action = Some(DetailsAction::RemoveLink(link.id.clone()));
                    }
                });
            }
        }

        ui.add_space(8.0);
        if ui.button("Close").clicked() {
            action = Some(DetailsAction::Dismiss);
        }
        action
    }

    fn draw_date_details(&self, ui: &mut Ui, date: NaiveDate) -> Option<DetailsAction> {
        let mut action = None;

        ui.label(RichText::new(date.format("%A, %B %-d %Y").to_string()).strong());
        ui.add_space(6.0);

        let items = self
            .engine
            .model()
            .nodes
            .iter()
            .filter(|node| node.date == Some(date) && node.item_kind().is_some())
            .collect::<Vec<_>>();
        if items.is_empty() {
            ui.label("Nothing recorded on this day.");
        }

        egui::ScrollArea::vertical()
            .id_salt("date_items_scroll")
            .max_height(360.0)
            .auto_shrink([false, true])
            .show(ui, |ui| {
                for node in items {
                    let text = format!("{}: {}", node.kind.display_name(), node.label);
                    if ui.link(text).clicked()
                        && let Some(source_id) = &node.source_id
                    {
                        action = Some(DetailsAction::Open {
                            node_id: node.id.clone(),
                            source_id: source_id.clone(),
                        });
                    }
                }
            });

        ui.add_space(8.0);
        if ui.button("Close").clicked() {
            action = Some(DetailsAction::Dismiss);
        }
        action
    }
}
