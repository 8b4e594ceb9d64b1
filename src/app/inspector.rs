use chrono::NaiveDate;
use tracing::debug;

use crate::records::{KnowledgeLinkKind, KnowledgeLinkRecord, Record, RecordKind, YearlyGraphData};
use crate::util::truncate_label;

use super::engine::GraphCallbacks;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) enum Activation {
    Item { source_id: String },
    Date(NaiveDate),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct LinkRequest {
    pub(super) source_id: String,
    pub(super) target_id: String,
    pub(super) kind: KnowledgeLinkKind,
}

/// Receives graph callbacks and keeps the raw records the details panel
/// reads from.
#[derive(Default)]
pub(super) struct Inspector {
    data: Option<YearlyGraphData>,
    activation: Option<Activation>,
    link_requests: Vec<LinkRequest>,
}

impl Inspector {
    pub(super) fn activation(&self) -> Option<&Activation> {
        self.activation.as_ref()
    }

    pub(super) fn dismiss(&mut self) {
        self.activation = None;
    }

    pub(super) fn take_link_requests(&mut self) -> Vec<LinkRequest> {
        std::mem::take(&mut self.link_requests)
    }

    /// Looks a record up by kind when known, otherwise by id alone.
    pub(super) fn record(&self, kind: Option<RecordKind>, source_id: &str) -> Option<Record<'_>> {
        let data = self.data.as_ref()?;
        match kind {
            Some(kind) => data.find(kind, source_id),
            None => data.records().find(|record| record.id() == source_id),
        }
    }

    /// Knowledge links touching the knowledge item `kb_id`.
    pub(super) fn links_for(&self, kb_id: &str) -> Vec<&KnowledgeLinkRecord> {
        self.data
            .iter()
            .flat_map(|data| &data.kb_links)
            .filter(|link| link.source_id == kb_id || link.target_id == kb_id)
            .collect()
    }

    pub(super) fn kb_label(&self, kb_id: &str, budget: usize) -> String {
        self.record(Some(RecordKind::Kb), kb_id).map_or_else(
            || kb_id.to_owned(),
            |record| truncate_label(&record.label_source(), budget),
        )
    }
}

impl GraphCallbacks for Inspector {
    fn on_node_activated(&mut self, source_id: &str) {
        self.activation = Some(Activation::Item {
            source_id: source_id.to_owned(),
        });
    }

    fn on_date_activated(&mut self, date: NaiveDate) {
        self.activation = Some(Activation::Date(date));
    }

    fn on_link_requested(&mut self, source_id: &str, target_id: &str, kind: KnowledgeLinkKind) {
        self.link_requests.push(LinkRequest {
            source_id: source_id.to_owned(),
            target_id: target_id.to_owned(),
            kind,
        });
    }

    fn on_data_loaded(&mut self, data: &YearlyGraphData) {
        debug!(records = data.record_count(), "inspector data refreshed");
        self.data = Some(data.clone());
    }
}
