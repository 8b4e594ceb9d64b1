use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use eframe::egui::{Vec2, vec2};

use crate::records::{KnowledgeLinkKind, RecordKind};
use crate::util::stable_pair;

pub(in crate::app) mod build;
pub(in crate::app) mod index;
pub(in crate::app) mod interaction;
pub(in crate::app) mod view;

use index::ConnectionIndex;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Year,
    Month,
    Date,
    Activity,
    Goal,
    Submission,
    Kb,
    Retro,
    Journal,
    Note,
}

impl NodeKind {
    pub const COUNT: usize = 10;
    pub const ALL: [Self; Self::COUNT] = [
        Self::Year,
        Self::Month,
        Self::Date,
        Self::Activity,
        Self::Goal,
        Self::Submission,
        Self::Kb,
        Self::Retro,
        Self::Journal,
        Self::Note,
    ];
    pub const ITEM_KINDS: [Self; 7] = [
        Self::Activity,
        Self::Goal,
        Self::Submission,
        Self::Kb,
        Self::Retro,
        Self::Journal,
        Self::Note,
    ];

    pub fn is_hierarchy(self) -> bool {
        matches!(self, Self::Year | Self::Month | Self::Date)
    }

    pub fn slot(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Date => "date",
            Self::Activity => "activity",
            Self::Goal => "goal",
            Self::Submission => "submission",
            Self::Kb => "kb",
            Self::Retro => "retro",
            Self::Journal => "journal",
            Self::Note => "note",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Year => "Year",
            Self::Month => "Month",
            Self::Date => "Date",
            Self::Activity => "Activities",
            Self::Goal => "Goals",
            Self::Submission => "Submissions",
            Self::Kb => "Knowledge items",
            Self::Retro => "Retrospectives",
            Self::Journal => "Journal entries",
            Self::Note => "Notes",
        }
    }

    /// Many-body charge; the year root pushes hardest so months spread out.
    pub(in crate::app) fn charge(self) -> f32 {
        match self {
            Self::Year => 1200.0,
            Self::Month => 520.0,
            Self::Date => 180.0,
            _ => 60.0,
        }
    }

    /// Rest length of the hierarchy link from this node to its parent.
    pub(in crate::app) fn parent_distance(self) -> f32 {
        match self {
            Self::Year => 0.0,
            Self::Month => 110.0,
            Self::Date => 55.0,
            _ => 32.0,
        }
    }

    pub(in crate::app) fn base_radius(self) -> f32 {
        match self {
            Self::Year => 18.0,
            Self::Month => 12.0,
            Self::Date => 7.0,
            _ => 5.0,
        }
    }

    /// Hierarchy kinds are painted last so the skeleton stays on top.
    pub(in crate::app) fn paint_layer(self) -> u8 {
        match self {
            Self::Year => 3,
            Self::Month => 2,
            Self::Date => 1,
            _ => 0,
        }
    }
}

impl From<RecordKind> for NodeKind {
    fn from(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Activity => Self::Activity,
            RecordKind::Goal => Self::Goal,
            RecordKind::Submission => Self::Submission,
            RecordKind::Kb => Self::Kb,
            RecordKind::Retro => Self::Retro,
            RecordKind::Journal => Self::Journal,
            RecordKind::Note => Self::Note,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("unknown node kind `{value}`"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(in crate::app) enum LinkKind {
    Hierarchy,
    Related,
    Blocks,
    Requires,
}

impl LinkKind {
    pub(in crate::app) const COUNT: usize = 4;

    pub(in crate::app) fn is_knowledge(self) -> bool {
        !matches!(self, Self::Hierarchy)
    }

    pub(in crate::app) fn slot(self) -> usize {
        self as usize
    }
}

impl From<KnowledgeLinkKind> for LinkKind {
    fn from(kind: KnowledgeLinkKind) -> Self {
        match kind {
            KnowledgeLinkKind::Related => Self::Related,
            KnowledgeLinkKind::Blocks => Self::Blocks,
            KnowledgeLinkKind::Requires => Self::Requires,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct Node {
    pub(in crate::app) id: String,
    pub(in crate::app) label: String,
    pub(in crate::app) kind: NodeKind,
    pub(in crate::app) source_id: Option<String>,
    pub(in crate::app) date: Option<NaiveDate>,
    pub(in crate::app) pos: Vec2,
    pub(in crate::app) velocity: Vec2,
    /// Held position while dragged; overrides the simulation.
    pub(in crate::app) pin: Option<Vec2>,
}

impl Node {
    pub(in crate::app) fn new(id: String, label: String, kind: NodeKind) -> Self {
        Self {
            id,
            label,
            kind,
            source_id: None,
            date: None,
            pos: Vec2::ZERO,
            velocity: Vec2::ZERO,
            pin: None,
        }
    }

    /// The record kind backing an item node; `None` for year/month/date.
    pub(in crate::app) fn item_kind(&self) -> Option<NodeKind> {
        (!self.kind.is_hierarchy()).then_some(self.kind)
    }

    pub(in crate::app) fn record_kind(&self) -> Option<RecordKind> {
        match self.kind {
            NodeKind::Activity => Some(RecordKind::Activity),
            NodeKind::Goal => Some(RecordKind::Goal),
            NodeKind::Submission => Some(RecordKind::Submission),
            NodeKind::Kb => Some(RecordKind::Kb),
            NodeKind::Retro => Some(RecordKind::Retro),
            NodeKind::Journal => Some(RecordKind::Journal),
            NodeKind::Note => Some(RecordKind::Note),
            NodeKind::Year | NodeKind::Month | NodeKind::Date => None,
        }
    }
}

/// An edge between two node ids, as produced by the builder.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(in crate::app) struct Link {
    pub(in crate::app) source: String,
    pub(in crate::app) target: String,
    pub(in crate::app) kind: LinkKind,
}

/// An edge resolved to node indices inside a [`GraphModel`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) struct Edge {
    pub(in crate::app) source: usize,
    pub(in crate::app) target: usize,
    pub(in crate::app) kind: LinkKind,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(in crate::app) struct BuildStats {
    pub(in crate::app) records: usize,
    pub(in crate::app) skipped_undated: usize,
    pub(in crate::app) skipped_out_of_year: usize,
    pub(in crate::app) dropped_links: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(in crate::app) struct GraphData {
    pub(in crate::app) nodes: Vec<Node>,
    pub(in crate::app) hierarchy_links: Vec<Link>,
    pub(in crate::app) kb_links: Vec<Link>,
    pub(in crate::app) stats: BuildStats,
}

pub(in crate::app) const RADIUS_PER_CONNECTION: f32 = 1.1;
pub(in crate::app) const RADIUS_GROWTH_CAP: f32 = 9.0;
const SELECTED_RADIUS_BONUS: f32 = 3.0;

pub(in crate::app) fn base_radius(kind: NodeKind, selected: bool) -> f32 {
    kind.base_radius() + if selected { SELECTED_RADIUS_BONUS } else { 0.0 }
}

/// World-space radius of a node; grows with its connection count up to
/// [`RADIUS_GROWTH_CAP`].
pub(in crate::app) fn node_radius(kind: NodeKind, connections: usize, selected: bool) -> f32 {
    base_radius(kind, selected) + (connections as f32 * RADIUS_PER_CONNECTION).min(RADIUS_GROWTH_CAP)
}

/// The live graph: builder output resolved to indices, plus the derived
/// connection index. Rebuilt on every data reload.
pub(in crate::app) struct GraphModel {
    pub(in crate::app) year: i32,
    pub(in crate::app) nodes: Vec<Node>,
    /// Hierarchy edges first, then knowledge edges.
    pub(in crate::app) edges: Vec<Edge>,
    pub(in crate::app) hierarchy_edge_count: usize,
    pub(in crate::app) index_by_id: HashMap<String, usize>,
    pub(in crate::app) connections: ConnectionIndex,
    pub(in crate::app) draw_order: Vec<usize>,
    pub(in crate::app) stats: BuildStats,
}

impl GraphModel {
    pub(in crate::app) fn empty(year: i32) -> Self {
        Self {
            year,
            nodes: Vec::new(),
            edges: Vec::new(),
            hierarchy_edge_count: 0,
            index_by_id: HashMap::new(),
            connections: ConnectionIndex::default(),
            draw_order: Vec::new(),
            stats: BuildStats::default(),
        }
    }

    /// Resolves builder output into a model. Nodes whose id exists in `prior`
    /// keep their position and velocity; new nodes spawn around their
    /// hierarchy parent. All pins are cleared.
    pub(in crate::app) fn from_data(
        data: GraphData,
        year: i32,
        center: Vec2,
        prior: Option<&GraphModel>,
    ) -> Self {
        let GraphData {
            mut nodes,
            hierarchy_links,
            kb_links,
            stats,
        } = data;

        let index_by_id = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.clone(), index))
            .collect::<HashMap<_, _>>();

        let mut edges = Vec::with_capacity(hierarchy_links.len() + kb_links.len());
        let mut parent_of = vec![None; nodes.len()];
        for link in &hierarchy_links {
            if let (Some(&source), Some(&target)) =
                (index_by_id.get(&link.source), index_by_id.get(&link.target))
            {
                parent_of[target] = Some(source);
                edges.push(Edge {
                    source,
                    target,
                    kind: link.kind,
                });
            }
        }
        let hierarchy_edge_count = edges.len();
        for link in &kb_links {
            if let (Some(&source), Some(&target)) =
                (index_by_id.get(&link.source), index_by_id.get(&link.target))
            {
                edges.push(Edge {
                    source,
                    target,
                    kind: link.kind,
                });
            }
        }

        // Builder order puts parents before children, so one pass places
        // every new node next to an already-placed parent.
        for index in 0..nodes.len() {
            let carried = prior.and_then(|prior| {
                prior
                    .index_by_id
                    .get(&nodes[index].id)
                    .map(|&old| &prior.nodes[old])
            });

            if let Some(old) = carried {
                nodes[index].pos = old.pos;
                nodes[index].velocity = old.velocity;
            } else {
                let anchor = parent_of[index].map_or(center, |parent| nodes[parent].pos);
                nodes[index].pos = anchor + spawn_offset(&nodes[index]);
                nodes[index].velocity = Vec2::ZERO;
            }
            nodes[index].pin = None;
        }

        let connections = ConnectionIndex::from_edges(nodes.len(), &edges);

        let mut draw_order = (0..nodes.len()).collect::<Vec<_>>();
        draw_order.sort_by_key(|&index| nodes[index].kind.paint_layer());

        Self {
            year,
            nodes,
            edges,
            hierarchy_edge_count,
            index_by_id,
            connections,
            draw_order,
            stats,
        }
    }

    pub(in crate::app) fn node_index(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub(in crate::app) fn radius(&self, index: usize, selected: bool) -> f32 {
        node_radius(
            self.nodes[index].kind,
            self.connections.degree(index),
            selected,
        )
    }

    pub(in crate::app) fn knowledge_edges(&self) -> &[Edge] {
        &self.edges[self.hierarchy_edge_count..]
    }
}

fn spawn_offset(node: &Node) -> Vec2 {
    let (jx, jy) = stable_pair(&node.id);
    let mut direction = vec2(jx, jy);
    if direction.length_sq() <= 0.0001 {
        direction = vec2(1.0, 0.0);
    } else {
        direction = direction.normalized();
    }
    direction * node.kind.parent_distance()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn kind_strategy() -> impl Strategy<Value = NodeKind> {
        prop::sample::select(NodeKind::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn radius_is_monotone_and_bounded(
            kind in kind_strategy(),
            selected in any::<bool>(),
            connections in 0usize..500,
        ) {
            let here = node_radius(kind, connections, selected);
            let next = node_radius(kind, connections + 1, selected);
            prop_assert!(next >= here);
            prop_assert!(here <= base_radius(kind, selected) + RADIUS_GROWTH_CAP);
            prop_assert!(here >= base_radius(kind, selected));
        }
    }

    #[test]
    fn node_kind_round_trips_through_str() {
        for kind in NodeKind::ALL {
            assert_eq!(kind.as_str().parse::<NodeKind>(), Ok(kind));
        }
        assert!("planet".parse::<NodeKind>().is_err());
    }

    #[test]
    fn hierarchy_nodes_have_no_item_kind() {
        let year = Node::new("year-2025".to_owned(), "2025".to_owned(), NodeKind::Year);
        let goal = Node::new("goal-1".to_owned(), "Run".to_owned(), NodeKind::Goal);
        assert_eq!(year.item_kind(), None);
        assert_eq!(goal.item_kind(), Some(NodeKind::Goal));
    }

    fn chain_data() -> GraphData {
        let nodes = vec![
            Node::new("year-2025".to_owned(), "2025".to_owned(), NodeKind::Year),
            Node::new("month-2025-01".to_owned(), "Jan".to_owned(), NodeKind::Month),
            Node::new("date-2025-01-02".to_owned(), "Jan 2".to_owned(), NodeKind::Date),
        ];
        let hierarchy_links = vec![
            Link {
                source: "year-2025".to_owned(),
                target: "month-2025-01".to_owned(),
                kind: LinkKind::Hierarchy,
            },
            Link {
                source: "month-2025-01".to_owned(),
                target: "date-2025-01-02".to_owned(),
                kind: LinkKind::Hierarchy,
            },
        ];
        GraphData {
            nodes,
            hierarchy_links,
            kb_links: Vec::new(),
            stats: BuildStats::default(),
        }
    }

    #[test]
    fn new_nodes_spawn_near_their_parent() {
        let center = vec2(400.0, 300.0);
        let model = GraphModel::from_data(chain_data(), 2025, center, None);

        let year = &model.nodes[0];
        let month = &model.nodes[1];
        let date = &model.nodes[2];
        assert!((year.pos - center).length() <= NodeKind::Year.parent_distance() + 0.01);
        assert!(
            ((month.pos - year.pos).length() - NodeKind::Month.parent_distance()).abs() < 0.01
        );
        assert!(((date.pos - month.pos).length() - NodeKind::Date.parent_distance()).abs() < 0.01);
    }

    #[test]
    fn persisting_ids_keep_positions_and_lose_pins() {
        let mut prior = GraphModel::from_data(chain_data(), 2025, Vec2::ZERO, None);
        prior.nodes[1].pos = vec2(-500.0, 42.0);
        prior.nodes[1].pin = Some(vec2(-500.0, 42.0));

        let next = GraphModel::from_data(chain_data(), 2025, Vec2::ZERO, Some(&prior));
        assert_eq!(next.nodes[1].pos, vec2(-500.0, 42.0));
        assert!(next.nodes.iter().all(|node| node.pin.is_none()));
    }

    #[test]
    fn draw_order_puts_hierarchy_last() {
        let mut data = chain_data();
        data.nodes.push(Node::new("goal-1".to_owned(), "Run".to_owned(), NodeKind::Goal));
        let model = GraphModel::from_data(data, 2025, Vec2::ZERO, None);
        assert_eq!(model.draw_order.first().copied(), Some(3));
        assert_eq!(model.draw_order.last().copied(), Some(0));
    }
}
