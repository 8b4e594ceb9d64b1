use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, Local, NaiveDate, TimeZone};
use tracing::{debug, warn};

use crate::records::{KnowledgeLinkKind, YearlyGraphData};
use crate::util::truncate_label;

use super::{BuildStats, GraphData, Link, LinkKind, Node, NodeKind};

pub(in crate::app) const LABEL_BUDGET: usize = 28;

pub(in crate::app) fn year_node_id(year: i32) -> String {
    format!("year-{year}")
}

fn month_node_id(year: i32, month: u32) -> String {
    format!("month-{year}-{month:02}")
}

fn date_node_id(date: NaiveDate) -> String {
    format!("date-{}", date.format("%Y-%m-%d"))
}

pub(in crate::app) fn item_node_id(kind: NodeKind, source_id: &str) -> String {
    format!("{}-{source_id}", kind.as_str())
}

fn hierarchy_link(source: &str, target: &str) -> Link {
    Link {
        source: source.to_owned(),
        target: target.to_owned(),
        kind: LinkKind::Hierarchy,
    }
}

/// Builds the Year → Month → Date → Item hierarchy and the knowledge-link
/// layer for `year`, resolving record instants in the local timezone.
pub(in crate::app) fn build_graph(data: &YearlyGraphData, year: i32) -> GraphData {
    build_graph_in(data, year, &Local)
}

pub(in crate::app) fn build_graph_in<Tz: TimeZone>(
    data: &YearlyGraphData,
    year: i32,
    zone: &Tz,
) -> GraphData {
    let mut stats = BuildStats::default();
    let mut seen_items = HashSet::new();
    let mut calendar: BTreeMap<u32, BTreeMap<NaiveDate, Vec<Node>>> = BTreeMap::new();

    for record in data.records() {
        stats.records += 1;
        let kind = NodeKind::from(record.kind());
        let id = item_node_id(kind, record.id());

        let date = match record.date().local_date(zone) {
            Ok(date) => date,
            Err(issue) => {
                warn!(record = %id, %issue, "skipping record without a usable date");
                stats.skipped_undated += 1;
                continue;
            }
        };

        if date.year() != year {
            debug!(record = %id, %date, year, "skipping record outside the requested year");
            stats.skipped_out_of_year += 1;
            continue;
        }

        if !seen_items.insert(id.clone()) {
            continue;
        }

        let mut node = Node::new(id, truncate_label(&record.label_source(), LABEL_BUDGET), kind);
        node.source_id = Some(record.id().to_owned());
        node.date = Some(date);

        calendar
            .entry(date.month())
            .or_default()
            .entry(date)
            .or_default()
            .push(node);
    }

    let year_id = year_node_id(year);
    let mut month_nodes = Vec::new();
    let mut date_nodes = Vec::new();
    let mut item_nodes = Vec::new();
    let mut month_links = Vec::new();
    let mut date_links = Vec::new();
    let mut item_links = Vec::new();

    for (month, days) in calendar {
        let month_id = month_node_id(year, month);
        let month_label = NaiveDate::from_ymd_opt(year, month, 1)
            .map(|first| first.format("%b").to_string())
            .unwrap_or_else(|| format!("{month:02}"));
        month_nodes.push(Node::new(month_id.clone(), month_label, NodeKind::Month));
        month_links.push(hierarchy_link(&year_id, &month_id));

        for (date, items) in days {
            let date_id = date_node_id(date);
            let mut date_node = Node::new(
                date_id.clone(),
                date.format("%b %-d").to_string(),
                NodeKind::Date,
            );
            date_node.date = Some(date);
            date_nodes.push(date_node);
            date_links.push(hierarchy_link(&month_id, &date_id));

            for item in items {
                item_links.push(hierarchy_link(&date_id, &item.id));
                item_nodes.push(item);
            }
        }
    }

    let mut nodes = Vec::with_capacity(1 + month_nodes.len() + date_nodes.len() + item_nodes.len());
    nodes.push(Node::new(year_id, year.to_string(), NodeKind::Year));
    nodes.extend(month_nodes);
    nodes.extend(date_nodes);
    nodes.extend(item_nodes);

    let mut hierarchy_links = month_links;
    hierarchy_links.extend(date_links);
    hierarchy_links.extend(item_links);

    let kb_nodes = nodes
        .iter()
        .filter(|node| node.kind == NodeKind::Kb)
        .map(|node| node.id.as_str())
        .collect::<HashSet<_>>();
    let mut seen_links = HashSet::new();
    let mut kb_links = Vec::new();

    for record in &data.kb_links {
        let kind = match record.link_type.parse::<KnowledgeLinkKind>() {
            Ok(kind) => LinkKind::from(kind),
            Err(error) => {
                debug!(link = %record.id, %error, "dropping knowledge link");
                stats.dropped_links += 1;
                continue;
            }
        };

        let source = item_node_id(NodeKind::Kb, &record.source_id);
        let target = item_node_id(NodeKind::Kb, &record.target_id);
        if source == target
            || !kb_nodes.contains(source.as_str())
            || !kb_nodes.contains(target.as_str())
        {
            debug!(link = %record.id, %source, %target, "dropping knowledge link with missing endpoint");
            stats.dropped_links += 1;
            continue;
        }

        let link = Link {
            source,
            target,
            kind,
        };
        if seen_links.insert(link.clone()) {
            kb_links.push(link);
        }
    }

    GraphData {
        nodes,
        hierarchy_links,
        kb_links,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use chrono::{FixedOffset, Utc};
    use proptest::prelude::*;

    use super::*;
    use crate::records::{
        ActivityRecord, GoalRecord, JournalRecord, KbItemRecord, KnowledgeLinkRecord, NoteRecord,
        RetroRecord, SubmissionRecord,
    };

    fn goal(id: &str, date: &str) -> GoalRecord {
        GoalRecord {
            id: id.to_owned(),
            date: Some(date.to_owned()),
            text: format!("goal {id}"),
            ..Default::default()
        }
    }

    fn kb(id: &str, created_at: &str) -> KbItemRecord {
        KbItemRecord {
            id: id.to_owned(),
            created_at: Some(created_at.to_owned()),
            content: format!("item {id}"),
            ..Default::default()
        }
    }

    fn link(id: &str, source: &str, target: &str, link_type: &str) -> KnowledgeLinkRecord {
        KnowledgeLinkRecord {
            id: id.to_owned(),
            source_id: source.to_owned(),
            target_id: target.to_owned(),
            link_type: link_type.to_owned(),
        }
    }

    fn ids(graph: &GraphData) -> HashSet<&str> {
        graph.nodes.iter().map(|node| node.id.as_str()).collect()
    }

    #[test]
    fn goal_and_journal_on_one_day() {
        let data = YearlyGraphData {
            goals: vec![goal("g1", "2025-03-10")],
            journal_entries: vec![JournalRecord {
                id: "j1".to_owned(),
                date: Some("2025-03-10".to_owned()),
                reflection_text: "Quiet day".to_owned(),
            }],
            ..Default::default()
        };

        let graph = build_graph_in(&data, 2025, &Utc);

        assert_eq!(
            ids(&graph),
            HashSet::from([
                "year-2025",
                "month-2025-03",
                "date-2025-03-10",
                "goal-g1",
                "journal-j1",
            ])
        );
        assert_eq!(graph.hierarchy_links.len(), 4);
        assert!(graph.kb_links.is_empty());
        assert!(
            graph
                .hierarchy_links
                .iter()
                .all(|link| link.kind == LinkKind::Hierarchy)
        );
    }

    #[test]
    fn blocks_link_lands_in_knowledge_list_only() {
        let data = YearlyGraphData {
            kb_items: vec![kb("a", "2025-02-01T10:00:00Z"), kb("b", "2025-02-03T10:00:00Z")],
            kb_links: vec![link("l1", "a", "b", "blocks")],
            ..Default::default()
        };

        let graph = build_graph_in(&data, 2025, &Utc);

        assert_eq!(
            graph.kb_links,
            vec![Link {
                source: "kb-a".to_owned(),
                target: "kb-b".to_owned(),
                kind: LinkKind::Blocks,
            }]
        );
        assert!(
            graph
                .hierarchy_links
                .iter()
                .all(|link| link.kind == LinkKind::Hierarchy)
        );
        assert!(!graph.hierarchy_links.iter().any(|link| {
            link.source == "kb-a" && link.target == "kb-b"
        }));
    }

    #[test]
    fn local_offset_decides_the_day() {
        // 2025-03-11T03:30Z is 23:30 on March 10 at UTC-04:00.
        let data = YearlyGraphData {
            kb_items: vec![kb("late", "2025-03-11T03:30:00Z")],
            ..Default::default()
        };
        let zone = FixedOffset::west_opt(4 * 3600).expect("valid offset");

        let graph = build_graph_in(&data, 2025, &zone);

        assert!(ids(&graph).contains("date-2025-03-10"));
        assert!(!ids(&graph).contains("date-2025-03-11"));
        let item = graph
            .nodes
            .iter()
            .find(|node| node.id == "kb-late")
            .expect("item node");
        assert_eq!(item.date, NaiveDate::from_ymd_opt(2025, 3, 10));
    }

    #[test]
    fn date_only_created_at_places_item_on_that_day() {
        let data = YearlyGraphData {
            kb_items: vec![kb("a", "2025-03-11")],
            ..Default::default()
        };
        let zone = FixedOffset::west_opt(10 * 3600).expect("valid offset");

        let graph = build_graph_in(&data, 2025, &zone);

        assert!(ids(&graph).contains("kb-a"));
        assert!(ids(&graph).contains("date-2025-03-11"));
        assert_eq!(graph.stats.skipped_undated, 0);
    }

    #[test]
    fn undated_and_out_of_year_records_are_skipped() {
        let data = YearlyGraphData {
            goals: vec![goal("ok", "2025-01-01"), goal("bad", "soon"), goal("old", "2024-12-31")],
            notes: vec![NoteRecord {
                id: "n".to_owned(),
                created_at_ms: None,
                title: Some("no timestamp".to_owned()),
            }],
            ..Default::default()
        };

        let graph = build_graph_in(&data, 2025, &Utc);

        assert!(ids(&graph).contains("goal-ok"));
        assert!(!ids(&graph).contains("goal-bad"));
        assert!(!ids(&graph).contains("goal-old"));
        assert!(!ids(&graph).contains("note-n"));
        assert_eq!(graph.stats.records, 4);
        assert_eq!(graph.stats.skipped_undated, 2);
        assert_eq!(graph.stats.skipped_out_of_year, 1);
    }

    #[test]
    fn empty_year_is_just_the_root() {
        let graph = build_graph_in(&YearlyGraphData::default(), 2030, &Utc);
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].id, "year-2030");
        assert_eq!(graph.nodes[0].kind, NodeKind::Year);
        assert!(graph.hierarchy_links.is_empty());
    }

    #[test]
    fn duplicate_records_produce_one_node() {
        let data = YearlyGraphData {
            goals: vec![goal("g1", "2025-05-05"), goal("g1", "2025-05-05")],
            kb_items: vec![kb("a", "2025-05-05T00:00:00Z"), kb("b", "2025-05-05T00:00:00Z")],
            kb_links: vec![
                link("l1", "a", "b", "related"),
                link("l2", "a", "b", "related"),
                link("l3", "a", "a", "related"),
                link("l4", "a", "ghost", "related"),
                link("l5", "a", "b", "depends-on"),
            ],
            ..Default::default()
        };

        let graph = build_graph_in(&data, 2025, &Utc);

        let goal_nodes = graph.nodes.iter().filter(|node| node.id == "goal-g1").count();
        assert_eq!(goal_nodes, 1);
        let goal_links = graph
            .hierarchy_links
            .iter()
            .filter(|link| link.target == "goal-g1")
            .count();
        assert_eq!(goal_links, 1);
        assert_eq!(graph.kb_links.len(), 1);
        assert_eq!(graph.stats.dropped_links, 3);
    }

    #[test]
    fn same_source_id_in_two_collections_does_not_collide() {
        let data = YearlyGraphData {
            goals: vec![goal("42", "2025-07-01")],
            journal_entries: vec![JournalRecord {
                id: "42".to_owned(),
                date: Some("2025-07-01".to_owned()),
                reflection_text: String::new(),
            }],
            ..Default::default()
        };

        let graph = build_graph_in(&data, 2025, &Utc);

        assert!(ids(&graph).contains("goal-42"));
        assert!(ids(&graph).contains("journal-42"));
        let journal = graph
            .nodes
            .iter()
            .find(|node| node.id == "journal-42")
            .expect("journal node");
        assert_eq!(journal.label, "Journal entry");
        assert_eq!(journal.source_id.as_deref(), Some("42"));
    }

    #[test]
    fn labels_are_truncated() {
        let data = YearlyGraphData {
            activities: vec![ActivityRecord {
                id: "a".to_owned(),
                date: Some("2025-08-08".to_owned()),
                title: "An extremely long activity title that will not fit".to_owned(),
                ..Default::default()
            }],
            ..Default::default()
        };

        let graph = build_graph_in(&data, 2025, &Utc);
        let item = graph
            .nodes
            .iter()
            .find(|node| node.id == "activity-a")
            .expect("activity node");
        // The cut lands after a space, which is trimmed before the ellipsis.
        assert!(item.label.chars().count() <= LABEL_BUDGET);
        assert_eq!(item.label, "An extremely long activity…");
    }

    #[test]
    fn parents_precede_children() {
        let data = YearlyGraphData {
            goals: vec![goal("late", "2025-11-30"), goal("early", "2025-01-02")],
            ..Default::default()
        };
        let graph = build_graph_in(&data, 2025, &Utc);

        let position = graph
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.as_str(), index))
            .collect::<HashMap<_, _>>();
        for link in &graph.hierarchy_links {
            assert!(position[link.source.as_str()] < position[link.target.as_str()]);
        }
    }

    #[derive(Clone, Debug)]
    enum DayOrJunk {
        Day(u32),
        Junk,
    }

    fn record_date(entry: &DayOrJunk) -> String {
        match entry {
            DayOrJunk::Day(ordinal) => NaiveDate::from_yo_opt(2025, *ordinal)
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            DayOrJunk::Junk => "not-a-date".to_owned(),
        }
    }

    fn dataset_strategy() -> impl Strategy<Value = YearlyGraphData> {
        let day = prop_oneof![
            8 => (1u32..=365).prop_map(DayOrJunk::Day),
            1 => Just(DayOrJunk::Junk),
        ];
        let entries = prop::collection::vec((0u8..7, 0u16..40, day), 0..60);
        let links = prop::collection::vec((0u16..40, 0u16..40, 0u8..4), 0..30);

        (entries, links).prop_map(|(entries, links)| {
            let mut data = YearlyGraphData::default();
            for (collection, id, day) in entries {
                let id = id.to_string();
                let date = record_date(&day);
                let stamp = format!("{date}T12:00:00Z");
                match collection {
                    0 => data.activities.push(ActivityRecord {
                        id,
                        date: Some(date),
                        ..Default::default()
                    }),
                    1 => data.goals.push(GoalRecord {
                        id,
                        date: Some(date),
                        ..Default::default()
                    }),
                    2 => data.submissions.push(SubmissionRecord {
                        id,
                        submitted_time: Some(stamp),
                        ..Default::default()
                    }),
                    3 => data.kb_items.push(KbItemRecord {
                        id,
                        created_at: Some(stamp),
                        ..Default::default()
                    }),
                    4 => data.retrospectives.push(RetroRecord {
                        id,
                        period_start: Some(stamp),
                        ..Default::default()
                    }),
                    5 => data.journal_entries.push(JournalRecord {
                        id,
                        date: Some(date),
                        ..Default::default()
                    }),
                    _ => data.notes.push(NoteRecord {
                        id,
                        created_at_ms: chrono::DateTime::parse_from_rfc3339(&stamp)
                            .ok()
                            .map(|instant| instant.timestamp_millis()),
                        title: None,
                    }),
                }
            }
            for (index, (source, target, kind)) in links.into_iter().enumerate() {
                let link_type = ["related", "blocks", "requires", "bogus"][kind as usize];
                data.kb_links.push(link(
                    &format!("l{index}"),
                    &source.to_string(),
                    &target.to_string(),
                    link_type,
                ));
            }
            data
        })
    }

    proptest! {
        #[test]
        fn hierarchy_is_a_tree_rooted_at_the_year(data in dataset_strategy()) {
            let graph = build_graph_in(&data, 2025, &Utc);
            let node_ids = graph.nodes.iter().map(|node| node.id.as_str()).collect::<Vec<_>>();
            let unique = node_ids.iter().copied().collect::<HashSet<_>>();
            prop_assert_eq!(unique.len(), node_ids.len());

            let mut parent = HashMap::new();
            for link in &graph.hierarchy_links {
                prop_assert_eq!(link.kind, LinkKind::Hierarchy);
                prop_assert!(unique.contains(link.source.as_str()));
                prop_assert!(parent.insert(link.target.as_str(), link.source.as_str()).is_none());
            }

            // Every node except the root has exactly one parent...
            prop_assert_eq!(parent.len(), graph.nodes.len() - 1);
            prop_assert!(!parent.contains_key("year-2025"));

            // ...and following parents always reaches the root.
            for id in &node_ids {
                let mut cursor = *id;
                let mut steps = 0;
                while cursor != "year-2025" {
                    cursor = parent[cursor];
                    steps += 1;
                    prop_assert!(steps <= 3);
                }
            }

            for link in &graph.kb_links {
                prop_assert!(link.kind.is_knowledge());
                prop_assert!(unique.contains(link.source.as_str()));
                prop_assert!(unique.contains(link.target.as_str()));
            }
        }

        #[test]
        fn building_twice_is_identical(data in dataset_strategy()) {
            let first = build_graph_in(&data, 2025, &Utc);
            let second = build_graph_in(&data, 2025, &Utc);
            prop_assert_eq!(first, second);
        }
    }
}
