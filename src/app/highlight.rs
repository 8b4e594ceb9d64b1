use std::collections::HashSet;

use super::graph::index::ConnectionIndex;

/// Nodes and edges left at full strength around the focused node. The focus
/// is the hovered node, falling back to the selection; with no focus nothing
/// is dimmed.
pub(super) struct FocusSet<'a> {
    focus: Option<usize>,
    neighbors: Option<&'a HashSet<usize>>,
}

impl<'a> FocusSet<'a> {
    pub(super) fn new(
        hovered: Option<usize>,
        selected: Option<usize>,
        connections: &'a ConnectionIndex,
    ) -> Self {
        let focus = hovered.or(selected);
        Self {
            focus,
            neighbors: focus.and_then(|index| connections.neighbors(index)),
        }
    }

    pub(super) fn focus(&self) -> Option<usize> {
        self.focus
    }

    pub(super) fn node_dimmed(&self, index: usize) -> bool {
        let Some(focus) = self.focus else {
            return false;
        };
        index != focus
            && !self
                .neighbors
                .is_some_and(|neighbors| neighbors.contains(&index))
    }

    pub(super) fn edge_dimmed(&self, source: usize, target: usize) -> bool {
        self.focus
            .is_some_and(|focus| source != focus && target != focus)
    }
}

#[cfg(test)]
mod tests {
    use super::super::graph::{Edge, LinkKind};
    use super::*;

    fn edge(source: usize, target: usize, kind: LinkKind) -> Edge {
        Edge {
            source,
            target,
            kind,
        }
    }

    // date(0) -> goal(1), date(0) -> journal(2), kb(3) related kb(4)
    fn index() -> ConnectionIndex {
        ConnectionIndex::from_edges(
            5,
            &[
                edge(0, 1, LinkKind::Hierarchy),
                edge(0, 2, LinkKind::Hierarchy),
                edge(3, 4, LinkKind::Related),
            ],
        )
    }

    #[test]
    fn hovering_keeps_only_direct_neighbors_bright() {
        let index = index();
        let focus = FocusSet::new(Some(0), None, &index);

        assert!(!focus.node_dimmed(0));
        assert!(!focus.node_dimmed(1));
        assert!(!focus.node_dimmed(2));
        assert!(focus.node_dimmed(3));
        assert!(focus.node_dimmed(4));

        assert!(!focus.edge_dimmed(0, 1));
        assert!(!focus.edge_dimmed(0, 2));
        assert!(focus.edge_dimmed(3, 4));
    }

    #[test]
    fn hover_takes_precedence_over_selection() {
        let index = index();
        let focus = FocusSet::new(Some(3), Some(0), &index);
        assert_eq!(focus.focus(), Some(3));
        assert!(!focus.node_dimmed(4));
        assert!(focus.node_dimmed(1));
    }

    #[test]
    fn no_focus_dims_nothing() {
        let index = index();
        let focus = FocusSet::new(None, None, &index);
        assert_eq!(focus.focus(), None);
        assert!((0..5).all(|node| !focus.node_dimmed(node)));
        assert!(!focus.edge_dimmed(3, 4));
    }
}
