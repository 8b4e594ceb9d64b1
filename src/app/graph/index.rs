use std::collections::HashSet;

use super::Edge;

/// Undirected adjacency over both hierarchy and knowledge edges.
#[derive(Clone, Debug, Default, PartialEq)]
pub(in crate::app) struct ConnectionIndex {
    neighbors: Vec<HashSet<usize>>,
}

impl ConnectionIndex {
    pub(in crate::app) fn from_edges(node_count: usize, edges: &[Edge]) -> Self {
        let mut neighbors = vec![HashSet::new(); node_count];
        for edge in edges {
            if edge.source >= node_count || edge.target >= node_count || edge.source == edge.target
            {
                continue;
            }
            neighbors[edge.source].insert(edge.target);
            neighbors[edge.target].insert(edge.source);
        }
        Self { neighbors }
    }

    pub(in crate::app) fn neighbors(&self, index: usize) -> Option<&HashSet<usize>> {
        self.neighbors.get(index)
    }

    pub(in crate::app) fn degree(&self, index: usize) -> usize {
        self.neighbors.get(index).map_or(0, HashSet::len)
    }

    #[cfg(test)]
    pub(in crate::app) fn connected(&self, a: usize, b: usize) -> bool {
        self.neighbors
            .get(a)
            .is_some_and(|neighbors| neighbors.contains(&b))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::super::LinkKind;
    use super::*;

    fn edge(source: usize, target: usize) -> Edge {
        Edge {
            source,
            target,
            kind: LinkKind::Related,
        }
    }

    proptest! {
        #[test]
        fn index_is_symmetric(
            node_count in 1usize..40,
            pairs in prop::collection::vec((0usize..40, 0usize..40), 0..120),
        ) {
            let edges = pairs
                .into_iter()
                .map(|(a, b)| edge(a % node_count, b % node_count))
                .collect::<Vec<_>>();
            let index = ConnectionIndex::from_edges(node_count, &edges);

            for edge in &edges {
                if edge.source == edge.target {
                    continue;
                }
                prop_assert!(index.connected(edge.source, edge.target));
                prop_assert!(index.connected(edge.target, edge.source));
            }
            for a in 0..node_count {
                for &b in index.neighbors(a).into_iter().flatten() {
                    prop_assert!(index.connected(b, a));
                }
            }
        }
    }

    #[test]
    fn duplicate_edges_count_once() {
        let index = ConnectionIndex::from_edges(3, &[edge(0, 1), edge(1, 0), edge(0, 1)]);
        assert_eq!(index.degree(0), 1);
        assert_eq!(index.degree(1), 1);
        assert_eq!(index.degree(2), 0);
    }

    #[test]
    fn out_of_range_lookups_are_empty() {
        let index = ConnectionIndex::from_edges(1, &[edge(0, 5)]);
        assert_eq!(index.degree(0), 0);
        assert_eq!(index.degree(9), 0);
        assert!(index.neighbors(9).is_none());
    }
}
