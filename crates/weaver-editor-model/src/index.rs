//! Derived range index over annotations and markers.
//!
//! The index stores ids only. Offsets stay on the nodes, so edits that merely move
//! offsets leave the index untouched; the [`Document`](crate::Document) updates it
//! when a range is created, deleted or moved to another path.

use std::collections::{BTreeSet, HashMap};

use crate::node::{Node, NodeId, PropertyPath, TextRange};

#[derive(Debug, Clone, Default)]
pub struct RangeIndex {
    by_path: HashMap<PropertyPath, BTreeSet<NodeId>>,
    by_node: HashMap<NodeId, BTreeSet<NodeId>>,
}

impl RangeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, id: &NodeId, range: &TextRange) {
        let path = range.path();
        tracing::trace!(%id, %path, "index insert");
        self.by_path
            .entry(path.clone())
            .or_default()
            .insert(id.clone());
        self.by_node
            .entry(path.node_id.clone())
            .or_default()
            .insert(id.clone());
    }

    pub(crate) fn remove(&mut self, id: &NodeId, range: &TextRange) {
        let path = range.path();
        tracing::trace!(%id, %path, "index remove");
        if let Some(ids) = self.by_path.get_mut(path) {
            ids.remove(id);
            if ids.is_empty() {
                self.by_path.remove(path);
            }
        }
        if let Some(ids) = self.by_node.get_mut(&path.node_id) {
            ids.remove(id);
            if ids.is_empty() {
                self.by_node.remove(&path.node_id);
            }
        }
    }

    /// Ids of ranges on `path`, in id order.
    pub fn ids_on_path(&self, path: &PropertyPath) -> impl Iterator<Item = &NodeId> {
        self.by_path.get(path).into_iter().flatten()
    }

    /// Ids of ranges on any property of `node_id`, in id order.
    pub fn ids_on_node(&self, node_id: &str) -> impl Iterator<Item = &NodeId> {
        self.by_node.get(node_id).into_iter().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    /// Ranges on `path` intersecting `[start, end]`, sorted by start then end offset.
    ///
    /// Intersection is inclusive: a range ending exactly at `start` or beginning
    /// exactly at `end` is reported. Omitted bounds are open.
    pub(crate) fn query<'a>(
        &self,
        nodes: &'a HashMap<NodeId, Node>,
        path: &PropertyPath,
        start: Option<usize>,
        end: Option<usize>,
    ) -> Vec<&'a Node> {
        let mut found: Vec<&Node> = self
            .ids_on_path(path)
            .filter_map(|id| nodes.get(id))
            .filter(|node| {
                let Some(range) = &node.range else {
                    return false;
                };
                let after_start = start.is_none_or(|s| range.end.offset >= s);
                let before_end = end.is_none_or(|e| range.start.offset <= e);
                after_start && before_end
            })
            .collect();
        sort_by_offsets(&mut found);
        found
    }

    /// Ranges on any property of `node_id`, sorted like [`RangeIndex::query`].
    pub(crate) fn query_node<'a>(
        &self,
        nodes: &'a HashMap<NodeId, Node>,
        node_id: &str,
    ) -> Vec<&'a Node> {
        let mut found: Vec<&Node> = self
            .ids_on_node(node_id)
            .filter_map(|id| nodes.get(id))
            .collect();
        sort_by_offsets(&mut found);
        found
    }
}

fn sort_by_offsets(nodes: &mut [&Node]) {
    nodes.sort_by(|a, b| {
        let key = |n: &Node| {
            n.range
                .as_ref()
                .map(|r| (r.start.offset, r.end.offset))
                .unwrap_or_default()
        };
        key(a).cmp(&key(b)).then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anno(id: &str, start: usize, end: usize) -> Node {
        Node::ranged(id, "strong", PropertyPath::new("p1", "content"), start, end)
    }

    fn build(annos: &[Node]) -> (RangeIndex, HashMap<NodeId, Node>) {
        let mut index = RangeIndex::new();
        let mut nodes = HashMap::new();
        for a in annos {
            index.insert(&a.id, a.range.as_ref().unwrap());
            nodes.insert(a.id.clone(), a.clone());
        }
        (index, nodes)
    }

    fn ids(found: &[&Node]) -> Vec<String> {
        found.iter().map(|n| n.id.to_string()).collect()
    }

    #[test]
    fn test_query_sorted_by_offsets() {
        let (index, nodes) = build(&[anno("c", 4, 9), anno("a", 0, 5), anno("b", 0, 2)]);
        let path = PropertyPath::new("p1", "content");
        let found = index.query(&nodes, &path, None, None);
        assert_eq!(ids(&found), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_query_range_filter() {
        let (index, nodes) = build(&[anno("bold", 0, 5), anno("tail", 8, 11)]);
        let path = PropertyPath::new("p1", "content");

        assert_eq!(ids(&index.query(&nodes, &path, Some(6), Some(11))), vec!["tail"]);
        assert_eq!(ids(&index.query(&nodes, &path, Some(5), Some(7))), vec!["bold"]);
        assert!(index.query(&nodes, &path, Some(6), Some(7)).is_empty());
        assert_eq!(ids(&index.query(&nodes, &path, Some(9), None)), vec!["tail"]);
    }

    #[test]
    fn test_remove_cleans_up() {
        let a = anno("a", 0, 1);
        let (mut index, _) = build(std::slice::from_ref(&a));
        assert!(!index.is_empty());
        index.remove(&a.id, a.range.as_ref().unwrap());
        assert!(index.is_empty());
        assert_eq!(index.ids_on_node("p1").count(), 0);
    }

    #[test]
    fn test_query_node_spans_properties() {
        let title = Node::ranged("t", "strong", PropertyPath::new("fig", "title"), 0, 2);
        let other = Node::ranged("o", "strong", PropertyPath::new("fig", "alt"), 1, 3);
        let (index, nodes) = build(&[other, title]);
        assert_eq!(ids(&index.query_node(&nodes, "fig")), vec!["t", "o"]);
    }
}
