//! Selection variants and coordinate ordering.
//!
//! Selections are plain values recomputed per operation. Start always precedes end
//! in document order; `reverse` records whether the user made the selection
//! backwards.
//!
//! Coordinates normally address a text property. A coordinate on a node without
//! that text property (a table of contents, say) addresses the node itself:
//! offset 0 sits before it and offset 1 after it.

use std::cmp::Ordering;

use smol_str::SmolStr;

use crate::document::Document;
use crate::error::{ModelError, Result};
use crate::node::{Coordinate, Node, NodeId, PropertyPath, TextRange};
use crate::schema::NodeKind;

/// Range inside one text property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySelection {
    pub path: PropertyPath,
    pub start: usize,
    pub end: usize,
    pub reverse: bool,
    /// Container the edited node is shown in. `None` for a bare property editor.
    pub container_id: Option<NodeId>,
}

impl PropertySelection {
    /// Selection from `anchor` to `head`, in either order.
    pub fn new(path: PropertyPath, anchor: usize, head: usize) -> Self {
        Self {
            path,
            start: anchor.min(head),
            end: anchor.max(head),
            reverse: head < anchor,
            container_id: None,
        }
    }

    pub fn collapsed(path: PropertyPath, offset: usize) -> Self {
        Self::new(path, offset, offset)
    }

    pub fn in_container(mut self, container_id: impl Into<NodeId>) -> Self {
        self.container_id = Some(container_id.into());
        self
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    pub fn start_coordinate(&self) -> Coordinate {
        Coordinate::new(self.path.clone(), self.start)
    }

    pub fn end_coordinate(&self) -> Coordinate {
        Coordinate::new(self.path.clone(), self.end)
    }

    pub fn range(&self) -> TextRange {
        TextRange::new(self.path.clone(), self.start, self.end)
    }
}

/// Range spanning positions of a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSelection {
    pub container_id: NodeId,
    pub start: Coordinate,
    pub end: Coordinate,
    pub reverse: bool,
}

impl ContainerSelection {
    /// Order `anchor` and `head` by their position in the container.
    pub fn new(
        doc: &Document,
        container_id: impl Into<NodeId>,
        anchor: Coordinate,
        head: Coordinate,
    ) -> Result<Self> {
        let container_id = container_id.into();
        let reverse = doc.compare_coordinates(&container_id, &anchor, &head)? == Ordering::Greater;
        let (start, end) = if reverse { (head, anchor) } else { (anchor, head) };
        Ok(Self {
            container_id,
            start,
            end,
            reverse,
        })
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Container-level ids from the start node to the end node, inclusive.
    pub fn node_ids(&self, doc: &Document) -> Result<Vec<NodeId>> {
        let container = doc.container(&self.container_id)?;
        let start = container.position_strict(&doc.root(self.start.node_id()))?;
        let end = container.position_strict(&doc.root(self.end.node_id()))?;
        let (start, end) = (start.min(end), start.max(end));
        Ok(container.node_ids()[start..=end].to_vec())
    }
}

/// Placement relative to a whole node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeSelectionMode {
    Before,
    After,
    Full,
}

/// A single node selected as a unit, or a cursor beside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSelection {
    pub container_id: NodeId,
    pub node_id: NodeId,
    pub mode: NodeSelectionMode,
}

impl NodeSelection {
    pub fn new(
        container_id: impl Into<NodeId>,
        node_id: impl Into<NodeId>,
        mode: NodeSelectionMode,
    ) -> Self {
        Self {
            container_id: container_id.into(),
            node_id: node_id.into(),
            mode,
        }
    }

    pub fn is_before(&self) -> bool {
        self.mode == NodeSelectionMode::Before
    }

    pub fn is_after(&self) -> bool {
        self.mode == NodeSelectionMode::After
    }

    pub fn is_full(&self) -> bool {
        self.mode == NodeSelectionMode::Full
    }

    fn coordinate(&self, offset: usize) -> Coordinate {
        Coordinate::new(PropertyPath::new(self.node_id.clone(), ""), offset)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    Null,
    Property(PropertySelection),
    Container(ContainerSelection),
    Node(NodeSelection),
}

impl Selection {
    pub fn is_null(&self) -> bool {
        matches!(self, Selection::Null)
    }

    /// Null selections count as collapsed.
    pub fn is_collapsed(&self) -> bool {
        match self {
            Selection::Null => true,
            Selection::Property(sel) => sel.is_collapsed(),
            Selection::Container(sel) => sel.is_collapsed(),
            Selection::Node(sel) => !sel.is_full(),
        }
    }

    pub fn is_property_selection(&self) -> bool {
        matches!(self, Selection::Property(_))
    }

    pub fn is_container_selection(&self) -> bool {
        matches!(self, Selection::Container(_))
    }

    pub fn is_node_selection(&self) -> bool {
        matches!(self, Selection::Node(_))
    }

    pub fn is_reverse(&self) -> bool {
        match self {
            Selection::Property(sel) => sel.reverse,
            Selection::Container(sel) => sel.reverse,
            Selection::Null | Selection::Node(_) => false,
        }
    }

    pub fn container_id(&self) -> Option<&NodeId> {
        match self {
            Selection::Null => None,
            Selection::Property(sel) => sel.container_id.as_ref(),
            Selection::Container(sel) => Some(&sel.container_id),
            Selection::Node(sel) => Some(&sel.container_id),
        }
    }

    pub fn start(&self) -> Option<Coordinate> {
        match self {
            Selection::Null => None,
            Selection::Property(sel) => Some(sel.start_coordinate()),
            Selection::Container(sel) => Some(sel.start.clone()),
            Selection::Node(sel) => Some(sel.coordinate(if sel.is_after() { 1 } else { 0 })),
        }
    }

    pub fn end(&self) -> Option<Coordinate> {
        match self {
            Selection::Null => None,
            Selection::Property(sel) => Some(sel.end_coordinate()),
            Selection::Container(sel) => Some(sel.end.clone()),
            Selection::Node(sel) => Some(sel.coordinate(if sel.is_before() { 0 } else { 1 })),
        }
    }

    /// Collapsed cursor in a text property, shown in `container_id`.
    pub fn cursor(path: PropertyPath, offset: usize, container_id: Option<NodeId>) -> Self {
        let mut sel = PropertySelection::collapsed(path, offset);
        sel.container_id = container_id;
        Selection::Property(sel)
    }

    /// Cursor right after `node_id`: the end of its text, the end of its last list
    /// item, or beside the node when it has no text.
    pub fn after_node(doc: &Document, node_id: &str, container_id: &str) -> Result<Self> {
        let container = Some(SmolStr::new(container_id));
        let kind = doc
            .kind(node_id)
            .ok_or_else(|| ModelError::NotFound(SmolStr::new(node_id)))?;
        match kind {
            NodeKind::Text | NodeKind::ListItem => {
                let path = doc.text_path(node_id)?;
                let len = doc.text_len(&path)?;
                Ok(Selection::cursor(path, len, container))
            }
            NodeKind::List => match doc.list_items(node_id)?.last() {
                Some(item) => {
                    let path = doc.text_path(item)?;
                    let len = doc.text_len(&path)?;
                    Ok(Selection::cursor(path, len, container))
                }
                None => Ok(Selection::Node(NodeSelection::new(
                    container_id,
                    node_id,
                    NodeSelectionMode::After,
                ))),
            },
            _ => Ok(Selection::Node(NodeSelection::new(
                container_id,
                node_id,
                NodeSelectionMode::After,
            ))),
        }
    }
}

/// Whether `selection` lies inside the annotation's range.
///
/// Only property selections can be tested; any other kind logs a warning and
/// reports `false`.
pub fn contains_selection(annotation: &Node, selection: &Selection) -> bool {
    match selection {
        Selection::Null => false,
        Selection::Property(sel) => annotation.range.as_ref().is_some_and(|range| {
            range.path() == &sel.path
                && range.start.offset <= sel.start
                && sel.end <= range.end.offset
        }),
        _ => {
            tracing::warn!(annotation = %annotation.id, "containment check on a non-property selection");
            false
        }
    }
}

impl Document {
    /// Length of the content a coordinate moves through: the text length, or 1 for
    /// a node coordinate.
    pub fn coordinate_len(&self, coord: &Coordinate) -> Result<usize> {
        let descriptor = self.descriptor(coord.node_id())?;
        match descriptor.get_property(&coord.path.property) {
            Some(prop) if prop.kind.is_text() => self.text_len(&coord.path),
            _ => Ok(1),
        }
    }

    /// Whether `coord` sits at the very start of its root node's content.
    pub fn is_first(&self, coord: &Coordinate) -> Result<bool> {
        let root = self.root(coord.node_id());
        if self.is_kind(&root, NodeKind::List) {
            let items = self.list_items(&root)?;
            return Ok(items.first() == Some(coord.node_id()) && coord.offset == 0);
        }
        Ok(coord.offset == 0)
    }

    /// Whether `coord` sits at the very end of its root node's content.
    pub fn is_last(&self, coord: &Coordinate) -> Result<bool> {
        let root = self.root(coord.node_id());
        let at_end = coord.offset >= self.coordinate_len(coord)?;
        if self.is_kind(&root, NodeKind::List) {
            let items = self.list_items(&root)?;
            return Ok(items.last() == Some(coord.node_id()) && at_end);
        }
        Ok(at_end)
    }

    /// Document order of two coordinates within a container.
    pub fn compare_coordinates(
        &self,
        container_id: &str,
        a: &Coordinate,
        b: &Coordinate,
    ) -> Result<Ordering> {
        Ok(self
            .coordinate_key(container_id, a)?
            .cmp(&self.coordinate_key(container_id, b)?))
    }

    fn coordinate_key(&self, container_id: &str, coord: &Coordinate) -> Result<(usize, usize, usize)> {
        let root = self.root(coord.node_id());
        let pos = self.container(container_id)?.position_strict(&root)?;
        let item = if root != *coord.node_id() && self.is_kind(&root, NodeKind::List) {
            self.list_item_position(&root, coord.node_id())?
        } else {
            0
        };
        Ok((pos, item, coord.offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{body_doc, bold, list_doc};

    fn coord(id: &str, offset: usize) -> Coordinate {
        Coordinate::new(PropertyPath::new(id, "content"), offset)
    }

    #[test]
    fn test_property_selection_normalizes() {
        let sel = PropertySelection::new(PropertyPath::new("p1", "content"), 7, 2);
        assert_eq!((sel.start, sel.end), (2, 7));
        assert!(sel.reverse);
        let sel = Selection::Property(sel);
        assert!(sel.is_reverse());
        assert!(!sel.is_collapsed());
        assert!(sel.container_id().is_none());
    }

    #[test]
    fn test_null_selection() {
        let sel = Selection::default();
        assert!(sel.is_null());
        assert!(sel.is_collapsed());
        assert!(sel.start().is_none());
    }

    #[test]
    fn test_container_selection_reverse_by_document_order() {
        let doc = body_doc(&[("a", "alpha"), ("b", "beta"), ("c", "gamma")]);
        let sel = ContainerSelection::new(&doc, "body", coord("c", 2), coord("a", 3)).unwrap();
        assert!(sel.reverse);
        assert_eq!(sel.start, coord("a", 3));
        assert_eq!(sel.end, coord("c", 2));
        assert_eq!(sel.node_ids(&doc).unwrap(), vec!["a", "b", "c"]);

        let forward = ContainerSelection::new(&doc, "body", coord("a", 3), coord("b", 0)).unwrap();
        assert!(!forward.reverse);
        assert_eq!(forward.node_ids(&doc).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_container_selection_orders_list_items() {
        let doc = list_doc(&["one", "two"]);
        let sel = ContainerSelection::new(&doc, "body", coord("li-2", 0), coord("li-1", 2)).unwrap();
        assert!(sel.reverse);
        assert_eq!(sel.start.node_id(), "li-1");
        assert_eq!(sel.node_ids(&doc).unwrap(), vec!["l1"]);
    }

    #[test]
    fn test_is_first_and_last() {
        let doc = body_doc(&[("a", "alpha")]);
        assert!(doc.is_first(&coord("a", 0)).unwrap());
        assert!(!doc.is_first(&coord("a", 1)).unwrap());
        assert!(doc.is_last(&coord("a", 5)).unwrap());
        assert!(!doc.is_last(&coord("a", 4)).unwrap());

        let doc = list_doc(&["one", "two"]);
        assert!(doc.is_first(&coord("li-1", 0)).unwrap());
        assert!(!doc.is_first(&coord("li-2", 0)).unwrap());
        assert!(doc.is_last(&coord("li-2", 3)).unwrap());
        assert!(!doc.is_last(&coord("li-1", 3)).unwrap());
    }

    #[test]
    fn test_node_coordinates() {
        let mut doc = body_doc(&[]);
        doc.create(Node::new("toc", "toc")).unwrap();
        doc.container_mut("body").unwrap().show("toc", None).unwrap();
        let before = Coordinate::new(PropertyPath::new("toc", ""), 0);
        let after = Coordinate::new(PropertyPath::new("toc", ""), 1);
        assert!(doc.is_first(&before).unwrap());
        assert!(doc.is_last(&after).unwrap());

        let sel = Selection::after_node(&doc, "toc", "body").unwrap();
        assert!(sel.is_node_selection());
        assert!(sel.is_collapsed());
        assert_eq!(sel.start(), Some(after));
    }

    #[test]
    fn test_after_node() {
        let doc = list_doc(&["one", "two"]);
        let sel = Selection::after_node(&doc, "l1", "body").unwrap();
        assert_eq!(sel.start(), Some(coord("li-2", 3)));
        assert_eq!(sel.container_id().map(|c| c.as_str()), Some("body"));
    }

    #[test]
    fn test_contains_selection() {
        let anno = bold("b1", "p1", 2, 8);
        let inside = Selection::Property(PropertySelection::new(PropertyPath::new("p1", "content"), 3, 5));
        let outside = Selection::Property(PropertySelection::new(PropertyPath::new("p1", "content"), 1, 5));
        let elsewhere = Selection::Property(PropertySelection::new(PropertyPath::new("p2", "content"), 3, 5));
        assert!(contains_selection(&anno, &inside));
        assert!(!contains_selection(&anno, &outside));
        assert!(!contains_selection(&anno, &elsewhere));
        assert!(!contains_selection(&anno, &Selection::Null));

        let node = Selection::Node(NodeSelection::new("body", "p1", NodeSelectionMode::Full));
        assert!(!contains_selection(&anno, &node));
    }
}
