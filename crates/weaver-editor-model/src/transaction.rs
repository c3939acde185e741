//! Selection-relative editing.
//!
//! A [`Transaction`] bundles the target document with the current selection, the
//! id generator and the config. Commands run against it move the selection along
//! with the content they change. Every change lands in the document's operation
//! log, so the caller owns the undo boundary.

use smol_str::SmolStr;

use crate::config::ModelConfig;
use crate::document::Document;
use crate::error::{ModelError, Result};
use crate::helpers::merge_text_nodes;
use crate::ids::IdGenerator;
use crate::node::{Coordinate, Node, NodeId, PropertyPath, PropertyValue};
use crate::schema::NodeKind;
use crate::selection::{ContainerSelection, NodeSelection, NodeSelectionMode, Selection};

pub struct Transaction<'a> {
    pub(crate) doc: &'a mut Document,
    selection: Selection,
    pub(crate) ids: &'a mut dyn IdGenerator,
    config: &'a ModelConfig,
}

impl<'a> Transaction<'a> {
    pub fn new(
        doc: &'a mut Document,
        selection: Selection,
        ids: &'a mut dyn IdGenerator,
        config: &'a ModelConfig,
    ) -> Self {
        Self {
            doc,
            selection,
            ids,
            config,
        }
    }

    pub fn document(&self) -> &Document {
        self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
    }

    pub fn into_selection(self) -> Selection {
        self.selection
    }

    pub fn config(&self) -> &ModelConfig {
        self.config
    }

    /// Fresh id for a node of `node_type`, free in the target document.
    pub fn fresh_id(&mut self, node_type: &str) -> NodeId {
        self.ids.fresh(self.doc, node_type)
    }

    /// Type `text` at the selection, replacing selected content.
    pub fn insert_text(&mut self, text: &str) -> Result<()> {
        if self.selection.is_container_selection() || self.is_full_node_selection() {
            self.delete_selection()?;
        }
        let Selection::Property(sel) = &self.selection else {
            tracing::warn!(selection = ?self.selection, "text insertion without a property selection");
            return Err(ModelError::IllegalSelection(
                "text can only be inserted at a property selection",
            ));
        };
        let (path, start, end) = (sel.path.clone(), sel.start, sel.end);
        let container = sel.container_id.clone();

        if start == end {
            self.doc.insert_text(&path, start, text)?;
        } else {
            self.doc.replace_text(&path, start, end, text, self.ids)?;
        }
        let offset = start + text.chars().count();
        self.selection = Selection::cursor(path, offset, container);
        Ok(())
    }

    /// Remove the selected content, leaving a collapsed selection where it was.
    pub fn delete_selection(&mut self) -> Result<()> {
        match self.selection.clone() {
            Selection::Null => Ok(()),
            Selection::Property(sel) => {
                if sel.is_collapsed() {
                    return Ok(());
                }
                self.doc.delete_text(&sel.path, sel.start, sel.end)?;
                self.selection = Selection::cursor(sel.path, sel.start, sel.container_id);
                Ok(())
            }
            Selection::Node(sel) => {
                if sel.is_full() {
                    self.replace_with_empty_text(&sel.container_id, &sel.node_id)?;
                }
                Ok(())
            }
            Selection::Container(sel) => {
                if sel.is_collapsed() {
                    return Ok(());
                }
                self.delete_container_selection(&sel)
            }
        }
    }

    /// Split the text node at the cursor, moving the tail and its annotations into a
    /// new node right after it. List items split into a new item.
    pub fn break_node(&mut self) -> Result<()> {
        if !self.selection.is_collapsed() {
            self.delete_selection()?;
        }
        let Selection::Property(sel) = &self.selection else {
            return Err(ModelError::IllegalSelection(
                "breaking needs a collapsed property selection",
            ));
        };
        let container_id = sel.container_id.clone().ok_or(ModelError::IllegalSelection(
            "breaking needs a selection inside a container",
        ))?;
        let path = sel.path.clone();
        let offset = sel.start;
        let node_id = path.node_id.clone();

        let node = self.doc.get_strict(&node_id)?.clone();
        let kind = self
            .doc
            .kind(&node_id)
            .ok_or_else(|| ModelError::UnknownType(node.node_type.clone()))?;
        let text = self.doc.text(&path)?.to_string();
        let len = text.chars().count();
        let tail: String = text.chars().skip(offset).collect();

        let new_id = self.fresh_id(&node.node_type);
        let mut split = Node::new(new_id.clone(), node.node_type.clone());
        split.properties = node
            .properties
            .iter()
            .filter(|(_, v)| !matches!(v, PropertyValue::Text(_)))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        split = split.with(&path.property, PropertyValue::Text(tail));

        match kind {
            NodeKind::Text => {
                let pos = self
                    .doc
                    .container(&container_id)?
                    .position_strict(&node_id)?;
                self.doc.create(split)?;
                self.doc
                    .container_mut(&container_id)?
                    .show(&new_id, Some(pos + 1))?;
            }
            NodeKind::ListItem => {
                let list = self.doc.root(&node_id);
                let pos = self.doc.list_item_position(&list, &node_id)?;
                self.doc.insert_list_item(&list, pos + 1, split)?;
            }
            _ => {
                return Err(ModelError::WrongKind {
                    node: node_id,
                    expected: "text node or list item",
                });
            }
        }

        let new_path = path.with_node(new_id.clone());
        self.doc
            .transfer_ranges(&path, offset, &new_path, 0, self.ids)?;
        self.doc.delete_text(&path, offset, len)?;
        tracing::debug!(node = %node_id, split = %new_id, offset, "broke node");

        self.selection = Selection::cursor(new_path, 0, Some(container_id));
        Ok(())
    }

    fn is_full_node_selection(&self) -> bool {
        matches!(&self.selection, Selection::Node(sel) if sel.is_full())
    }

    /// Replace a shown node with an empty default text node and put the cursor in it.
    fn replace_with_empty_text(&mut self, container_id: &str, node_id: &str) -> Result<()> {
        let pos = self.doc.container(container_id)?.position_strict(node_id)?;
        self.doc.delete(node_id)?;
        let path = self.insert_empty_text(container_id, pos)?;
        self.selection = Selection::cursor(path, 0, Some(SmolStr::new(container_id)));
        Ok(())
    }

    fn insert_empty_text(&mut self, container_id: &str, pos: usize) -> Result<PropertyPath> {
        let text_type = self.doc.schema().default_text_type().clone();
        let id = self.fresh_id(&text_type);
        self.doc.create(Node::new(id.clone(), text_type))?;
        self.doc
            .container_mut(container_id)?
            .show(&id, Some(pos))?;
        self.doc.text_path(&id)
    }

    fn delete_container_selection(&mut self, sel: &ContainerSelection) -> Result<()> {
        let container_id = sel.container_id.clone();
        let (start, end) = (&sel.start, &sel.end);
        let start_root = self.doc.root(start.node_id());
        let end_root = self.doc.root(end.node_id());

        if start_root == end_root {
            self.delete_within_node(&start_root, start, end)?;
            self.selection = Selection::cursor(start.path.clone(), start.offset, Some(container_id));
            return Ok(());
        }

        let ids = sel.node_ids(self.doc)?;
        for inner in &ids[1..ids.len() - 1] {
            self.doc.delete(inner)?;
        }

        // end side
        let end_kind = self.doc.kind(&end_root);
        let end_at_last = self.doc.is_last(end)?;
        let end_survives = match end_kind {
            Some(NodeKind::Text) if end_at_last => {
                self.doc.delete(&end_root)?;
                false
            }
            Some(NodeKind::Text) => {
                self.doc.delete_text(&end.path, 0, end.offset)?;
                true
            }
            Some(NodeKind::List) if end_at_last => {
                self.doc.delete(&end_root)?;
                false
            }
            Some(NodeKind::List) => {
                self.truncate_list_until(&end_root, end)?;
                true
            }
            _ if end.offset > 0 => {
                self.doc.delete(&end_root)?;
                false
            }
            _ => true,
        };

        // start side
        let start_kind = self.doc.kind(&start_root);
        match start_kind {
            Some(NodeKind::Text) => {
                let len = self.doc.text_len(&start.path)?;
                self.doc.delete_text(&start.path, start.offset, len)?;
            }
            Some(NodeKind::List) => self.truncate_list_from(&start_root, start)?,
            _ if start.offset == 0 => {
                let pos = self
                    .doc
                    .container(&container_id)?
                    .position_strict(&start_root)?;
                self.doc.delete(&start_root)?;
                let path = self.insert_empty_text(&container_id, pos)?;
                self.selection = Selection::cursor(path, 0, Some(container_id));
                return Ok(());
            }
            _ => {
                self.selection = Selection::Node(NodeSelection::new(
                    container_id,
                    start_root,
                    NodeSelectionMode::After,
                ));
                return Ok(());
            }
        }

        let start_owns_text = self
            .doc
            .kind(start.node_id())
            .is_some_and(NodeKind::owns_text);
        if end_survives && start_owns_text && end_kind == Some(NodeKind::Text) {
            merge_text_nodes(self.doc, start.node_id(), &end_root, self.ids)?;
        }
        self.selection = Selection::cursor(start.path.clone(), start.offset, Some(container_id));
        Ok(())
    }

    /// Delete between two coordinates inside the same root node.
    fn delete_within_node(&mut self, root: &str, start: &Coordinate, end: &Coordinate) -> Result<()> {
        if start.path == end.path {
            return self.doc.delete_text(&start.path, start.offset, end.offset);
        }
        if !self.doc.is_kind(root, NodeKind::List) {
            tracing::warn!(node = %root, "selection spans properties of one node, nothing deleted");
            return Ok(());
        }
        let items = self.doc.list_items(root)?;
        let from = self.doc.list_item_position(root, start.node_id())?;
        let to = self.doc.list_item_position(root, end.node_id())?;
        for inner in &items[from + 1..to] {
            self.doc.delete(inner)?;
        }
        let len = self.doc.text_len(&start.path)?;
        self.doc.delete_text(&end.path, 0, end.offset)?;
        self.doc.delete_text(&start.path, start.offset, len)?;
        merge_text_nodes(self.doc, start.node_id(), end.node_id(), self.ids)
    }

    /// Drop the items after the start item and its text from `start`.
    fn truncate_list_from(&mut self, list: &str, start: &Coordinate) -> Result<()> {
        let items = self.doc.list_items(list)?;
        let pos = self.doc.list_item_position(list, start.node_id())?;
        for item in &items[pos + 1..] {
            self.doc.delete(item)?;
        }
        let len = self.doc.text_len(&start.path)?;
        self.doc.delete_text(&start.path, start.offset, len)
    }

    /// Drop the items before the end item and its text up to `end`.
    fn truncate_list_until(&mut self, list: &str, end: &Coordinate) -> Result<()> {
        let items = self.doc.list_items(list)?;
        let pos = self.doc.list_item_position(list, end.node_id())?;
        for item in &items[..pos] {
            self.doc.delete(item)?;
        }
        self.doc.delete_text(&end.path, 0, end.offset)
    }
}
