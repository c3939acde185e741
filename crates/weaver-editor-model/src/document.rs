//! The node graph.
//!
//! A [`Document`] owns every node, the annotation and marker indexes derived from
//! them, and a log of the operations applied so far. All mutation goes through
//! [`Document::create`], [`Document::delete`], [`Document::set_property`] and
//! [`Document::set_range`] (plus the text editing helpers built on them), each of
//! which leaves the graph consistent:
//!
//! - ids are unique,
//! - references only point at existing nodes,
//! - every annotation range sits inside the text it addresses.

use std::collections::HashMap;
use std::sync::Arc;

use smol_str::SmolStr;

use crate::error::{ModelError, Result};
use crate::index::RangeIndex;
use crate::node::{Node, NodeId, PropertyPath, PropertyValue, TextRange};
use crate::operation::Operation;
use crate::schema::{NodeDescriptor, NodeKind, PropertyKind, Schema};

/// Id of the single container held by snippet documents.
pub const SNIPPET_ID: &str = "snippet";

/// Id of the text node created for a copied property selection or a single pasted line.
pub const TEXT_SNIPPET_ID: &str = "text-snippet";

#[derive(Debug, Clone)]
pub struct Document {
    schema: Arc<Schema>,
    pub(crate) nodes: HashMap<NodeId, Node>,
    pub(crate) annotations: RangeIndex,
    pub(crate) markers: RangeIndex,
    parents: HashMap<NodeId, NodeId>,
    operations: Vec<Operation>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(Arc::new(Schema::default()))
    }
}

impl Document {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            nodes: HashMap::new(),
            annotations: RangeIndex::new(),
            markers: RangeIndex::new(),
            parents: HashMap::new(),
            operations: Vec::new(),
        }
    }

    /// Empty document on the same schema.
    pub fn new_instance(&self) -> Self {
        Self::new(self.schema.clone())
    }

    /// Empty document on the same schema holding one empty container, [`SNIPPET_ID`].
    pub fn new_snippet(&self) -> Self {
        let mut snippet = self.new_instance();
        snippet.insert_unchecked(
            Node::new(SNIPPET_ID, "container").with("nodes", PropertyValue::References(vec![])),
        );
        snippet.operations.clear();
        snippet
    }

    /// Load serialized records, creating them in dependency order.
    ///
    /// Loading is not an edit: the operation log of the result is empty.
    pub fn from_records(schema: Arc<Schema>, records: Vec<Node>) -> Result<Self> {
        let mut doc = Self::new(schema);
        let (ranged, mut pending): (Vec<Node>, Vec<Node>) =
            records.into_iter().partition(|n| n.range.is_some());

        while !pending.is_empty() {
            let before = pending.len();
            let mut blocked = Vec::new();
            for node in pending {
                if doc.first_missing_reference(&node).is_none() {
                    doc.create(node)?;
                } else {
                    blocked.push(node);
                }
            }
            if blocked.len() == before {
                let missing = blocked
                    .iter()
                    .find_map(|n| doc.first_missing_reference(n))
                    .unwrap_or_default();
                return Err(ModelError::NotFound(missing));
            }
            pending = blocked;
        }

        for node in ranged {
            doc.create(node)?;
        }
        doc.operations.clear();
        Ok(doc)
    }

    pub fn from_json(schema: Arc<Schema>, json: &str) -> Result<Self> {
        let records: Vec<Node> = serde_json::from_str(json)?;
        Self::from_records(schema, records)
    }

    /// All nodes, sorted by id.
    pub fn to_records(&self) -> Vec<Node> {
        let mut records: Vec<Node> = self.nodes.values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_records())?)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_strict(&self, id: &str) -> Result<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| ModelError::NotFound(SmolStr::new(id)))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Descriptor of the node's type.
    pub fn descriptor(&self, id: &str) -> Result<&NodeDescriptor> {
        let node = self.get_strict(id)?;
        self.schema
            .descriptor(&node.node_type)
            .ok_or_else(|| ModelError::UnknownType(node.node_type.clone()))
    }

    pub fn kind(&self, id: &str) -> Option<NodeKind> {
        self.get(id).and_then(|n| self.schema.kind_of(&n.node_type))
    }

    pub fn is_kind(&self, id: &str, kind: NodeKind) -> bool {
        self.kind(id) == Some(kind)
    }

    /// Owner of `id`, if it is an owned child.
    pub fn parent(&self, id: &str) -> Option<&NodeId> {
        self.parents.get(id)
    }

    /// Top-most owner of `id` (a list for a list item), or `id` itself.
    pub fn root(&self, id: &str) -> NodeId {
        let mut current = SmolStr::new(id);
        while let Some(parent) = self.parents.get(&current) {
            current = parent.clone();
        }
        current
    }

    /// Operations recorded since the last [`Document::take_operations`].
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn take_operations(&mut self) -> Vec<Operation> {
        std::mem::take(&mut self.operations)
    }

    /// Insert a new node.
    ///
    /// Missing non-optional text properties are filled with empty text. Fails when
    /// the id is taken, the type is unknown, a property is undeclared, a reference
    /// dangles or the range is invalid.
    pub fn create(&mut self, mut node: Node) -> Result<&Node> {
        if self.contains(&node.id) {
            return Err(ModelError::DuplicateId(node.id));
        }
        let descriptor = self
            .schema
            .descriptor(&node.node_type)
            .ok_or_else(|| ModelError::UnknownType(node.node_type.clone()))?;

        for (name, value) in &node.properties {
            let prop = descriptor
                .get_property(name)
                .ok_or_else(|| ModelError::PropertyNotFound {
                    node: node.id.clone(),
                    property: name.clone(),
                })?;
            self.check_value(prop.kind, value)?;
        }
        for prop in descriptor.text_properties() {
            if !prop.optional && !node.properties.contains_key(&prop.name) {
                node.properties
                    .insert(prop.name.clone(), PropertyValue::text(""));
            }
        }

        if descriptor.kind.is_ranged() {
            let range = node.range.as_ref().ok_or(ModelError::InvalidRange {
                id: node.id.clone(),
                reason: "annotation without range",
            })?;
            self.check_range(&node.id, range)?;
        } else if node.range.is_some() {
            return Err(ModelError::InvalidRange {
                id: node.id.clone(),
                reason: "range on a node that is not an annotation",
            });
        }

        let id = node.id.clone();
        self.insert_unchecked(node);
        Ok(&self.nodes[&id])
    }

    /// Delete a node, its owned descendants and every range anchored on them.
    ///
    /// References to the deleted node from outside the subtree (containers, the
    /// owning parent, cross references) are removed first.
    pub fn delete(&mut self, id: &str) -> Result<Node> {
        let node = self.get_strict(id)?.clone();

        let subtree = self.owned_subtree(id);
        let mut ranged: Vec<NodeId> = Vec::new();
        for member in &subtree {
            ranged.extend(self.annotations.ids_on_node(member).cloned());
            ranged.extend(self.markers.ids_on_node(member).cloned());
        }
        let removed: Vec<NodeId> = subtree.iter().chain(&ranged).cloned().collect();
        self.detach_references(&subtree, &removed);

        for anno in ranged {
            if !subtree.contains(&anno) {
                self.remove_unchecked(&anno);
            }
        }
        for member in &subtree {
            self.remove_unchecked(member);
        }
        tracing::debug!(%id, removed = subtree.len(), "deleted node");
        Ok(node)
    }

    /// Set a declared property, returning the previous value.
    ///
    /// Owned children named in the new value are re-parented. Setting a text
    /// property clips ranges that would reach past the new text.
    pub fn set_property(
        &mut self,
        id: &str,
        property: &str,
        value: PropertyValue,
    ) -> Result<PropertyValue> {
        let kind = {
            let descriptor = self.descriptor(id)?;
            descriptor
                .get_property(property)
                .ok_or_else(|| ModelError::PropertyNotFound {
                    node: SmolStr::new(id),
                    property: SmolStr::new(property),
                })?
                .kind
        };
        self.check_value(kind, &value)?;

        let new_len = value.as_text().map(|t| t.chars().count());
        let old = self.set_property_unchecked(id, property, value);
        if let Some(len) = new_len {
            self.clip_ranges(&PropertyPath::new(id, property), len)?;
        }
        Ok(old)
    }

    /// Move an annotation or marker to a new range.
    pub fn set_range(&mut self, id: &str, range: TextRange) -> Result<()> {
        let node = self.get_strict(id)?;
        if node.range.is_none() {
            return Err(ModelError::WrongKind {
                node: node.id.clone(),
                expected: "annotation",
            });
        }
        let id = node.id.clone();
        self.check_range(&id, &range)?;
        self.set_range_unchecked(&id, range);
        Ok(())
    }

    /// Replay a recorded operation verbatim.
    ///
    /// No cascades and no bounds checks: a recorded batch is consistent as a whole
    /// but may pass through intermediate states that are not.
    pub fn apply(&mut self, op: &Operation) -> Result<()> {
        match op {
            Operation::Create { node } => {
                if self.contains(&node.id) {
                    return Err(ModelError::DuplicateId(node.id.clone()));
                }
                if self.schema.descriptor(&node.node_type).is_none() {
                    return Err(ModelError::UnknownType(node.node_type.clone()));
                }
                self.insert_unchecked(node.clone());
            }
            Operation::Delete { node } => {
                self.get_strict(&node.id)?;
                self.remove_unchecked(&node.id);
            }
            Operation::Set {
                id, property, new, ..
            } => {
                self.get_strict(id)?;
                self.set_property_unchecked(id, property, new.clone());
            }
            Operation::SetRange { id, new, .. } => {
                self.get_strict(id)?;
                self.set_range_unchecked(id, new.clone());
            }
        }
        Ok(())
    }

    // === Internals ===

    pub(crate) fn insert_unchecked(&mut self, node: Node) {
        let kind = self.schema.kind_of(&node.node_type);
        if let Some(descriptor) = self.schema.descriptor(&node.node_type) {
            for prop in descriptor.owned_references() {
                if let Some(value) = node.get(&prop.name) {
                    for child in value.referenced_ids() {
                        self.parents.insert(child, node.id.clone());
                    }
                }
            }
        }
        if let Some(range) = &node.range {
            match kind {
                Some(NodeKind::Marker) => self.markers.insert(&node.id, range),
                Some(k) if k.is_indexed_annotation() => self.annotations.insert(&node.id, range),
                _ => {}
            }
        }
        self.operations.push(Operation::Create { node: node.clone() });
        self.nodes.insert(node.id.clone(), node);
    }

    pub(crate) fn remove_unchecked(&mut self, id: &str) -> Option<Node> {
        let node = self.nodes.remove(id)?;
        if let Some(range) = &node.range {
            self.annotations.remove(&node.id, range);
            self.markers.remove(&node.id, range);
        }
        self.parents.remove(id);
        self.parents.retain(|_, parent| parent.as_str() != id);
        self.operations.push(Operation::Delete { node: node.clone() });
        Some(node)
    }

    fn set_property_unchecked(
        &mut self,
        id: &str,
        property: &str,
        value: PropertyValue,
    ) -> PropertyValue {
        let owned = self
            .descriptor(id)
            .ok()
            .and_then(|d| d.get_property(property))
            .is_some_and(|p| p.kind.is_owned());

        let Some(node) = self.nodes.get_mut(id) else {
            return PropertyValue::Null;
        };
        let old = node
            .properties
            .insert(SmolStr::new(property), value.clone())
            .unwrap_or(PropertyValue::Null);
        let node_id = node.id.clone();

        if owned {
            for child in old.referenced_ids() {
                if self.parents.get(&child) == Some(&node_id) {
                    self.parents.remove(&child);
                }
            }
            for child in value.referenced_ids() {
                self.parents.insert(child, node_id.clone());
            }
        }

        self.operations.push(Operation::Set {
            id: node_id,
            property: SmolStr::new(property),
            old: old.clone(),
            new: value,
        });
        old
    }

    pub(crate) fn set_range_unchecked(&mut self, id: &str, range: TextRange) {
        let is_marker = self.is_kind(id, NodeKind::Marker);
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        let Some(old) = node.range.replace(range.clone()) else {
            return;
        };
        let node_id = node.id.clone();
        if old.path() != range.path() {
            let index = if is_marker {
                &mut self.markers
            } else {
                &mut self.annotations
            };
            index.remove(&node_id, &old);
            index.insert(&node_id, &range);
        }
        self.operations.push(Operation::SetRange {
            id: node_id,
            old,
            new: range,
        });
    }

    /// `id` followed by its owned descendants, pre-order.
    pub(crate) fn owned_subtree(&self, id: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_subtree(id, &mut out);
        out
    }

    fn collect_subtree(&self, id: &str, out: &mut Vec<NodeId>) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        if out.contains(&node.id) {
            return;
        }
        out.push(node.id.clone());
        let Some(descriptor) = self.schema.descriptor(&node.node_type) else {
            return;
        };
        for prop in descriptor.owned_references() {
            if let Some(value) = node.get(&prop.name) {
                for child in value.referenced_ids() {
                    self.collect_subtree(&child, out);
                }
            }
        }
    }

    /// Remove references to any of `targets` held by nodes outside `removed`.
    fn detach_references(&mut self, targets: &[NodeId], removed: &[NodeId]) {
        let mut updates: Vec<(NodeId, SmolStr, PropertyValue)> = Vec::new();
        for node in self.nodes.values() {
            if removed.contains(&node.id) {
                continue;
            }
            for (name, value) in &node.properties {
                match value {
                    PropertyValue::Reference(target) if targets.contains(target) => {
                        updates.push((node.id.clone(), name.clone(), PropertyValue::Null));
                    }
                    PropertyValue::References(_) => {
                        let mut pruned = value.clone();
                        let mut changed = false;
                        for target in targets {
                            changed |= pruned.remove_id(target);
                        }
                        if changed {
                            updates.push((node.id.clone(), name.clone(), pruned));
                        }
                    }
                    _ => {}
                }
            }
        }
        for (node_id, name, value) in updates {
            self.set_property_unchecked(&node_id, &name, value);
        }
    }

    /// Pull every range on `path` back inside `[0, len]`.
    pub(crate) fn clip_ranges(&mut self, path: &PropertyPath, len: usize) -> Result<()> {
        let ranged: Vec<Node> = self
            .annotations
            .query(&self.nodes, path, None, None)
            .into_iter()
            .chain(self.markers.query(&self.nodes, path, None, None))
            .cloned()
            .collect();
        for node in ranged {
            let Some(range) = &node.range else { continue };
            if range.end.offset <= len {
                continue;
            }
            let start = range.start.offset.min(len);
            if start == len && !range.is_empty() {
                self.delete(&node.id)?;
            } else {
                self.set_range_unchecked(&node.id, TextRange::new(path.clone(), start, len));
            }
        }
        Ok(())
    }

    fn check_value(&self, kind: PropertyKind, value: &PropertyValue) -> Result<()> {
        if kind.is_reference() {
            for id in value.referenced_ids() {
                if !self.contains(&id) {
                    return Err(ModelError::NotFound(id));
                }
            }
        }
        Ok(())
    }

    fn check_range(&self, id: &NodeId, range: &TextRange) -> Result<()> {
        if range.start.path != range.end.path {
            return Err(ModelError::InvalidRange {
                id: id.clone(),
                reason: "start and end address different properties",
            });
        }
        if range.start.offset > range.end.offset {
            return Err(ModelError::InvalidRange {
                id: id.clone(),
                reason: "start after end",
            });
        }
        let len = self.text_len(range.path())?;
        if range.end.offset > len {
            return Err(ModelError::InvalidOffset {
                path: range.path().clone(),
                offset: range.end.offset,
                len,
            });
        }
        Ok(())
    }

    fn first_missing_reference(&self, node: &Node) -> Option<NodeId> {
        let descriptor = self.schema.descriptor(&node.node_type)?;
        node.properties
            .iter()
            .filter(|(name, _)| {
                descriptor
                    .get_property(name)
                    .is_some_and(|p| p.kind.is_reference())
            })
            .flat_map(|(_, value)| value.referenced_ids())
            .find(|id| !self.contains(id))
    }
}
