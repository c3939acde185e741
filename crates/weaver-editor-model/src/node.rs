//! Node records and the coordinate types addressing their text.
//!
//! A [`Node`] is a plain structured record (id, type, properties) plus, for
//! annotations and markers, a [`TextRange`] over one text property. Records carry
//! no behaviour of their own; the [`Document`](crate::Document) interprets them
//! through the [`Schema`](crate::Schema).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Document-unique node identifier.
pub type NodeId = SmolStr;

/// Address of a text property: `(node id, property name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropertyPath {
    pub node_id: NodeId,
    pub property: SmolStr,
}

impl PropertyPath {
    pub fn new(node_id: impl Into<NodeId>, property: impl Into<SmolStr>) -> Self {
        Self {
            node_id: node_id.into(),
            property: property.into(),
        }
    }

    /// Same property on a different node.
    pub fn with_node(&self, node_id: impl Into<NodeId>) -> Self {
        Self {
            node_id: node_id.into(),
            property: self.property.clone(),
        }
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node_id, self.property)
    }
}

/// A position inside a text property. Offsets count chars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub path: PropertyPath,
    pub offset: usize,
}

impl Coordinate {
    pub fn new(path: PropertyPath, offset: usize) -> Self {
        Self { path, offset }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.path.node_id
    }
}

/// Start and end of an annotation or marker.
///
/// Both ends address the same property and `start.offset <= end.offset`;
/// [`Document`](crate::Document) rejects anything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub start: Coordinate,
    pub end: Coordinate,
}

impl TextRange {
    pub fn new(path: PropertyPath, start: usize, end: usize) -> Self {
        Self {
            start: Coordinate::new(path.clone(), start),
            end: Coordinate::new(path, end),
        }
    }

    pub fn path(&self) -> &PropertyPath {
        &self.start.path
    }

    pub fn len(&self) -> usize {
        self.end.offset.saturating_sub(self.start.offset)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Same offsets moved onto another path.
    pub fn with_path(&self, path: PropertyPath) -> Self {
        Self::new(path, self.start.offset, self.end.offset)
    }

    pub fn offsets(&self) -> std::ops::Range<usize> {
        self.start.offset..self.end.offset
    }
}

/// Value of a node property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Integer(i64),
    String(SmolStr),
    Text(String),
    Reference(NodeId),
    /// Array of references; entries are `Reference` or nested `References`.
    References(Vec<PropertyValue>),
}

impl PropertyValue {
    pub fn text(text: impl Into<String>) -> Self {
        PropertyValue::Text(text.into())
    }

    pub fn reference(id: impl Into<NodeId>) -> Self {
        PropertyValue::Reference(id.into())
    }

    pub fn references<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        PropertyValue::References(
            ids.into_iter()
                .map(|id| PropertyValue::Reference(id.into()))
                .collect(),
        )
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&NodeId> {
        match self {
            PropertyValue::Reference(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    /// Every id referenced by this value, flattening nested arrays in order.
    pub fn referenced_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids(&self, out: &mut Vec<NodeId>) {
        match self {
            PropertyValue::Reference(id) => out.push(id.clone()),
            PropertyValue::References(values) => {
                for value in values {
                    value.collect_ids(out);
                }
            }
            _ => {}
        }
    }

    /// Rewrite every referenced id through `f`, keeping nesting.
    pub fn map_ids(&self, f: &mut impl FnMut(&NodeId) -> NodeId) -> PropertyValue {
        match self {
            PropertyValue::Reference(id) => PropertyValue::Reference(f(id)),
            PropertyValue::References(values) => {
                PropertyValue::References(values.iter().map(|v| v.map_ids(f)).collect())
            }
            other => other.clone(),
        }
    }

    /// Drop every occurrence of `id`. Returns whether anything was removed.
    pub fn remove_id(&mut self, id: &str) -> bool {
        match self {
            PropertyValue::References(values) => {
                let before = values.len();
                values.retain(|v| v.as_reference().is_none_or(|r| r != id));
                let mut removed = values.len() != before;
                for value in values.iter_mut() {
                    removed |= value.remove_id(id);
                }
                removed
            }
            _ => false,
        }
    }
}

/// A node record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: SmolStr,
    #[serde(default)]
    pub properties: BTreeMap<SmolStr, PropertyValue>,
    /// Present on annotations, inline nodes and markers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<TextRange>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, node_type: impl Into<SmolStr>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            properties: BTreeMap::new(),
            range: None,
        }
    }

    /// Annotation, inline node or marker over `path[start..end]`.
    pub fn ranged(
        id: impl Into<NodeId>,
        node_type: impl Into<SmolStr>,
        path: PropertyPath,
        start: usize,
        end: usize,
    ) -> Self {
        let mut node = Self::new(id, node_type);
        node.range = Some(TextRange::new(path, start, end));
        node
    }

    /// Text node with a `content` property.
    pub fn text(id: impl Into<NodeId>, node_type: impl Into<SmolStr>, content: &str) -> Self {
        Self::new(id, node_type).with("content", PropertyValue::text(content))
    }

    pub fn with(mut self, name: &str, value: PropertyValue) -> Self {
        self.properties.insert(SmolStr::new(name), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn text_of(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(PropertyValue::as_text)
    }
}
