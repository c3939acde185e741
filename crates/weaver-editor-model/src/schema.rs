//! Node kinds and the static descriptor table consulted during editing and transfer.
//!
//! Every node type maps to a [`NodeDescriptor`]: its [`NodeKind`], the properties it
//! declares and a handful of capability flags. The transfer engine walks these
//! descriptors to find owned references and text properties instead of inspecting
//! nodes at runtime.

use std::collections::HashMap;

use smol_str::SmolStr;

/// Closed set of node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Block holding a single text property (paragraph, heading, table cell).
    Text,
    /// Ordered list owning its items.
    List,
    /// Text node living inside a list.
    ListItem,
    /// Ordered sequence of shown node ids.
    Container,
    /// Block without text (table of contents, rule).
    Block,
    /// Composite node with text properties whose annotations are addressed at the
    /// node level (figure, table).
    Isolated,
    /// Range over a text property kept in the annotation index.
    Annotation,
    /// Annotation materialized in the text stream.
    InlineNode,
    /// Annotation-like range kept out of the annotation index.
    Marker,
}

impl NodeKind {
    pub fn owns_text(self) -> bool {
        matches!(self, NodeKind::Text | NodeKind::ListItem)
    }

    pub fn is_container_like(self) -> bool {
        matches!(self, NodeKind::Container | NodeKind::List)
    }

    pub fn is_isolated(self) -> bool {
        self == NodeKind::Isolated
    }

    /// Nodes carrying a start/end range.
    pub fn is_ranged(self) -> bool {
        matches!(
            self,
            NodeKind::Annotation | NodeKind::InlineNode | NodeKind::Marker
        )
    }

    /// Ranged nodes that go into the annotation index.
    pub fn is_indexed_annotation(self) -> bool {
        matches!(self, NodeKind::Annotation | NodeKind::InlineNode)
    }

    /// Abstract base type names this kind is an instance of.
    fn base_types(self) -> &'static [&'static str] {
        match self {
            NodeKind::Text => &["text"],
            NodeKind::ListItem => &["text", "list-item"],
            NodeKind::List => &["list"],
            NodeKind::Container => &["container"],
            NodeKind::Block => &["block"],
            NodeKind::Isolated => &["isolated"],
            NodeKind::Annotation => &["annotation"],
            NodeKind::InlineNode => &["annotation", "inline-node"],
            NodeKind::Marker => &["annotation", "marker"],
        }
    }
}

/// How a property participates in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// Annotatable string.
    Text,
    /// Plain value, never followed.
    Scalar,
    /// Cross-reference to another node.
    Reference,
    /// Reference to a child whose lifetime is bound to this node.
    OwnedReference,
    /// Possibly nested array of cross-references.
    References,
    /// Possibly nested array of owned children.
    OwnedReferences,
}

impl PropertyKind {
    pub fn is_reference(self) -> bool {
        !matches!(self, PropertyKind::Text | PropertyKind::Scalar)
    }

    pub fn is_owned(self) -> bool {
        matches!(
            self,
            PropertyKind::OwnedReference | PropertyKind::OwnedReferences
        )
    }

    pub fn is_array(self) -> bool {
        matches!(
            self,
            PropertyKind::References | PropertyKind::OwnedReferences
        )
    }

    pub fn is_text(self) -> bool {
        self == PropertyKind::Text
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: SmolStr,
    pub kind: PropertyKind,
    pub optional: bool,
}

impl PropertyDescriptor {
    pub fn new(name: &str, kind: PropertyKind) -> Self {
        Self {
            name: SmolStr::new(name),
            kind,
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Static description of one node type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDescriptor {
    pub type_name: SmolStr,
    pub kind: NodeKind,
    pub properties: Vec<PropertyDescriptor>,
    /// An edit strictly inside the range splits it in two instead of truncating.
    pub can_split: bool,
    /// Inserting exactly at the range end grows the range.
    pub expands_right: bool,
    /// Copy/paste carries nodes of this type.
    pub copyable: bool,
}

impl NodeDescriptor {
    pub fn new(type_name: &str, kind: NodeKind) -> Self {
        let ranged = kind.is_ranged();
        Self {
            type_name: SmolStr::new(type_name),
            kind,
            properties: Vec::new(),
            can_split: ranged,
            expands_right: kind == NodeKind::Annotation,
            copyable: true,
        }
    }

    pub fn property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }

    pub fn can_split(mut self, can_split: bool) -> Self {
        self.can_split = can_split;
        self
    }

    pub fn expands_right(mut self, expands_right: bool) -> Self {
        self.expands_right = expands_right;
        self
    }

    pub fn copyable(mut self, copyable: bool) -> Self {
        self.copyable = copyable;
        self
    }

    pub fn get_property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// First text property, the one text-level operations address.
    pub fn text_property(&self) -> Option<&SmolStr> {
        self.properties
            .iter()
            .find(|p| p.kind.is_text())
            .map(|p| &p.name)
    }

    pub fn text_properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.iter().filter(|p| p.kind.is_text())
    }

    pub fn owned_references(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.iter().filter(|p| p.kind.is_owned())
    }

    pub fn unowned_references(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties
            .iter()
            .filter(|p| p.kind.is_reference() && !p.kind.is_owned())
    }
}

/// Registry of node descriptors, shared read-only by every document built on it.
#[derive(Debug, Clone)]
pub struct Schema {
    nodes: HashMap<SmolStr, NodeDescriptor>,
    default_text_type: SmolStr,
}

impl Schema {
    /// Empty schema. Register a text type before creating documents on it.
    pub fn empty(default_text_type: &str) -> Self {
        Self {
            nodes: HashMap::new(),
            default_text_type: SmolStr::new(default_text_type),
        }
    }

    pub fn register(&mut self, descriptor: NodeDescriptor) -> &mut Self {
        self.nodes.insert(descriptor.type_name.clone(), descriptor);
        self
    }

    pub fn descriptor(&self, type_name: &str) -> Option<&NodeDescriptor> {
        self.nodes.get(type_name)
    }

    pub fn kind_of(&self, type_name: &str) -> Option<NodeKind> {
        self.descriptor(type_name).map(|d| d.kind)
    }

    pub fn default_text_type(&self) -> &SmolStr {
        &self.default_text_type
    }

    /// Whether `type_name` is `base` or one of its abstract base types.
    pub fn is_instance_of(&self, type_name: &str, base: &str) -> bool {
        if type_name == base {
            return true;
        }
        self.kind_of(type_name)
            .is_some_and(|kind| kind.base_types().contains(&base))
    }
}

impl Default for Schema {
    fn default() -> Self {
        use PropertyKind::*;

        let mut schema = Schema::empty("paragraph");
        schema
            .register(
                NodeDescriptor::new("paragraph", NodeKind::Text)
                    .property(PropertyDescriptor::new("content", Text)),
            )
            .register(
                NodeDescriptor::new("heading", NodeKind::Text)
                    .property(PropertyDescriptor::new("content", Text))
                    .property(PropertyDescriptor::new("level", Scalar).optional()),
            )
            .register(
                NodeDescriptor::new("list", NodeKind::List)
                    .property(PropertyDescriptor::new("items", OwnedReferences))
                    .property(PropertyDescriptor::new("ordered", Scalar).optional()),
            )
            .register(
                NodeDescriptor::new("list-item", NodeKind::ListItem)
                    .property(PropertyDescriptor::new("content", Text))
                    .property(PropertyDescriptor::new("level", Scalar).optional()),
            )
            .register(
                NodeDescriptor::new("container", NodeKind::Container)
                    .property(PropertyDescriptor::new("nodes", References)),
            )
            .register(NodeDescriptor::new("strong", NodeKind::Annotation))
            .register(NodeDescriptor::new("emphasis", NodeKind::Annotation))
            .register(NodeDescriptor::new("code", NodeKind::Annotation))
            .register(
                NodeDescriptor::new("link", NodeKind::Annotation)
                    .property(PropertyDescriptor::new("url", Scalar).optional())
                    .can_split(false)
                    .expands_right(false),
            )
            .register(
                NodeDescriptor::new("mention", NodeKind::InlineNode)
                    .property(PropertyDescriptor::new("target", Reference).optional())
                    .can_split(false),
            )
            .register(NodeDescriptor::new("comment", NodeKind::Marker))
            .register(NodeDescriptor::new("spelling-error", NodeKind::Marker).can_split(false))
            .register(
                NodeDescriptor::new("figure", NodeKind::Isolated)
                    .property(PropertyDescriptor::new("title", Text))
                    .property(PropertyDescriptor::new("src", Scalar).optional())
                    .property(PropertyDescriptor::new("caption", OwnedReference)),
            )
            .register(
                NodeDescriptor::new("table", NodeKind::Isolated)
                    .property(PropertyDescriptor::new("cells", OwnedReferences)),
            )
            .register(
                NodeDescriptor::new("table-cell", NodeKind::Text)
                    .property(PropertyDescriptor::new("content", Text)),
            )
            .register(NodeDescriptor::new("toc", NodeKind::Block).copyable(false));
        schema
    }
}
