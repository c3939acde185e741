//! Document builders shared by the unit tests.

use smol_str::format_smolstr;

use crate::document::Document;
use crate::node::{Node, PropertyPath, PropertyValue};

/// Install a `RUST_LOG`-driven subscriber once per test binary.
pub(crate) fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Paragraphs shown in order in a container `body`.
pub(crate) fn body_doc(paragraphs: &[(&str, &str)]) -> Document {
    let mut doc = Document::default();
    for (id, text) in paragraphs {
        doc.create(Node::text(*id, "paragraph", text)).unwrap();
    }
    let ids: Vec<&str> = paragraphs.iter().map(|(id, _)| *id).collect();
    doc.create(Node::new("body", "container").with("nodes", PropertyValue::references(ids)))
        .unwrap();
    doc.take_operations();
    doc
}

pub(crate) fn doc_with_paragraph(id: &str, text: &str) -> Document {
    body_doc(&[(id, text)])
}

/// A list `l1` with items `li-1..` shown in `body`.
pub(crate) fn list_doc(items: &[&str]) -> Document {
    let mut doc = body_doc(&[]);
    let mut ids = Vec::new();
    for (i, text) in items.iter().enumerate() {
        let id = format_smolstr!("li-{}", i + 1);
        doc.create(Node::text(id.clone(), "list-item", text)).unwrap();
        ids.push(id);
    }
    doc.create(Node::new("l1", "list").with("items", PropertyValue::references(ids)))
        .unwrap();
    doc.container_mut("body").unwrap().show("l1", None).unwrap();
    doc.take_operations();
    doc
}

fn ranged(id: &str, node_type: &str, node: &str, start: usize, end: usize) -> Node {
    Node::ranged(id, node_type, PropertyPath::new(node, "content"), start, end)
}

pub(crate) fn bold(id: &str, node: &str, start: usize, end: usize) -> Node {
    ranged(id, "strong", node, start, end)
}

pub(crate) fn emphasis(id: &str, node: &str, start: usize, end: usize) -> Node {
    ranged(id, "emphasis", node, start, end)
}

pub(crate) fn link(id: &str, node: &str, start: usize, end: usize) -> Node {
    ranged(id, "link", node, start, end).with("url", PropertyValue::String("https://example.com".into()))
}

pub(crate) fn marker(id: &str, node: &str, start: usize, end: usize) -> Node {
    ranged(id, "comment", node, start, end)
}
