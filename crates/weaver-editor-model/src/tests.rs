//! Copy, paste and undo working together on whole documents.

use std::collections::HashSet;

use crate::fixtures::{body_doc, bold, emphasis, init_tracing};
use crate::*;

fn content(id: &str) -> PropertyPath {
    PropertyPath::new(id, "content")
}

fn coord(id: &str, offset: usize) -> Coordinate {
    Coordinate::new(content(id), offset)
}

fn body(doc: &Document) -> Vec<NodeId> {
    doc.container("body").unwrap().node_ids()
}

fn container_copy(doc: &Document, start: Coordinate, end: Coordinate) -> Document {
    let sel = ContainerSelection::new(doc, "body", start, end).unwrap();
    let mut ids = SequentialIds::new();
    copy_selection(doc, &Selection::Container(sel), &mut ids)
        .unwrap()
        .unwrap()
}

fn paste_into(doc: &mut Document, sel: Selection, snippet: Document, ids: &mut SequentialIds) -> Selection {
    let config = ModelConfig::default();
    let mut tx = Transaction::new(doc, sel, ids, &config);
    paste(&mut tx, PasteContent::Snippet(snippet)).unwrap();
    tx.into_selection()
}

#[test]
fn test_copy_tail_of_paragraph() {
    let mut doc = body_doc(&[("p1", "Hello world")]);
    doc.create(bold("b1", "p1", 0, 5)).unwrap();

    let sel = Selection::Property(PropertySelection::new(content("p1"), 6, 11));
    let mut ids = SequentialIds::new();
    let snippet = copy_selection(&doc, &sel, &mut ids).unwrap().unwrap();

    assert_eq!(snippet.text(&content(TEXT_SNIPPET_ID)).unwrap(), "world");
    assert!(snippet.annotations_on_node(TEXT_SNIPPET_ID).is_empty());
}

#[test]
fn test_copy_skips_untouched_boundary_nodes() {
    let doc = body_doc(&[("a", "alpha"), ("b", "beta"), ("c", "gamma")]);

    let snippet = container_copy(&doc, coord("a", 5), coord("c", 0));
    assert_eq!(snippet.container(SNIPPET_ID).unwrap().node_ids(), vec!["b"]);
    assert_eq!(snippet.text(&content("b")).unwrap(), "beta");

    let snippet = container_copy(&doc, coord("a", 0), coord("c", 5));
    assert_eq!(
        snippet.container(SNIPPET_ID).unwrap().node_ids(),
        vec!["a", "b", "c"]
    );
    assert_eq!(snippet.text(&content("a")).unwrap(), "alpha");
    assert_eq!(snippet.text(&content("c")).unwrap(), "gamma");
}

#[test]
fn test_copy_then_paste_into_empty_document() {
    init_tracing();
    let mut source = body_doc(&[("a", "alpha"), ("b", "beta"), ("c", "gamma")]);
    source.create(emphasis("e1", "b", 1, 3)).unwrap();
    let snippet = container_copy(&source, coord("a", 0), coord("c", 5));

    let mut doc = body_doc(&[("x", "")]);
    let mut ids = SequentialIds::new();
    let sel = paste_into(
        &mut doc,
        Selection::cursor(content("x"), 0, Some("body".into())),
        snippet,
        &mut ids,
    );

    assert_eq!(body(&doc), vec!["a", "b", "c"]);
    for id in ["a", "b", "c"] {
        assert_eq!(
            doc.text(&content(id)).unwrap(),
            source.text(&content(id)).unwrap()
        );
    }
    let annos = doc.annotations(&content("b"), None, None);
    assert_eq!(annos.len(), 1);
    assert_eq!(annos[0].range.as_ref().unwrap().offsets(), 1..3);
    assert_eq!(sel.start().unwrap(), coord("c", 5));
}

#[test]
fn test_repeated_paste_keeps_ids_unique() {
    let mut source = body_doc(&[("a", "one"), ("b", "two")]);
    source.create(bold("s1", "a", 0, 3)).unwrap();
    let snippet = container_copy(&source, coord("a", 0), coord("b", 3));

    let mut doc = source.clone();
    let mut ids = SequentialIds::new();
    let after_b = Selection::Node(NodeSelection::new("body", "b", NodeSelectionMode::After));
    paste_into(&mut doc, after_b.clone(), snippet.clone(), &mut ids);
    paste_into(&mut doc, after_b, snippet, &mut ids);

    let shown = body(&doc);
    assert_eq!(shown.len(), 6);
    let unique: HashSet<_> = shown.iter().collect();
    assert_eq!(unique.len(), 6);
    assert_eq!(doc.len(), source.len() + 6);

    let texts: Vec<_> = shown
        .iter()
        .map(|id| doc.text(&content(id)).unwrap().to_string())
        .collect();
    assert_eq!(texts, vec!["one", "two", "one", "two", "one", "two"]);
    for id in &shown {
        if doc.text(&content(id)).unwrap() == "one" {
            assert_eq!(doc.annotations_on_node(id).len(), 1);
        }
    }
    insta::assert_yaml_snapshot!("repeated_paste_body", shown);
    insta::assert_snapshot!("repeated_paste_document", doc.to_json().unwrap());
}

#[test]
fn test_undo_paste_restores_document() {
    let source = body_doc(&[("a", "alpha"), ("b", "beta")]);
    let snippet = container_copy(&source, coord("a", 2), coord("b", 2));

    let mut doc = body_doc(&[("p1", "Hello world"), ("p2", "end")]);
    doc.create(bold("b1", "p1", 0, 11)).unwrap();
    doc.take_operations();
    let before = doc.to_records();

    let mut ids = SequentialIds::new();
    let sel = Selection::Property(PropertySelection::new(content("p1"), 3, 8).in_container("body"));
    paste_into(&mut doc, sel, snippet, &mut ids);
    assert_ne!(doc.to_records(), before);
    insta::assert_snapshot!("pasted_document", doc.to_json().unwrap());

    let ops = doc.take_operations();
    assert!(!ops.is_empty());
    for op in invert_all(&ops) {
        doc.apply(&op).unwrap();
    }
    assert_eq!(doc.to_records(), before);
}

#[test]
fn test_operations_replay_from_json() {
    let mut doc = body_doc(&[("p1", "Hello")]);
    let start = doc.clone();
    let mut ids = SequentialIds::new();
    let config = ModelConfig::default();
    let mut tx = Transaction::new(
        &mut doc,
        Selection::cursor(content("p1"), 5, Some("body".into())),
        &mut ids,
        &config,
    );
    tx.insert_text(" world").unwrap();
    tx.break_node().unwrap();
    tx.insert_text("next").unwrap();

    let json = serde_json::to_string(&doc.take_operations()).unwrap();
    let ops: Vec<Operation> = serde_json::from_str(&json).unwrap();

    let mut replica = start;
    for op in &ops {
        replica.apply(op).unwrap();
    }
    assert_eq!(replica.to_records(), doc.to_records());
    assert_eq!(body(&replica).len(), 2);
}

#[test]
fn test_plain_paste_respects_configured_types() {
    let mut source = body_doc(&[("p1", "styled")]);
    source.create(bold("s1", "p1", 0, 3)).unwrap();
    source.create(emphasis("e1", "p1", 3, 6)).unwrap();
    let sel = Selection::Property(PropertySelection::new(content("p1"), 0, 6));
    let mut ids = SequentialIds::new();
    let snippet = copy_selection(&source, &sel, &mut ids).unwrap().unwrap();

    let config = ModelConfig::from_json_str(r#"{ "paste": { "plain_annotation_types": ["emphasis"] } }"#)
        .unwrap();
    let mut doc = body_doc(&[("t", "")]);
    let mut tx = Transaction::new(
        &mut doc,
        Selection::cursor(content("t"), 0, None),
        &mut ids,
        &config,
    );
    paste(&mut tx, PasteContent::Snippet(snippet)).unwrap();

    assert_eq!(doc.text(&content("t")).unwrap(), "styled");
    let kept: Vec<_> = doc
        .annotations(&content("t"), None, None)
        .iter()
        .map(|a| a.node_type.clone())
        .collect();
    assert_eq!(kept, vec!["emphasis"]);
}
