//! Extract a selection into a standalone snippet document.
//!
//! A snippet holds one container, [`SNIPPET_ID`], listing the copied top-level
//! nodes. Node ids are kept where possible; the paste side disambiguates them
//! against its target.

use std::collections::HashSet;

use crate::document::{Document, SNIPPET_ID, TEXT_SNIPPET_ID};
use crate::error::Result;
use crate::helpers::{copy_node, delete_list_range, delete_text_range};
use crate::ids::IdGenerator;
use crate::node::{Node, NodeId, PropertyPath, PropertyValue, TextRange};
use crate::schema::NodeKind;
use crate::selection::{ContainerSelection, NodeSelection, PropertySelection, Selection};
use crate::text::char_slice;

/// Copy the selected content into a new snippet.
///
/// Returns `None` for null and collapsed selections.
pub fn copy_selection(
    doc: &Document,
    selection: &Selection,
    ids: &mut dyn IdGenerator,
) -> Result<Option<Document>> {
    if selection.is_collapsed() {
        return Ok(None);
    }
    let snippet = match selection {
        Selection::Property(sel) => copy_property_selection(doc, sel, ids)?,
        Selection::Container(sel) => copy_container_selection(doc, sel, ids)?,
        Selection::Node(sel) => copy_node_selection(doc, sel)?,
        Selection::Null => return Ok(None),
    };
    Ok(Some(snippet))
}

fn copy_property_selection(
    doc: &Document,
    sel: &PropertySelection,
    ids: &mut dyn IdGenerator,
) -> Result<Document> {
    let path = &sel.path;
    let (start, end) = (sel.start, sel.end);
    let text = doc.text(path)?;
    let len = text.chars().count();
    let copied = char_slice(text, start, end);
    let copied_len = copied.chars().count();

    let mut snippet = doc.new_snippet();
    let node = doc.get_strict(&path.node_id)?;
    let root_id = doc.root(&path.node_id);
    let whole_item = doc.is_kind(&node.id, NodeKind::ListItem)
        && doc.is_kind(&root_id, NodeKind::List)
        && start == 0
        && end == len;

    let target_path = if whole_item {
        let root = doc.get_strict(&root_id)?;
        let item_id = ids.fresh(&snippet, &node.node_type);
        let mut item = Node::text(item_id.clone(), node.node_type.clone(), copied);
        if let Some(level) = node.get("level") {
            item = item.with("level", level.clone());
        }
        snippet.create(item)?;

        let mut list = Node::new(TEXT_SNIPPET_ID, root.node_type.clone())
            .with("items", PropertyValue::references([item_id.clone()]));
        if let Some(ordered) = root.get("ordered") {
            list = list.with("ordered", ordered.clone());
        }
        snippet.create(list)?;
        PropertyPath::new(item_id, "content")
    } else {
        let node_type = if doc.is_kind(&node.id, NodeKind::Text) {
            node.node_type.clone()
        } else {
            doc.schema().default_text_type().clone()
        };
        let target = Node::new(TEXT_SNIPPET_ID, node_type);
        let property = snippet
            .schema()
            .descriptor(&target.node_type)
            .and_then(|d| d.text_property().cloned())
            .unwrap_or_else(|| "content".into());
        snippet.create(target.with(&property, PropertyValue::text(copied)))?;
        PropertyPath::new(TEXT_SNIPPET_ID, property)
    };
    snippet
        .container_mut(SNIPPET_ID)?
        .show(TEXT_SNIPPET_ID, None)?;

    for anno in doc.annotations(path, Some(start), Some(end)) {
        let Some(range) = &anno.range else { continue };
        let anno_start = (range.start.offset.max(start) - start).min(copied_len);
        let anno_end = (range.end.offset.min(end).saturating_sub(start)).min(copied_len);
        if anno_start >= anno_end {
            tracing::trace!(id = %anno.id, "dropping annotation outside the copied text");
            continue;
        }
        let mut copy = anno.clone();
        if snippet.contains(&copy.id) {
            copy.id = ids.fresh(&snippet, &copy.node_type);
        }
        copy.range = Some(TextRange::new(target_path.clone(), anno_start, anno_end));
        drop_dangling_references(&snippet, &mut copy);
        snippet.create(copy)?;
    }
    Ok(snippet)
}

fn copy_container_selection(
    doc: &Document,
    sel: &ContainerSelection,
    ids: &mut dyn IdGenerator,
) -> Result<Document> {
    let mut snippet = doc.new_snippet();
    let node_ids = sel.node_ids(doc)?;
    let Some(last_index) = node_ids.len().checked_sub(1) else {
        return Ok(snippet);
    };
    let (start, end) = (&sel.start, &sel.end);

    let mut skipped_first = false;
    let mut skipped_last = false;
    let mut created: HashSet<_> = HashSet::new();
    let mut originals = Vec::new();

    for (i, id) in node_ids.iter().enumerate() {
        // nothing of the node is actually selected
        if i == 0 && doc.is_last(start)? {
            skipped_first = true;
            continue;
        }
        if i == last_index && doc.is_first(end)? {
            skipped_last = true;
            continue;
        }
        if created.contains(id) {
            continue;
        }
        for mut record in copy_node(doc, id)? {
            if created.contains(&record.id) {
                continue;
            }
            originals.push(record.clone());
            drop_dangling_references(&snippet, &mut record);
            created.insert(record.id.clone());
            snippet.create(record)?;
        }
        snippet.container_mut(SNIPPET_ID)?.show(id, None)?;
    }
    restore_references(&mut snippet, &originals)?;

    // Trim the end first so the start offsets stay valid when both ends share a node.
    if !skipped_last {
        let end_root = snippet.root(end.node_id());
        match snippet.kind(&end_root) {
            Some(NodeKind::Text) => delete_text_range(&mut snippet, Some(end), None)?,
            Some(NodeKind::List) => delete_list_range(&mut snippet, &end_root, Some(end), None, ids)?,
            _ => {}
        }
    }
    if !skipped_first {
        let start_root = snippet.root(start.node_id());
        match snippet.kind(&start_root) {
            Some(NodeKind::Text) => delete_text_range(&mut snippet, None, Some(start))?,
            Some(NodeKind::List) => {
                delete_list_range(&mut snippet, &start_root, None, Some(start), ids)?;
                drop_emptied_item(&mut snippet, &start_root, start.node_id())?;
            }
            _ => {}
        }
    }
    tracing::debug!(
        nodes = node_ids.len(),
        skipped_first,
        skipped_last,
        "copied container selection"
    );
    Ok(snippet)
}

/// Remove a list item the start trim left without text, and the list if it empties.
fn drop_emptied_item(snippet: &mut Document, list_id: &str, item_id: &str) -> Result<()> {
    if !snippet.contains(item_id) || snippet.text_len(&snippet.text_path(item_id)?)? > 0 {
        return Ok(());
    }
    snippet.remove_list_item(list_id, item_id)?;
    if snippet.list_items(list_id)?.is_empty() {
        snippet.delete(list_id)?;
    }
    Ok(())
}

fn copy_node_selection(doc: &Document, sel: &NodeSelection) -> Result<Document> {
    let mut snippet = doc.new_snippet();
    let originals = copy_node(doc, &sel.node_id)?;
    for record in &originals {
        let mut record = record.clone();
        drop_dangling_references(&snippet, &mut record);
        snippet.create(record)?;
    }
    restore_references(&mut snippet, &originals)?;
    snippet
        .container_mut(SNIPPET_ID)?
        .show(&sel.node_id, None)?;
    Ok(snippet)
}

/// Clear unowned references to nodes that did not come along.
pub(crate) fn drop_dangling_references(doc: &Document, node: &mut Node) {
    let Some(descriptor) = doc.schema().descriptor(&node.node_type) else {
        return;
    };
    for prop in descriptor.unowned_references() {
        let Some(value) = node.properties.get_mut(&prop.name) else {
            continue;
        };
        *value = retain_references(value, |id| {
            let keep = doc.contains(id);
            if !keep {
                tracing::debug!(node = %node.id, target = %id, "dropping reference to a node left behind");
            }
            keep
        });
    }
}

/// `value` without the ids rejected by `keep`. A single rejected reference becomes null.
pub(crate) fn retain_references(
    value: &PropertyValue,
    mut keep: impl FnMut(&NodeId) -> bool,
) -> PropertyValue {
    let mut value = value.clone();
    for id in value.referenced_ids() {
        if !keep(&id) && !value.remove_id(&id) {
            value = PropertyValue::Null;
        }
    }
    value
}

/// Put back unowned references to nodes copied after the node holding them.
fn restore_references(snippet: &mut Document, originals: &[Node]) -> Result<()> {
    let schema = snippet.schema().clone();
    for original in originals {
        let Some(descriptor) = schema.descriptor(&original.node_type) else {
            continue;
        };
        for prop in descriptor.unowned_references() {
            let Some(value) = original.get(&prop.name) else {
                continue;
            };
            let value = retain_references(value, |id| snippet.contains(id));
            let current = snippet.get(&original.id).and_then(|n| n.get(&prop.name));
            if current != Some(&value) {
                snippet.set_property(&original.id, &prop.name, value)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{body_doc, bold, emphasis, list_doc};
    use crate::ids::SequentialIds;
    use crate::node::Coordinate;
    use crate::selection::{NodeSelectionMode, PropertySelection};

    fn content(id: &str) -> PropertyPath {
        PropertyPath::new(id, "content")
    }

    fn coord(id: &str, offset: usize) -> Coordinate {
        Coordinate::new(content(id), offset)
    }

    fn snippet_ids(snippet: &Document) -> Vec<String> {
        snippet
            .container(SNIPPET_ID)
            .unwrap()
            .node_ids()
            .iter()
            .map(|id| id.to_string())
            .collect()
    }

    #[test]
    fn test_collapsed_and_null_copy_nothing() {
        let doc = body_doc(&[("p1", "Hello")]);
        let mut ids = SequentialIds::new();
        let collapsed = Selection::Property(PropertySelection::collapsed(content("p1"), 2));
        assert!(copy_selection(&doc, &collapsed, &mut ids).unwrap().is_none());
        assert!(copy_selection(&doc, &Selection::Null, &mut ids).unwrap().is_none());
    }

    #[test]
    fn test_copy_property_selection_rebases_annotations() {
        let mut doc = body_doc(&[("p1", "Hello world")]);
        doc.create(bold("b1", "p1", 0, 5)).unwrap();
        doc.create(emphasis("e1", "p1", 4, 8)).unwrap();
        let mut ids = SequentialIds::new();
        let sel = Selection::Property(PropertySelection::new(content("p1"), 2, 7));

        let snippet = copy_selection(&doc, &sel, &mut ids).unwrap().unwrap();
        assert_eq!(snippet_ids(&snippet), vec![TEXT_SNIPPET_ID]);
        assert_eq!(snippet.text(&content(TEXT_SNIPPET_ID)).unwrap(), "llo w");
        assert_eq!(snippet.get(TEXT_SNIPPET_ID).unwrap().node_type, "paragraph");

        let annos = snippet.annotations(&content(TEXT_SNIPPET_ID), None, None);
        assert_eq!(annos.len(), 2);
        assert_eq!(annos[0].id, "b1");
        assert_eq!(annos[0].range.as_ref().unwrap().offsets(), 0..3);
        assert_eq!(annos[1].id, "e1");
        assert_eq!(annos[1].range.as_ref().unwrap().offsets(), 2..5);
    }

    #[test]
    fn test_copy_drops_touching_annotations() {
        let mut doc = body_doc(&[("p1", "Hello world")]);
        doc.create(bold("b1", "p1", 0, 6)).unwrap();
        let mut ids = SequentialIds::new();
        let sel = Selection::Property(PropertySelection::new(content("p1"), 6, 11));

        let snippet = copy_selection(&doc, &sel, &mut ids).unwrap().unwrap();
        assert_eq!(snippet.text(&content(TEXT_SNIPPET_ID)).unwrap(), "world");
        assert!(snippet.annotations(&content(TEXT_SNIPPET_ID), None, None).is_empty());
    }

    #[test]
    fn test_copy_whole_list_item_keeps_list() {
        let mut doc = list_doc(&["one", "two"]);
        doc.create(bold("b1", "li-2", 0, 2)).unwrap();
        let mut ids = SequentialIds::new();
        let sel = Selection::Property(PropertySelection::new(content("li-2"), 0, 3));

        let snippet = copy_selection(&doc, &sel, &mut ids).unwrap().unwrap();
        assert_eq!(snippet_ids(&snippet), vec![TEXT_SNIPPET_ID]);
        assert!(snippet.is_kind(TEXT_SNIPPET_ID, NodeKind::List));
        let items = snippet.list_items(TEXT_SNIPPET_ID).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(snippet.text(&content(&items[0])).unwrap(), "two");
        assert_eq!(snippet.annotations(&content(&items[0]), None, None).len(), 1);
    }

    #[test]
    fn test_copy_partial_list_item_flattens() {
        let doc = list_doc(&["one", "two"]);
        let mut ids = SequentialIds::new();
        let sel = Selection::Property(PropertySelection::new(content("li-2"), 1, 3));

        let snippet = copy_selection(&doc, &sel, &mut ids).unwrap().unwrap();
        assert_eq!(snippet.get(TEXT_SNIPPET_ID).unwrap().node_type, "paragraph");
        assert_eq!(snippet.text(&content(TEXT_SNIPPET_ID)).unwrap(), "wo");
    }

    #[test]
    fn test_copy_container_selection_trims_boundaries() {
        let mut doc = body_doc(&[("a", "alpha"), ("b", "beta"), ("c", "gamma")]);
        doc.create(bold("b1", "a", 0, 5)).unwrap();
        let mut ids = SequentialIds::new();
        let sel = ContainerSelection::new(&doc, "body", coord("a", 2), coord("c", 3)).unwrap();

        let snippet = copy_selection(&doc, &Selection::Container(sel), &mut ids)
            .unwrap()
            .unwrap();
        assert_eq!(snippet_ids(&snippet), vec!["a", "b", "c"]);
        assert_eq!(snippet.text(&content("a")).unwrap(), "pha");
        assert_eq!(snippet.text(&content("b")).unwrap(), "beta");
        assert_eq!(snippet.text(&content("c")).unwrap(), "gam");
        assert_eq!(snippet.get("b1").unwrap().range.as_ref().unwrap().offsets(), 0..3);
        // source untouched
        assert_eq!(doc.text(&content("a")).unwrap(), "alpha");
    }

    #[test]
    fn test_copy_container_selection_within_one_list() {
        let doc = list_doc(&["alpha", "beta", "gamma"]);
        let mut ids = SequentialIds::new();
        let sel = ContainerSelection::new(&doc, "body", coord("li-1", 3), coord("li-3", 2)).unwrap();

        let snippet = copy_selection(&doc, &Selection::Container(sel), &mut ids)
            .unwrap()
            .unwrap();
        assert_eq!(snippet_ids(&snippet), vec!["l1"]);
        assert_eq!(snippet.list_items("l1").unwrap(), vec!["li-1", "li-2", "li-3"]);
        assert_eq!(snippet.text(&content("li-1")).unwrap(), "ha");
        assert_eq!(snippet.text(&content("li-3")).unwrap(), "ga");
    }

    #[test]
    fn test_copy_node_selection() {
        let mut doc = list_doc(&["one"]);
        doc.create(bold("b1", "li-1", 0, 1)).unwrap();
        let mut ids = SequentialIds::new();
        let sel = Selection::Node(NodeSelection::new("body", "l1", NodeSelectionMode::Full));

        let snippet = copy_selection(&doc, &sel, &mut ids).unwrap().unwrap();
        assert_eq!(snippet_ids(&snippet), vec!["l1"]);
        assert!(snippet.contains("li-1"));
        assert!(snippet.contains("b1"));
        assert_eq!(snippet.root("li-1"), "l1");
    }

    #[test]
    fn test_drop_dangling_references() {
        let doc = body_doc(&[("p1", "abc")]);
        let mut mention = Node::ranged("m", "mention", content("p1"), 0, 1)
            .with("target", PropertyValue::reference("elsewhere"));
        drop_dangling_references(&doc, &mut mention);
        assert!(mention.get("target").unwrap().is_null());
    }

    #[test]
    fn test_copy_from_end_of_list_item_drops_it() {
        let mut doc = list_doc(&["one", "two", "three"]);
        doc.create(Node::text("p1", "paragraph", "after")).unwrap();
        doc.container_mut("body").unwrap().show("p1", None).unwrap();
        let mut ids = SequentialIds::new();
        let sel = ContainerSelection::new(&doc, "body", coord("li-1", 3), coord("p1", 2)).unwrap();

        let snippet = copy_selection(&doc, &Selection::Container(sel), &mut ids)
            .unwrap()
            .unwrap();
        assert_eq!(snippet_ids(&snippet), vec!["l1", "p1"]);
        assert_eq!(snippet.list_items("l1").unwrap(), vec!["li-2", "li-3"]);
        assert!(!snippet.contains("li-1"));
        assert_eq!(snippet.text(&content("p1")).unwrap(), "af");
    }

    #[test]
    fn test_copy_keeps_references_to_later_nodes() {
        let mut doc = body_doc(&[("a", "alpha"), ("b", "beta")]);
        doc.create(
            Node::ranged("m", "mention", content("a"), 0, 2)
                .with("target", PropertyValue::reference("b")),
        )
        .unwrap();
        let mut ids = SequentialIds::new();
        let sel = ContainerSelection::new(&doc, "body", coord("a", 1), coord("b", 4)).unwrap();

        let snippet = copy_selection(&doc, &Selection::Container(sel), &mut ids)
            .unwrap()
            .unwrap();
        let mention = snippet.get("m").unwrap();
        assert_eq!(mention.get("target"), Some(&PropertyValue::reference("b")));
        assert_eq!(mention.range.as_ref().unwrap().offsets(), 0..1);
    }
}
