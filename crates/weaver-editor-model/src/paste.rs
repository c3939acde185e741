//! Insert snippets and plain text at the current selection.
//!
//! The first node of the source decides how it merges into the insertion point:
//! text joins the surrounding text, lists join a surrounding list. Whatever is
//! left is transferred as whole nodes into the container, with ids disambiguated
//! against the target.

use std::collections::{HashMap, VecDeque};

use crate::copy::{drop_dangling_references, retain_references};
use crate::document::{Document, SNIPPET_ID, TEXT_SNIPPET_ID};
use crate::error::{ModelError, Result};
use crate::ids::IdGenerator;
use crate::node::{Coordinate, Node, NodeId, PropertyValue, TextRange};
use crate::schema::NodeKind;
use crate::selection::Selection;
use crate::transaction::Transaction;

/// Content handed to [`paste`].
#[derive(Debug, Clone)]
pub enum PasteContent {
    /// A snippet produced by [`copy_selection`](crate::copy_selection).
    Snippet(Document),
    /// External plain text.
    Text(String),
}

/// Paste `content` at the transaction's selection.
pub fn paste(tx: &mut Transaction<'_>, content: PasteContent) -> Result<()> {
    if tx.selection().is_null() {
        return Err(ModelError::NoSelection);
    }
    let in_container = tx.selection().container_id().is_some();

    let source = match content {
        PasteContent::Text(text) if !in_container => {
            return tx.insert_text(&text);
        }
        PasteContent::Text(text) => plain_text_to_document(&*tx.doc, &text, &mut *tx.ids)?,
        PasteContent::Snippet(doc) => doc,
    };

    if !tx.selection().is_collapsed() {
        tx.delete_selection()?;
    }

    let mut remaining: VecDeque<NodeId> = source.container(SNIPPET_ID)?.node_ids().into();
    if remaining.front().is_some_and(|id| !is_copyable(&source, id)) {
        tracing::debug!(node = ?remaining.front(), "dropping non-copyable first node");
        remaining.pop_front();
    }
    let Some(first) = remaining.front().cloned() else {
        return Ok(());
    };

    let first_node = source.get_strict(&first)?;
    let first_is_text = source.schema().is_instance_of(&first_node.node_type, "text");
    let first_is_list = source.is_kind(&first, NodeKind::List);

    let target = tx
        .selection()
        .start()
        .ok_or(ModelError::NoSelection)?;
    let target_len = tx.document().text_len(&target.path).ok();
    let in_list = tx.document().is_kind(target.node_id(), NodeKind::ListItem);
    let joins_text = match target_len {
        Some(len) => len > 0 || in_list || source.contains(TEXT_SNIPPET_ID),
        None => false,
    };

    if first_is_text && joins_text {
        tracing::debug!(node = %first, in_list, "pasting text into text");
        paste_annotated_text(tx, &source, &first)?;
        remaining.pop_front();
    } else if first_is_list && target_len == Some(0) && in_list {
        let list = tx.document().root(target.node_id());
        let pos = tx.document().list_item_position(&list, target.node_id())?;
        tracing::debug!(%list, pos, "pasting list into list");
        paste_into_list(tx, &source, &list, pos, remaining.drain(..))?;
    }

    if remaining.is_empty() {
        return Ok(());
    }
    if in_container {
        paste_document(tx, &source, remaining.into())
    } else {
        for id in remaining {
            if !is_copyable(&source, &id) {
                continue;
            }
            if source.is_kind(&id, NodeKind::List) {
                paste_list_item_text(tx, &source, &id)?;
            } else if source.text_path(&id).is_ok() {
                paste_annotated_text(tx, &source, &id)?;
            } else {
                tracing::warn!(node = %id, "cannot paste node outside a container, dropped");
            }
        }
        Ok(())
    }
}

/// One default-text node per line inside a snippet container.
///
/// Lines split on CR/LF runs together with the whitespace around them. A single
/// line becomes [`TEXT_SNIPPET_ID`]; several lines get fresh ids.
pub fn plain_text_to_document(
    doc: &Document,
    text: &str,
    ids: &mut dyn IdGenerator,
) -> Result<Document> {
    let lines = split_lines(text);
    let mut snippet = doc.new_snippet();
    let text_type = snippet.schema().default_text_type().clone();

    for line in &lines {
        let id = if lines.len() == 1 {
            NodeId::new_static(TEXT_SNIPPET_ID)
        } else {
            ids.fresh(&snippet, &text_type)
        };
        snippet.create(Node::new(id.clone(), text_type.clone()))?;
        let path = snippet.text_path(&id)?;
        snippet.set_property(&id, &path.property, PropertyValue::text(*line))?;
        snippet.container_mut(SNIPPET_ID)?.show(&id, None)?;
    }
    snippet.take_operations();
    Ok(snippet)
}

fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = text;
    while let Some(i) = rest.find(['\r', '\n']) {
        lines.push(rest[..i].trim_end());
        rest = rest[i..].trim_start();
    }
    lines.push(rest);
    lines
}

fn is_copyable(doc: &Document, id: &str) -> bool {
    doc.descriptor(id).is_ok_and(|d| d.copyable)
}

/// Length of the text at `coord`, or 0 when it does not address text.
fn target_text_len(doc: &Document, coord: &Coordinate) -> usize {
    doc.text_len(&coord.path).unwrap_or(0)
}

/// Insert the text of `node_id` at the cursor and recreate its annotations there.
///
/// Outside a container only the configured plain annotation types survive.
fn paste_annotated_text(tx: &mut Transaction<'_>, source: &Document, node_id: &str) -> Result<()> {
    let source_path = source.text_path(node_id)?;
    let text = source.text(&source_path)?;
    let Some(start) = tx.selection().start() else {
        return Err(ModelError::NoSelection);
    };
    let in_container = tx.selection().container_id().is_some();

    tx.insert_text(text)?;

    for anno in source.annotations(&source_path, None, None) {
        if !in_container && !tx.config().keeps_plain_annotation(&anno.node_type) {
            tracing::debug!(id = %anno.id, kind = %anno.node_type, "annotation dropped outside container");
            continue;
        }
        let Some(range) = &anno.range else { continue };
        let mut copy = anno.clone();
        if tx.document().contains(&copy.id) {
            copy.id = tx.fresh_id(&copy.node_type);
        }
        copy.range = Some(TextRange::new(
            start.path.clone(),
            range.start.offset + start.offset,
            range.end.offset + start.offset,
        ));
        drop_dangling_references(tx.document(), &mut copy);
        tx.document_mut().create(copy)?;
    }
    Ok(())
}

/// Recreate text and list items of the source as items of `list`, starting at
/// `pos`. Other nodes are skipped.
fn paste_into_list(
    tx: &mut Transaction<'_>,
    source: &Document,
    list: &str,
    mut pos: usize,
    nodes: impl IntoIterator<Item = NodeId>,
) -> Result<()> {
    let mut last_item = None;
    for id in nodes {
        if !is_copyable(source, &id) {
            continue;
        }
        let texts: Vec<NodeId> = match source.kind(&id) {
            Some(NodeKind::List) => source.list_items(&id)?,
            Some(kind) if kind.owns_text() => vec![id.clone()],
            _ => {
                tracing::warn!(node = %id, "only text and lists can be pasted into a list, dropped");
                continue;
            }
        };
        for text_id in texts {
            let item = list_item_from(tx, source, &text_id)?;
            let item_id = item.id.clone();
            tx.document_mut().insert_list_item(list, pos, item)?;
            copy_annotations(tx, source, &text_id, &item_id)?;
            pos += 1;
            last_item = Some(item_id);
        }
    }

    if let Some(item) = last_item {
        let path = tx.document().text_path(&item)?;
        let len = tx.document().text_len(&path)?;
        let container = tx.selection().container_id().cloned();
        tx.set_selection(Selection::cursor(path, len, container));
    }
    Ok(())
}

/// New list item carrying the text of `text_id`, with a fresh id.
fn list_item_from(tx: &mut Transaction<'_>, source: &Document, text_id: &str) -> Result<Node> {
    let path = source.text_path(text_id)?;
    let text = source.text(&path)?;
    let item_type = if source.is_kind(text_id, NodeKind::ListItem) {
        source.get_strict(text_id)?.node_type.clone()
    } else {
        "list-item".into()
    };
    let id = tx.fresh_id(&item_type);
    let mut item = Node::text(id, item_type, text);
    if let Some(level) = source.get_strict(text_id)?.get("level") {
        item = item.with("level", level.clone());
    }
    Ok(item)
}

/// Recreate the annotations of `from` on `to` at the same offsets.
fn copy_annotations(
    tx: &mut Transaction<'_>,
    source: &Document,
    from: &str,
    to: &str,
) -> Result<()> {
    let from_path = source.text_path(from)?;
    let to_path = tx.document().text_path(to)?;
    for anno in source.annotations(&from_path, None, None) {
        let Some(range) = &anno.range else { continue };
        let mut copy = anno.clone();
        if tx.document().contains(&copy.id) {
            copy.id = tx.fresh_id(&copy.node_type);
        }
        copy.range = Some(range.with_path(to_path.clone()));
        drop_dangling_references(tx.document(), &mut copy);
        tx.document_mut().create(copy)?;
    }
    Ok(())
}

/// Outside a container, list items contribute their text only.
fn paste_list_item_text(tx: &mut Transaction<'_>, source: &Document, list: &str) -> Result<()> {
    for item in source.list_items(list)? {
        let path = source.text_path(&item)?;
        tx.insert_text(source.text(&path)?)?;
    }
    Ok(())
}

/// Transfer whole nodes into the selection's container.
fn paste_document(tx: &mut Transaction<'_>, source: &Document, nodes: Vec<NodeId>) -> Result<()> {
    let selection = tx.selection().clone();
    let container_id = selection
        .container_id()
        .cloned()
        .ok_or(ModelError::IllegalSelection("pasting nodes needs a container"))?;

    let mut insert_pos = match &selection {
        Selection::Node(sel) => {
            let pos = tx
                .document()
                .container(&container_id)?
                .position_strict(&sel.node_id)?;
            if sel.is_before() {
                pos
            } else if sel.is_after() {
                pos + 1
            } else {
                return Err(ModelError::IllegalSelection(
                    "a whole-node selection must be replaced before pasting",
                ));
            }
        }
        Selection::Property(_) | Selection::Container(_) => {
            let Some(start) = selection.start() else {
                return Err(ModelError::NoSelection);
            };
            let root = tx.document().root(start.node_id());
            if tx.document().is_kind(&root, NodeKind::List) {
                let pos = list_insert_position(tx, &root, &start)?;
                return paste_into_list(tx, source, &root, pos, nodes);
            }
            container_insert_position(tx, &container_id, &root, &start)?
        }
        Selection::Null => return Err(ModelError::NoSelection),
    };

    let mut visited = HashMap::new();
    let mut last = None;
    for id in nodes {
        if !is_copyable(source, &id) {
            tracing::debug!(node = %id, "skipping non-copyable node");
            continue;
        }
        let new_id = transfer_with_disambiguated_ids(source, tx.doc, &id, &mut visited, tx.ids)?;
        tx.document_mut()
            .container_mut(&container_id)?
            .show(&new_id, Some(insert_pos))?;
        insert_pos += 1;
        last = Some(new_id);
    }
    relink_references(source, tx.doc, &visited)?;

    if let Some(last) = last {
        let cursor = Selection::after_node(tx.document(), &last, &container_id)?;
        tx.set_selection(cursor);
    }
    Ok(())
}

/// Item index receiving pasted items when the cursor sits in a list.
fn list_insert_position(tx: &mut Transaction<'_>, list: &str, start: &Coordinate) -> Result<usize> {
    let item_pos = tx.document().list_item_position(list, start.node_id())?;
    let len = target_text_len(tx.document(), start);
    if len == 0 || start.offset == 0 {
        Ok(item_pos)
    } else if start.offset >= len {
        Ok(item_pos + 1)
    } else {
        tx.break_node()?;
        Ok(item_pos + 1)
    }
}

/// Container position receiving pasted nodes. An empty text node at the cursor is
/// replaced, a cursor in the middle of text splits it.
fn container_insert_position(
    tx: &mut Transaction<'_>,
    container_id: &str,
    root: &str,
    start: &Coordinate,
) -> Result<usize> {
    let pos = tx
        .document()
        .container(container_id)?
        .position_strict(root)?;
    let is_text = tx.document().is_kind(root, NodeKind::Text);
    let len = target_text_len(tx.document(), start);

    if is_text && len == 0 {
        tx.document_mut().delete(root)?;
        Ok(pos)
    } else if start.offset == 0 {
        Ok(pos)
    } else if !is_text || start.offset >= len {
        Ok(pos + 1)
    } else {
        tx.break_node()?;
        Ok(pos + 1)
    }
}

/// Create `id` from `source` in `target`, renaming it when its id is taken.
///
/// Owned children are transferred first, depth first, and the references to them
/// rewritten; annotations on the node come after it. `visited` maps source ids to
/// the ids they received in `target`.
///
/// Unowned references keep only the nodes already transferred. Once every node of
/// the paste is over, [`relink_references`] restores the ones pointing forward.
///
/// # Panics
///
/// When `id` was already transferred in this run. Callers hand every source node
/// over once; a repeat means the source graph has a cycle or is shared.
pub fn transfer_with_disambiguated_ids(
    source: &Document,
    target: &mut Document,
    id: &str,
    visited: &mut HashMap<NodeId, NodeId>,
    ids: &mut dyn IdGenerator,
) -> Result<NodeId> {
    assert!(
        !visited.contains_key(id),
        "node {id} transferred twice in one paste"
    );
    let mut node = source.get_strict(id)?.clone();
    let old_id = node.id.clone();
    let new_id = if target.contains(&old_id) {
        let fresh = ids.fresh(target, &node.node_type);
        tracing::debug!(old = %old_id, new = %fresh, "disambiguated id");
        fresh
    } else {
        old_id.clone()
    };
    visited.insert(old_id.clone(), new_id.clone());

    let descriptor = source
        .schema()
        .descriptor(&node.node_type)
        .ok_or_else(|| ModelError::UnknownType(node.node_type.clone()))?
        .clone();

    for prop in descriptor.owned_references() {
        let value = match node.get(&prop.name) {
            Some(value) if !value.is_null() => value.clone(),
            _ if prop.optional => continue,
            _ => {
                return Err(ModelError::MissingOwnedReference {
                    node: old_id,
                    property: prop.name.clone(),
                });
            }
        };
        for child in value.referenced_ids() {
            if !visited.contains_key(&child) {
                transfer_with_disambiguated_ids(source, target, &child, visited, ids)?;
            }
        }
        node.properties
            .insert(prop.name.clone(), value.map_ids(&mut |child| renamed(visited, child)));
    }

    let annotations: Vec<NodeId> = if descriptor.kind.is_isolated() || descriptor.text_property().is_some() {
        source
            .annotations_on_node(&old_id)
            .into_iter()
            .map(|anno| anno.id.clone())
            .collect()
    } else {
        Vec::new()
    };

    if let Some(range) = &node.range {
        let path = range.path().with_node(renamed(visited, &range.path().node_id));
        node.range = Some(TextRange::new(path, range.start.offset, range.end.offset));
    }
    for prop in descriptor.unowned_references() {
        if let Some(value) = node.properties.get(&prop.name) {
            let value = transferred_references(value, target, visited);
            node.properties.insert(prop.name.clone(), value);
        }
    }

    node.id = new_id.clone();
    target.create(node)?;

    for anno in annotations {
        if visited.contains_key(&anno) {
            continue;
        }
        transfer_with_disambiguated_ids(source, target, &anno, visited, ids)?;
    }
    Ok(new_id)
}

fn renamed(visited: &HashMap<NodeId, NodeId>, id: &NodeId) -> NodeId {
    visited.get(id).cloned().unwrap_or_else(|| id.clone())
}

/// `value` pointing at the transferred copies. Ids not yet present in `target` are dropped.
fn transferred_references(
    value: &PropertyValue,
    target: &Document,
    visited: &HashMap<NodeId, NodeId>,
) -> PropertyValue {
    retain_references(value, |id| {
        visited.get(id).is_some_and(|new_id| target.contains(new_id))
    })
    .map_ids(&mut |id| renamed(visited, id))
}

/// Point unowned references of transferred nodes at nodes transferred after them.
pub fn relink_references(
    source: &Document,
    target: &mut Document,
    visited: &HashMap<NodeId, NodeId>,
) -> Result<()> {
    let mut pairs: Vec<_> = visited.iter().collect();
    pairs.sort();
    for (old_id, new_id) in pairs {
        let (Some(node), true) = (source.get(old_id), target.contains(new_id)) else {
            continue;
        };
        let Some(descriptor) = source.schema().descriptor(&node.node_type) else {
            continue;
        };
        for prop in descriptor.unowned_references() {
            let Some(value) = node.get(&prop.name) else {
                continue;
            };
            let value = transferred_references(value, target, visited);
            let current = target.get(new_id).and_then(|n| n.get(&prop.name));
            if current != Some(&value) {
                tracing::trace!(node = %new_id, property = %prop.name, "relinked reference");
                target.set_property(new_id, &prop.name, value)?;
            }
        }
    }
    Ok(())
}
