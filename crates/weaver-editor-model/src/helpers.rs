//! Structural helpers shared by the copy engine and transactions.

use crate::document::Document;
use crate::error::Result;
use crate::ids::IdGenerator;
use crate::node::{Coordinate, Node, PropertyValue};

/// Records recreating `id` in another document: owned descendants before their
/// owners, then the annotations on any of them.
pub fn copy_node(doc: &Document, id: &str) -> Result<Vec<Node>> {
    doc.get_strict(id)?;
    let subtree = doc.owned_subtree(id);
    let mut records: Vec<Node> = subtree
        .iter()
        .rev()
        .filter_map(|member| doc.get(member))
        .cloned()
        .collect();
    for member in &subtree {
        records.extend(doc.annotations_on_node(member).into_iter().cloned());
    }
    Ok(records)
}

/// Delete text between two coordinates of one property. A missing start means the
/// start of the text, a missing end its end.
pub fn delete_text_range(
    doc: &mut Document,
    start: Option<&Coordinate>,
    end: Option<&Coordinate>,
) -> Result<()> {
    let Some(path) = start.or(end).map(|c| c.path.clone()) else {
        return Ok(());
    };
    let from = start.map_or(0, |c| c.offset);
    let to = match end {
        Some(c) => c.offset,
        None => doc.text_len(&path)?,
    };
    doc.delete_text(&path, from.min(to), from.max(to))
}

/// Delete list content between two item coordinates.
///
/// Items strictly between the ends are removed. A boundary item whose whole text is
/// covered is removed; otherwise it is truncated, and when both boundary items
/// survive the second is merged into the first. A list left without items is
/// deleted.
pub fn delete_list_range(
    doc: &mut Document,
    list_id: &str,
    start: Option<&Coordinate>,
    end: Option<&Coordinate>,
    ids: &mut dyn IdGenerator,
) -> Result<()> {
    let items = doc.list_items(list_id)?;
    let (Some(first), Some(last)) = (items.first(), items.last()) else {
        return Ok(());
    };

    let mut start = match start {
        Some(c) => c.clone(),
        None => Coordinate::new(doc.text_path(first)?, 0),
    };
    let mut end = match end {
        Some(c) => c.clone(),
        None => {
            let path = doc.text_path(last)?;
            let len = doc.text_len(&path)?;
            Coordinate::new(path, len)
        }
    };

    let mut start_pos = doc.list_item_position(list_id, start.node_id())?;
    let mut end_pos = doc.list_item_position(list_id, end.node_id())?;
    if start_pos == end_pos {
        return delete_text_range(doc, Some(&start), Some(&end));
    }
    if start_pos > end_pos {
        std::mem::swap(&mut start, &mut end);
        std::mem::swap(&mut start_pos, &mut end_pos);
    }

    let first_entire = start.offset == 0;
    let last_entire = end.offset >= doc.text_len(&end.path)?;

    if last_entire {
        doc.delete(end.node_id())?;
    } else {
        delete_text_range(doc, None, Some(&end))?;
    }
    for inner in &items[start_pos + 1..end_pos] {
        doc.delete(inner)?;
    }
    if first_entire {
        doc.delete(start.node_id())?;
    } else {
        delete_text_range(doc, Some(&start), None)?;
    }
    if !first_entire && !last_entire {
        merge_text_nodes(doc, start.node_id(), end.node_id(), ids)?;
    }

    if doc.list_items(list_id)?.is_empty() {
        tracing::debug!(list = %list_id, "deleting emptied list");
        doc.delete(list_id)?;
    }
    Ok(())
}

/// Append the text of `source_id` to `target_id`, moving its annotations along,
/// then delete `source_id`.
pub fn merge_text_nodes(
    doc: &mut Document,
    target_id: &str,
    source_id: &str,
    ids: &mut dyn IdGenerator,
) -> Result<()> {
    let target = doc.text_path(target_id)?;
    let source = doc.text_path(source_id)?;
    let offset = doc.text_len(&target)?;

    let mut joined = doc.text(&target)?.to_string();
    joined.push_str(doc.text(&source)?);
    doc.set_property(target_id, &target.property, PropertyValue::Text(joined))?;

    doc.transfer_ranges(&source, 0, &target, offset, ids)?;
    doc.delete(source_id)?;
    Ok(())
}
