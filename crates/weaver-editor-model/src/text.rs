//! Text property editing and annotation maintenance.
//!
//! Offsets count chars. Every edit here rewrites one text property and then moves
//! the annotations and markers on it so they keep addressing the same characters.

use smol_str::SmolStr;

use crate::document::Document;
use crate::error::{ModelError, Result};
use crate::ids::IdGenerator;
use crate::node::{Node, PropertyPath, PropertyValue, TextRange};
use crate::schema::NodeKind;

/// Byte index of the `offset`-th char, or the string length past the end.
pub(crate) fn byte_index(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Chars `start..end` of `text`.
pub(crate) fn char_slice(text: &str, start: usize, end: usize) -> &str {
    &text[byte_index(text, start)..byte_index(text, end)]
}

impl Document {
    /// Current value of a text property. Unset text reads as empty.
    pub fn text(&self, path: &PropertyPath) -> Result<&str> {
        let node = self.get_strict(&path.node_id)?;
        let descriptor = self.descriptor(&path.node_id)?;
        let prop = descriptor
            .get_property(&path.property)
            .ok_or_else(|| ModelError::PropertyNotFound {
                node: node.id.clone(),
                property: path.property.clone(),
            })?;
        if !prop.kind.is_text() {
            return Err(ModelError::NotText(path.clone()));
        }
        Ok(node.text_of(&path.property).unwrap_or(""))
    }

    pub fn text_len(&self, path: &PropertyPath) -> Result<usize> {
        Ok(self.text(path)?.chars().count())
    }

    /// Path of the node's primary text property.
    pub fn text_path(&self, id: &str) -> Result<PropertyPath> {
        let descriptor = self.descriptor(id)?;
        let property = descriptor
            .text_property()
            .ok_or_else(|| ModelError::WrongKind {
                node: SmolStr::new(id),
                expected: "text node",
            })?;
        Ok(PropertyPath::new(id, property.clone()))
    }

    /// Annotations on `path` intersecting `[start, end]`, by start then end offset.
    pub fn annotations(
        &self,
        path: &PropertyPath,
        start: Option<usize>,
        end: Option<usize>,
    ) -> Vec<&Node> {
        self.annotations.query(&self.nodes, path, start, end)
    }

    /// Annotations on any text property of `id`.
    pub fn annotations_on_node(&self, id: &str) -> Vec<&Node> {
        self.annotations.query_node(&self.nodes, id)
    }

    /// Markers on `path` intersecting `[start, end]`.
    pub fn markers(
        &self,
        path: &PropertyPath,
        start: Option<usize>,
        end: Option<usize>,
    ) -> Vec<&Node> {
        self.markers.query(&self.nodes, path, start, end)
    }

    pub fn markers_on_node(&self, id: &str) -> Vec<&Node> {
        self.markers.query_node(&self.nodes, id)
    }

    /// Insert `text` at `offset`.
    ///
    /// Ranges starting at or after the offset shift right. Ranges containing the
    /// offset grow, and so do ranges ending exactly there when their kind expands
    /// right.
    pub fn insert_text(&mut self, path: &PropertyPath, offset: usize, text: &str) -> Result<()> {
        let current = self.text(path)?;
        let len = current.chars().count();
        if offset > len {
            return Err(ModelError::InvalidOffset {
                path: path.clone(),
                offset,
                len,
            });
        }
        if text.is_empty() {
            return Ok(());
        }

        let mut updated = current.to_string();
        updated.insert_str(byte_index(current, offset), text);
        self.set_property(&path.node_id, &path.property, PropertyValue::Text(updated))?;

        let inserted = text.chars().count();
        for node in self.ranges_on(path) {
            let Some(range) = &node.range else { continue };
            let (start, end) = (range.start.offset, range.end.offset);
            let expands = self
                .schema()
                .descriptor(&node.node_type)
                .is_some_and(|d| d.expands_right);

            let moved = if start >= offset {
                Some((start + inserted, end + inserted))
            } else if offset < end || (offset == end && expands) {
                Some((start, end + inserted))
            } else {
                None
            };
            if let Some((start, end)) = moved {
                self.set_range_unchecked(&node.id, TextRange::new(path.clone(), start, end));
            }
        }
        tracing::trace!(%path, offset, inserted, "inserted text");
        Ok(())
    }

    /// Delete chars `start..end`.
    ///
    /// Ranges fully inside the deleted span are deleted, partial overlaps are clipped
    /// and ranges after it shift left.
    pub fn delete_text(&mut self, path: &PropertyPath, start: usize, end: usize) -> Result<()> {
        let current = self.text(path)?;
        let len = current.chars().count();
        if end > len {
            return Err(ModelError::InvalidOffset {
                path: path.clone(),
                offset: end,
                len,
            });
        }
        if start > end {
            return Err(ModelError::InvalidOffset {
                path: path.clone(),
                offset: start,
                len: end,
            });
        }
        if start == end {
            return Ok(());
        }

        let mut updated = current.to_string();
        updated.replace_range(byte_index(current, start)..byte_index(current, end), "");

        let removed = end - start;
        let map = |x: usize| {
            if x <= start {
                x
            } else if x >= end {
                x - removed
            } else {
                start
            }
        };

        // Move ranges before the text shrinks so no intermediate state is out of bounds.
        for node in self.ranges_on(path) {
            let Some(range) = &node.range else { continue };
            let (s, e) = (range.start.offset, range.end.offset);
            let collapsed_on_edge = s == e && (s == start || s == end);
            if start <= s && e <= end && !collapsed_on_edge {
                self.delete(&node.id)?;
                continue;
            }
            let (ns, ne) = (map(s), map(e));
            if (ns, ne) != (s, e) {
                self.set_range_unchecked(&node.id, TextRange::new(path.clone(), ns, ne));
            }
        }
        self.set_property(&path.node_id, &path.property, PropertyValue::Text(updated))?;
        tracing::trace!(%path, start, end, "deleted text");
        Ok(())
    }

    /// Replace chars `start..end` with `text`.
    ///
    /// A marker covering exactly the replaced span is typed over: it is replaced by a
    /// marker of the same type with a fresh id spanning the new text.
    pub fn replace_text(
        &mut self,
        path: &PropertyPath,
        start: usize,
        end: usize,
        text: &str,
        ids: &mut dyn IdGenerator,
    ) -> Result<()> {
        let typed_over: Vec<Node> = self
            .markers
            .query(&self.nodes, path, Some(start), Some(end))
            .into_iter()
            .filter(|m| {
                m.range
                    .as_ref()
                    .is_some_and(|r| r.start.offset == start && r.end.offset == end)
            })
            .cloned()
            .collect();

        self.delete_text(path, start, end)?;
        self.insert_text(path, start, text)?;

        let inserted = text.chars().count();
        for marker in typed_over {
            if self.contains(&marker.id) {
                self.delete(&marker.id)?;
            }
            let mut fresh = marker.clone();
            fresh.id = ids.fresh(self, &marker.node_type);
            fresh.range = Some(TextRange::new(path.clone(), start, start + inserted));
            tracing::debug!(old = %marker.id, new = %fresh.id, "marker typed over");
            self.create(fresh)?;
        }
        Ok(())
    }

    /// Hand the ranges of `path` from `offset` on to `new_path` at `new_offset`.
    ///
    /// Used when a text node is split. The tail text must already be in place at
    /// `new_path`; the caller truncates `path` afterwards, which clips ranges
    /// straddling the split. Straddling ranges whose kind can split get a second
    /// range over the tail.
    pub fn transfer_ranges(
        &mut self,
        path: &PropertyPath,
        offset: usize,
        new_path: &PropertyPath,
        new_offset: usize,
        ids: &mut dyn IdGenerator,
    ) -> Result<()> {
        for node in self.ranges_on(path) {
            let Some(range) = node.range.clone() else {
                continue;
            };
            let is_marker = self.is_kind(&node.id, NodeKind::Marker);
            let can_split = self
                .schema()
                .descriptor(&node.node_type)
                .is_some_and(|d| d.can_split);
            let straddles = range.start.offset < offset && offset < range.end.offset;

            if straddles && can_split {
                let mut tail = node.clone();
                tail.id = ids.fresh(self, &node.node_type);
                tail.range = Some(TextRange::new(
                    new_path.clone(),
                    new_offset,
                    new_offset + range.end.offset - offset,
                ));
                self.create(tail)?;
            } else if range.start.offset >= offset {
                let moved = TextRange::new(
                    new_path.clone(),
                    new_offset + range.start.offset - offset,
                    new_offset + range.end.offset - offset,
                );
                if is_marker {
                    self.delete(&node.id)?;
                    let mut fresh = node.clone();
                    fresh.id = ids.fresh(self, &node.node_type);
                    fresh.range = Some(moved);
                    self.create(fresh)?;
                } else {
                    self.set_range(&node.id, moved)?;
                }
            }
        }
        Ok(())
    }

    /// Snapshot of annotations and markers on `path`.
    fn ranges_on(&self, path: &PropertyPath) -> Vec<Node> {
        self.annotations
            .query(&self.nodes, path, None, None)
            .into_iter()
            .chain(self.markers.query(&self.nodes, path, None, None))
            .cloned()
            .collect()
    }
}
