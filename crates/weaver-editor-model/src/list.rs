//! List structure: a list owns its items through the `items` property.

use smol_str::SmolStr;

use crate::document::Document;
use crate::error::{ModelError, Result};
use crate::node::{Node, NodeId, PropertyPath, PropertyValue};
use crate::schema::NodeKind;

const ITEMS: &str = "items";

impl Document {
    pub fn list_items(&self, list_id: &str) -> Result<Vec<NodeId>> {
        let list = self.get_strict(list_id)?;
        if !self.is_kind(list_id, NodeKind::List) {
            return Err(ModelError::WrongKind {
                node: list.id.clone(),
                expected: "list",
            });
        }
        Ok(list
            .get(ITEMS)
            .map(PropertyValue::referenced_ids)
            .unwrap_or_default())
    }

    pub fn list_item_position(&self, list_id: &str, item_id: &str) -> Result<usize> {
        self.list_items(list_id)?
            .iter()
            .position(|id| id == item_id)
            .ok_or_else(|| ModelError::NotShown {
                container: SmolStr::new(list_id),
                node: SmolStr::new(item_id),
            })
    }

    pub fn list_item_at(&self, list_id: &str, pos: usize) -> Option<&Node> {
        let id = self.list_items(list_id).ok()?.into_iter().nth(pos)?;
        self.get(&id)
    }

    /// Create `item` and insert it into the list at `pos`.
    pub fn insert_list_item(&mut self, list_id: &str, pos: usize, item: Node) -> Result<()> {
        let mut items = self.list_items(list_id)?;
        if pos > items.len() {
            return Err(ModelError::InvalidOffset {
                path: PropertyPath::new(list_id, ITEMS),
                offset: pos,
                len: items.len(),
            });
        }
        if self.schema().kind_of(&item.node_type) != Some(NodeKind::ListItem) {
            return Err(ModelError::WrongKind {
                node: item.id,
                expected: "list item",
            });
        }
        let item_id = self.create(item)?.id.clone();
        items.insert(pos, item_id);
        self.set_property(list_id, ITEMS, PropertyValue::references(items))?;
        Ok(())
    }

    /// Detach and delete an item.
    pub fn remove_list_item(&mut self, list_id: &str, item_id: &str) -> Result<Node> {
        self.list_item_position(list_id, item_id)?;
        self.delete(item_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::list_doc;

    #[test]
    fn test_items_and_positions() {
        let doc = list_doc(&["one", "two", "three"]);
        assert_eq!(doc.list_items("l1").unwrap(), vec!["li-1", "li-2", "li-3"]);
        assert_eq!(doc.list_item_position("l1", "li-3").unwrap(), 2);
        assert_eq!(doc.list_item_at("l1", 1).unwrap().id, "li-2");
        assert!(doc.list_item_at("l1", 5).is_none());
        assert!(matches!(
            doc.list_items("li-1"),
            Err(ModelError::WrongKind { .. })
        ));
    }

    #[test]
    fn test_insert_item() {
        let mut doc = list_doc(&["one", "two"]);
        doc.insert_list_item("l1", 1, Node::text("new", "list-item", "mid"))
            .unwrap();
        assert_eq!(doc.list_items("l1").unwrap(), vec!["li-1", "new", "li-2"]);
        assert_eq!(doc.parent("new").map(|p| p.as_str()), Some("l1"));

        let err = doc
            .insert_list_item("l1", 0, Node::text("p", "paragraph", ""))
            .unwrap_err();
        assert!(matches!(err, ModelError::WrongKind { .. }));
        assert!(!doc.contains("p"));
    }

    #[test]
    fn test_remove_item() {
        let mut doc = list_doc(&["one", "two"]);
        doc.remove_list_item("l1", "li-1").unwrap();
        assert_eq!(doc.list_items("l1").unwrap(), vec!["li-2"]);
        assert!(!doc.contains("li-1"));
        assert!(doc.remove_list_item("l1", "li-1").is_err());
    }
}
