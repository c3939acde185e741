//! Containers: ordered flows of node ids.
//!
//! A container references the nodes it shows but never owns them; hiding a node
//! leaves it in the document.

use smol_str::SmolStr;

use crate::document::Document;
use crate::error::{ModelError, Result};
use crate::node::{Node, NodeId, PropertyPath, PropertyValue};
use crate::schema::NodeKind;

const NODES: &str = "nodes";

/// Read view over a container node.
#[derive(Debug, Clone, Copy)]
pub struct Container<'a> {
    doc: &'a Document,
    id: &'a NodeId,
}

impl<'a> Container<'a> {
    pub fn id(&self) -> &'a NodeId {
        self.id
    }

    /// Shown ids in order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.doc
            .get(self.id)
            .and_then(|n| n.get(NODES))
            .map(PropertyValue::referenced_ids)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.node_ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.position(node_id).is_some()
    }

    pub fn position(&self, node_id: &str) -> Option<usize> {
        self.node_ids().iter().position(|id| id == node_id)
    }

    pub fn position_strict(&self, node_id: &str) -> Result<usize> {
        self.position(node_id).ok_or_else(|| ModelError::NotShown {
            container: self.id.clone(),
            node: SmolStr::new(node_id),
        })
    }

    pub fn node_at(&self, pos: usize) -> Option<&'a Node> {
        let id = self.node_ids().into_iter().nth(pos)?;
        self.doc.get(&id)
    }

    pub fn first(&self) -> Option<&'a Node> {
        self.node_at(0)
    }

    pub fn last(&self) -> Option<&'a Node> {
        self.len().checked_sub(1).and_then(|pos| self.node_at(pos))
    }
}

/// Show/hide handle on a container node.
#[derive(Debug)]
pub struct ContainerMut<'a> {
    doc: &'a mut Document,
    id: NodeId,
}

impl ContainerMut<'_> {
    pub fn view(&self) -> Container<'_> {
        Container {
            doc: self.doc,
            id: &self.id,
        }
    }

    /// Show `node_id` at `pos`, appending when `pos` is `None`.
    pub fn show(&mut self, node_id: &str, pos: Option<usize>) -> Result<()> {
        self.doc.get_strict(node_id)?;
        // a node is shown in at most one container
        if let Some(container) = self.doc.container_of(node_id) {
            return Err(ModelError::AlreadyShown {
                container,
                node: SmolStr::new(node_id),
            });
        }
        let mut ids = self.view().node_ids();
        let pos = pos.unwrap_or(ids.len());
        if pos > ids.len() {
            return Err(ModelError::InvalidOffset {
                path: PropertyPath::new(self.id.clone(), NODES),
                offset: pos,
                len: ids.len(),
            });
        }
        ids.insert(pos, SmolStr::new(node_id));
        self.doc
            .set_property(&self.id, NODES, PropertyValue::references(ids))?;
        Ok(())
    }

    /// Hide `node_id`, returning the position it had.
    pub fn hide(&mut self, node_id: &str) -> Result<usize> {
        let mut ids = self.view().node_ids();
        let pos = self.view().position_strict(node_id)?;
        ids.remove(pos);
        self.doc
            .set_property(&self.id, NODES, PropertyValue::references(ids))?;
        Ok(pos)
    }
}

impl Document {
    pub fn container<'a>(&'a self, id: &str) -> Result<Container<'a>> {
        let node = self.get_strict(id)?;
        if !self.is_kind(id, NodeKind::Container) {
            return Err(ModelError::WrongKind {
                node: node.id.clone(),
                expected: "container",
            });
        }
        Ok(Container { doc: self, id: &node.id })
    }

    pub fn container_mut(&mut self, id: &str) -> Result<ContainerMut<'_>> {
        let id = self.container(id)?.id().clone();
        Ok(ContainerMut { doc: self, id })
    }

    /// First container showing `node_id`, by container id.
    pub fn container_of(&self, node_id: &str) -> Option<NodeId> {
        let mut showing: Vec<&NodeId> = self
            .nodes()
            .filter(|n| self.is_kind(&n.id, NodeKind::Container))
            .filter(|n| {
                n.get(NODES)
                    .is_some_and(|v| v.referenced_ids().iter().any(|id| id == node_id))
            })
            .map(|n| &n.id)
            .collect();
        showing.sort();
        showing.first().map(|id| (*id).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::body_doc;

    #[test]
    fn test_show_append_and_position() {
        let mut doc = body_doc(&[("p1", "one"), ("p2", "two")]);
        doc.create(Node::text("p3", "paragraph", "three")).unwrap();
        doc.container_mut("body").unwrap().show("p3", Some(1)).unwrap();

        let body = doc.container("body").unwrap();
        assert_eq!(body.node_ids(), vec!["p1", "p3", "p2"]);
        assert_eq!(body.position("p2"), Some(2));
        assert_eq!(body.node_at(1).unwrap().id, "p3");
        assert_eq!(body.last().unwrap().id, "p2");
        assert!(body.node_at(3).is_none());
    }

    #[test]
    fn test_show_twice_fails() {
        let mut doc = body_doc(&[("p1", "one")]);
        let err = doc
            .container_mut("body")
            .unwrap()
            .show("p1", None)
            .unwrap_err();
        assert!(matches!(err, ModelError::AlreadyShown { .. }));
    }

    #[test]
    fn test_show_in_second_container_fails() {
        let mut doc = body_doc(&[("p1", "one")]);
        doc.create(Node::new("side", "container").with("nodes", PropertyValue::References(vec![])))
            .unwrap();
        let err = doc
            .container_mut("side")
            .unwrap()
            .show("p1", None)
            .unwrap_err();
        match err {
            ModelError::AlreadyShown { container, node } => {
                assert_eq!(container, "body");
                assert_eq!(node, "p1");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(doc.container("side").unwrap().is_empty());

        doc.container_mut("body").unwrap().hide("p1").unwrap();
        doc.container_mut("side").unwrap().show("p1", None).unwrap();
        assert_eq!(doc.container_of("p1").as_deref(), Some("side"));
    }

    #[test]
    fn test_show_missing_node_fails() {
        let mut doc = body_doc(&[]);
        let err = doc
            .container_mut("body")
            .unwrap()
            .show("ghost", None)
            .unwrap_err();
        assert!(matches!(err, ModelError::NotFound(_)));
    }

    #[test]
    fn test_hide_keeps_node() {
        let mut doc = body_doc(&[("p1", "one"), ("p2", "two")]);
        let pos = doc.container_mut("body").unwrap().hide("p1").unwrap();
        assert_eq!(pos, 0);
        assert!(doc.contains("p1"));
        assert_eq!(doc.container("body").unwrap().node_ids(), vec!["p2"]);
        assert!(matches!(
            doc.container("body").unwrap().position_strict("p1"),
            Err(ModelError::NotShown { .. })
        ));
    }

    #[test]
    fn test_container_of() {
        let doc = body_doc(&[("p1", "one")]);
        assert_eq!(doc.container_of("p1").as_deref(), Some("body"));
        assert!(doc.container("p1").is_err());
    }
}
