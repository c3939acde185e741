//! Recorded document operations.
//!
//! Every mutation of a [`Document`](crate::Document) is recorded as one or more
//! [`Operation`]s. An external change store consumes them, and can undo a batch by
//! applying the inverses in reverse order.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::node::{Node, NodeId, PropertyValue, TextRange};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Create {
        node: Node,
    },
    /// Removal of a single node. Cascades are recorded as separate deletes.
    Delete {
        node: Node,
    },
    Set {
        id: NodeId,
        property: SmolStr,
        old: PropertyValue,
        new: PropertyValue,
    },
    SetRange {
        id: NodeId,
        old: TextRange,
        new: TextRange,
    },
}

impl Operation {
    /// Operation undoing this one.
    pub fn invert(&self) -> Operation {
        match self {
            Operation::Create { node } => Operation::Delete { node: node.clone() },
            Operation::Delete { node } => Operation::Create { node: node.clone() },
            Operation::Set {
                id,
                property,
                old,
                new,
            } => Operation::Set {
                id: id.clone(),
                property: property.clone(),
                old: new.clone(),
                new: old.clone(),
            },
            Operation::SetRange { id, old, new } => Operation::SetRange {
                id: id.clone(),
                old: new.clone(),
                new: old.clone(),
            },
        }
    }

    /// Id of the node this operation touches.
    pub fn node_id(&self) -> &NodeId {
        match self {
            Operation::Create { node } | Operation::Delete { node } => &node.id,
            Operation::Set { id, .. } | Operation::SetRange { id, .. } => id,
        }
    }
}

/// Inverse of a batch, ready to apply front to back.
pub fn invert_all(ops: &[Operation]) -> Vec<Operation> {
    ops.iter().rev().map(Operation::invert).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::PropertyPath;

    #[test]
    fn test_invert_set() {
        let op = Operation::Set {
            id: "p1".into(),
            property: "content".into(),
            old: PropertyValue::text("a"),
            new: PropertyValue::text("ab"),
        };
        let inv = op.invert();
        assert_eq!(
            inv,
            Operation::Set {
                id: "p1".into(),
                property: "content".into(),
                old: PropertyValue::text("ab"),
                new: PropertyValue::text("a"),
            }
        );
        assert_eq!(inv.invert(), op);
    }

    #[test]
    fn test_invert_all_reverses() {
        let path = PropertyPath::new("p1", "content");
        let ops = vec![
            Operation::Create {
                node: Node::text("p1", "paragraph", ""),
            },
            Operation::SetRange {
                id: "s1".into(),
                old: TextRange::new(path.clone(), 0, 1),
                new: TextRange::new(path, 0, 2),
            },
        ];
        let inv = invert_all(&ops);
        assert_eq!(inv.len(), 2);
        assert!(matches!(inv[0], Operation::SetRange { .. }));
        assert!(matches!(&inv[1], Operation::Delete { node } if node.id == "p1"));
    }

    #[test]
    fn test_serde_tagging() {
        let op = Operation::Delete {
            node: Node::new("t", "toc"),
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["op"], "delete");
        assert_eq!(json["node"]["id"], "t");
    }
}
