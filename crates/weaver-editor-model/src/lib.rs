//! weaver-editor-model: Structured document model behind the editor.
//!
//! This crate provides:
//! - `Document` - schema-driven node graph with annotation and marker indexes
//! - `Operation` log recording every mutation, invertible for undo
//! - Container, list and text primitives that keep ranges consistent
//! - `Selection` kinds and coordinate ordering inside containers
//! - `Transaction` - selection-relative editing (typing, deleting, breaking)
//! - Copy into snippet documents and paste back with id disambiguation

pub mod config;
pub mod container;
pub mod copy;
pub mod document;
pub mod error;
pub mod helpers;
pub mod ids;
pub mod index;
pub mod list;
pub mod node;
pub mod operation;
pub mod paste;
pub mod schema;
pub mod selection;
pub mod text;
pub mod transaction;

#[cfg(test)]
pub(crate) mod fixtures;
#[cfg(test)]
mod tests;

pub use config::{IdConfig, IdStrategy, ModelConfig, PasteConfig};
pub use container::{Container, ContainerMut};
pub use copy::copy_selection;
pub use document::{Document, SNIPPET_ID, TEXT_SNIPPET_ID};
pub use error::{ModelError, Result};
pub use helpers::{copy_node, delete_list_range, delete_text_range, merge_text_nodes};
pub use ids::{IdGenerator, RandomIds, SequentialIds};
pub use index::RangeIndex;
pub use node::{Coordinate, Node, NodeId, PropertyPath, PropertyValue, TextRange};
pub use operation::{Operation, invert_all};
pub use paste::{
    PasteContent, paste, plain_text_to_document, relink_references, transfer_with_disambiguated_ids,
};
pub use schema::{NodeDescriptor, NodeKind, PropertyDescriptor, PropertyKind, Schema};
pub use selection::{
    ContainerSelection, NodeSelection, NodeSelectionMode, PropertySelection, Selection,
    contains_selection,
};
pub use smol_str::SmolStr;
pub use transaction::Transaction;
