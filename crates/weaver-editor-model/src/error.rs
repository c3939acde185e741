//! Error types for document model operations.

use miette::Diagnostic;
use smol_str::SmolStr;

use crate::node::PropertyPath;

/// Errors raised by the document model, selections and the copy/paste engines.
///
/// None of these are transient: every failure is a deterministic function of the
/// document state and the request, so callers fix the input instead of retrying.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum ModelError {
    /// An id that does not resolve in the document.
    #[error("node not found: {0}")]
    #[diagnostic(code(weaver::model::not_found))]
    NotFound(SmolStr),

    /// The node exists but its schema has no such property.
    #[error("node {node} has no property {property}")]
    #[diagnostic(code(weaver::model::property_not_found))]
    PropertyNotFound { node: SmolStr, property: SmolStr },

    /// The addressed property is not a text property.
    #[error("{0} is not a text property")]
    #[diagnostic(code(weaver::model::not_text))]
    NotText(PropertyPath),

    #[error("a node with id {0} already exists")]
    #[diagnostic(code(weaver::model::duplicate_id))]
    DuplicateId(SmolStr),

    #[error("node {node} is already shown in container {container}")]
    #[diagnostic(code(weaver::model::already_shown))]
    AlreadyShown { container: SmolStr, node: SmolStr },

    #[error("node {node} is not shown in container {container}")]
    #[diagnostic(code(weaver::model::not_shown))]
    NotShown { container: SmolStr, node: SmolStr },

    #[error("unknown node type: {0}")]
    #[diagnostic(code(weaver::model::unknown_type))]
    UnknownType(SmolStr),

    /// Node exists but is not of the kind the operation needs (e.g. not a list).
    #[error("node {node} is not a {expected}")]
    #[diagnostic(code(weaver::model::wrong_kind))]
    WrongKind { node: SmolStr, expected: &'static str },

    #[error("offset {offset} is out of bounds for {path} (length {len})")]
    #[diagnostic(code(weaver::model::invalid_offset))]
    InvalidOffset {
        path: PropertyPath,
        offset: usize,
        len: usize,
    },

    /// Annotation range whose endpoints disagree on the path or are out of order.
    #[error("invalid annotation range on {id}: {reason}")]
    #[diagnostic(code(weaver::model::invalid_range))]
    InvalidRange { id: SmolStr, reason: &'static str },

    /// Selection kind is not supported by the requested operation.
    #[error("illegal selection: {0}")]
    #[diagnostic(
        code(weaver::model::illegal_selection),
        help("only property selections are supported here")
    )]
    IllegalSelection(&'static str),

    #[error("cannot paste without a selection")]
    #[diagnostic(code(weaver::model::no_selection))]
    NoSelection,

    /// A non-optional owned reference is missing on a node being transferred.
    #[error("node {node} is missing non-optional owned reference {property}")]
    #[diagnostic(code(weaver::model::missing_owned_reference))]
    MissingOwnedReference { node: SmolStr, property: SmolStr },

    #[error("invalid configuration")]
    #[diagnostic(code(weaver::model::config))]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = ModelError> = std::result::Result<T, E>;
