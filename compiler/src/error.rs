use blockdoc::{BlockId, NodePath, SchemaViolation, SerializeError, UnsupportedContent};
use thiserror::Error;

/// Two nodes were given the same identifier by the caller.
///
/// Paths are positions in the canonical tree, after wrapper collapsing, so
/// they can differ from the authored positions when a sole explicit group
/// became the root.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("duplicate identifier `{id}` at tree position {second} (first used at {first})")]
pub struct DuplicateIdentifier {
    pub id: BlockId,
    /// Canonical-tree path of the first node carrying the identifier.
    pub first: NodePath,
    /// Canonical-tree path of the node that repeats it.
    pub second: NodePath,
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    UnsupportedContent(#[from] UnsupportedContent),

    #[error(transparent)]
    DuplicateIdentifier(#[from] DuplicateIdentifier),

    #[error(transparent)]
    Serialize(#[from] SerializeError),

    /// The serialized document broke the schema. The rejected document is
    /// kept for diagnostics only.
    #[error("document failed schema validation: {violation}")]
    SchemaValidation {
        violation: SchemaViolation,
        document: String,
    },
}
