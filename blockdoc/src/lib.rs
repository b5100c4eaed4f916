pub mod block;
pub mod document;
pub mod normalize;
pub mod schema;

pub use crate::block::content::{Block, Blocks, Content, Untyped};
pub use crate::block::leaf::{BigNumber, LeafContent, LeafKind, Payload};
pub use crate::block::reference::AttachmentRef;
pub use crate::block::{BlockId, BlockNode, DraftNode, Node, NodePath};
pub use crate::document::{Document, DocumentMeta, OutputMode, SerializeError};
pub use crate::normalize::{UnsupportedContent, coerce, normalize};
pub use crate::schema::{Schema, SchemaError, SchemaViolation};
