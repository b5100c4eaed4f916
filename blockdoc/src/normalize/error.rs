use thiserror::Error;

use crate::block::NodePath;
use crate::block::content::Untyped;

const MAX_REPR_CHARS: usize = 40;

/// An authored value that has no block representation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("unsupported content at {path}: {type_name} `{repr}` is not text, a block, or a group")]
pub struct UnsupportedContent {
    /// Where the value sits in the authored input.
    pub path: NodePath,
    pub type_name: String,
    pub repr: String,
}

impl UnsupportedContent {
    pub fn new(path: NodePath, type_name: impl Into<String>, repr: impl Into<String>) -> Self {
        let repr = repr.into();
        let repr = if repr.chars().count() > MAX_REPR_CHARS {
            let mut short: String = repr.chars().take(MAX_REPR_CHARS).collect();
            short.push('…');
            short
        } else {
            repr
        };
        UnsupportedContent {
            path,
            type_name: type_name.into(),
            repr,
        }
    }

    pub fn from_untyped(path: NodePath, value: Untyped) -> Self {
        UnsupportedContent::new(path, value.type_name, value.repr)
    }
}
