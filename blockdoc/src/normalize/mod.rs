mod error;

pub use error::UnsupportedContent;

use crate::block::content::{Block, Blocks, Content};
use crate::block::leaf::Payload;
use crate::block::{DraftNode, Node, NodePath};

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Coerce a single authored value into a typed leaf.
///
/// Bare text becomes a Markdown leaf without an identifier, typed leaves pass
/// through. Groups and untyped values are rejected; groups are handled by
/// [`normalize`] before they reach this point. A leaf whose payload already
/// points into an attachment list is rejected too: only extraction may
/// produce attachment references.
pub fn coerce(content: Content, path: &NodePath) -> Result<Block, UnsupportedContent> {
    match content {
        Content::Text(text) => Ok(Block::markdown(text)),
        Content::Leaf(block) => match block.content.payload() {
            Some(Payload::Attached(reference)) => Err(UnsupportedContent::new(
                path.clone(),
                format!("{} with a payload reference", block.content.element_name()),
                reference.to_string(),
            )),
            _ => Ok(block),
        },
        Content::Group(group) => Err(UnsupportedContent::new(
            path.clone(),
            "group",
            format!("{} block(s)", group.blocks.len()),
        )),
        Content::Untyped(value) => Err(UnsupportedContent::from_untyped(path.clone(), value)),
    }
}

/// Normalize a top-level sequence of authored values into a canonical tree.
///
/// The sequence is wrapped in an implicit group. When that wrapper would hold
/// exactly one explicit group, the explicit group becomes the root instead.
pub fn normalize<I, C>(top: I) -> Result<DraftNode, UnsupportedContent>
where
    I: IntoIterator<Item = C>,
    C: Into<Content>,
{
    let root = NodePath::root();
    let children = normalize_children(top.into_iter().map(Into::into), &root)?;
    Ok(collapse_wrapper(children))
}

// ---------------------------------------------------------------------------
// Tree walk
// ---------------------------------------------------------------------------

fn normalize_children(
    values: impl Iterator<Item = Content>,
    parent: &NodePath,
) -> Result<Vec<DraftNode>, UnsupportedContent> {
    values
        .enumerate()
        .map(|(index, value)| normalize_value(value, &parent.child(index)))
        .collect()
}

fn normalize_value(value: Content, path: &NodePath) -> Result<DraftNode, UnsupportedContent> {
    match value {
        Content::Group(Blocks { id, blocks }) => {
            let children = normalize_children(blocks.into_iter(), path)?;
            Ok(Node::group(id, children))
        }
        other => {
            let Block { id, content } = coerce(other, path)?;
            Ok(Node::leaf(id, content))
        }
    }
}

/// Wrap the top-level nodes, eliding the wrapper around a sole explicit group.
fn collapse_wrapper(children: Vec<DraftNode>) -> DraftNode {
    match <[DraftNode; 1]>::try_from(children) {
        Ok([group @ Node::Group { .. }]) => group,
        Ok([leaf]) => Node::group(None, vec![leaf]),
        Err(children) => Node::group(None, children),
    }
}
