use std::collections::BTreeSet;

use blockdoc::{AttachmentRef, BlockId, BlockNode, LeafContent, LeafKind, Node, Payload};
use serde::{Deserialize, Serialize};

const DEFAULT_INLINE_THRESHOLD: usize = 64 * 1024;

/// Decides which leaf payloads leave the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttachmentPolicy {
    /// Payloads larger than this many bytes are externalized whatever their kind.
    pub inline_threshold: usize,
    /// Kinds whose payloads are always externalized.
    pub externalize: BTreeSet<LeafKind>,
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        AttachmentPolicy {
            inline_threshold: DEFAULT_INLINE_THRESHOLD,
            externalize: BTreeSet::from([
                LeafKind::MediaFile,
                LeafKind::Chart,
                LeafKind::TabularDataLarge,
                LeafKind::StructuredFile,
            ]),
        }
    }
}

impl AttachmentPolicy {
    pub fn from_toml(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    pub fn with_inline_threshold(mut self, inline_threshold: usize) -> Self {
        self.inline_threshold = inline_threshold;
        self
    }

    pub fn should_externalize(&self, content: &LeafContent) -> bool {
        match content.payload() {
            None | Some(Payload::Attached(_)) => false,
            Some(payload) => {
                self.externalize.contains(&content.kind()) || payload.len() > self.inline_threshold
            }
        }
    }
}

/// A payload moved out of the document.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    /// Rank in the attachment list; matches the leaf's `attachment://<index>`.
    pub index: usize,
    pub block_id: BlockId,
    pub mime: String,
    pub data: Vec<u8>,
}

/// Move externalizable payloads into an attachment list.
///
/// The tree is rebuilt in pre-order; shape, identifiers and sibling order are
/// unchanged and attachment order follows the traversal.
pub fn extract_attachments(
    tree: BlockNode,
    policy: &AttachmentPolicy,
) -> (BlockNode, Vec<Attachment>) {
    let mut attachments = Vec::new();
    let tree = extract_node(tree, policy, &mut attachments);
    (tree, attachments)
}

fn extract_node(
    node: BlockNode,
    policy: &AttachmentPolicy,
    attachments: &mut Vec<Attachment>,
) -> BlockNode {
    match node {
        Node::Group { id, children } => {
            let children = children
                .into_iter()
                .map(|child| extract_node(child, policy, attachments))
                .collect();
            Node::Group { id, children }
        }
        Node::Leaf { id, mut content } => {
            if policy.should_externalize(&content) {
                let mime = content.mime().to_string();
                if let Some(payload) = content.payload_mut() {
                    let reference = AttachmentRef::new(attachments.len());
                    let taken = std::mem::replace(payload, Payload::Attached(reference));
                    if let Some(data) = taken.into_bytes() {
                        tracing::trace!(block = %id, index = reference.index(), bytes = data.len(), "externalized payload");
                        attachments.push(Attachment {
                            index: reference.index(),
                            block_id: id.clone(),
                            mime,
                            data,
                        });
                    }
                }
            }
            Node::Leaf { id, content }
        }
    }
}
