pub mod content;
pub mod leaf;
pub mod reference;

use std::fmt;

use crate::block::leaf::LeafContent;

/// Identifier of a node in a compiled tree.
/// Either supplied by the caller or generated as `block-<n>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        BlockId(id.into())
    }

    /// The generated identifier for counter value `n`.
    pub fn generated(n: u64) -> Self {
        BlockId(format!("block-{}", n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(id: &str) -> Self {
        BlockId::new(id)
    }
}

impl From<String> for BlockId {
    fn from(id: String) -> Self {
        BlockId(id)
    }
}

/// Position as child indices from the top.
///
/// Normalization errors use it for the authored input; identifier errors use
/// it for the canonical tree, where a collapsed wrapper no longer counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    pub fn root() -> Self {
        NodePath(Vec::new())
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        NodePath(indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for index in &self.0 {
            write!(f, "/{}", index)?;
        }
        Ok(())
    }
}

/// A node of the canonical block tree.
///
/// `Id` is `Option<BlockId>` between normalization and identifier assignment
/// ([`DraftNode`]) and `BlockId` afterwards ([`BlockNode`]).
#[derive(Debug, Clone, PartialEq)]
pub enum Node<Id> {
    Group { id: Id, children: Vec<Node<Id>> },
    Leaf { id: Id, content: LeafContent },
}

/// A normalized tree whose nodes may still lack identifiers.
pub type DraftNode = Node<Option<BlockId>>;

/// A tree where every node carries its final identifier.
pub type BlockNode = Node<BlockId>;

impl<Id> Node<Id> {
    pub fn group(id: Id, children: Vec<Node<Id>>) -> Self {
        Node::Group { id, children }
    }

    pub fn leaf(id: Id, content: LeafContent) -> Self {
        Node::Leaf { id, content }
    }

    pub fn id(&self) -> &Id {
        match self {
            Node::Group { id, .. } => id,
            Node::Leaf { id, .. } => id,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Node::Group { .. })
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Children of a group; leaves have none.
    pub fn children(&self) -> &[Node<Id>] {
        match self {
            Node::Group { children, .. } => children,
            Node::Leaf { .. } => &[],
        }
    }

    pub fn content(&self) -> Option<&LeafContent> {
        match self {
            Node::Group { .. } => None,
            Node::Leaf { content, .. } => Some(content),
        }
    }

    /// Iterate over this node and all descendants in pre-order.
    pub fn preorder(&self) -> Preorder<'_, Id> {
        Preorder { stack: vec![self] }
    }

    /// Total number of nodes, this one included.
    pub fn node_count(&self) -> usize {
        self.preorder().count()
    }
}

impl BlockNode {
    /// All identifiers in pre-order.
    pub fn ids(&self) -> Vec<&BlockId> {
        self.preorder().map(|node| node.id()).collect()
    }

    /// Find a node by identifier.
    pub fn find(&self, id: &str) -> Option<&BlockNode> {
        self.preorder().find(|node| node.id().as_str() == id)
    }
}

/// Pre-order iterator over a block tree.
pub struct Preorder<'a, Id> {
    stack: Vec<&'a Node<Id>>,
}

impl<'a, Id> Iterator for Preorder<'a, Id> {
    type Item = &'a Node<Id>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}
