use std::collections::HashMap;

use blockdoc::{BlockId, BlockNode, DraftNode, Node, NodePath};

use crate::error::DuplicateIdentifier;

/// Identifier state for a single compile.
///
/// Holds every caller-supplied identifier and the counter for generated
/// `block-<n>` identifiers. A fresh assigner is created per tree, so
/// independent compiles never share a counter.
#[derive(Debug)]
pub struct IdAssigner {
    /// Caller identifiers and the tree path where each was first seen.
    claimed: HashMap<BlockId, NodePath>,
    next: u64,
}

impl IdAssigner {
    /// Claim every caller-supplied identifier in `tree`, in pre-order.
    pub fn for_tree(tree: &DraftNode) -> Result<Self, DuplicateIdentifier> {
        let mut assigner = IdAssigner {
            claimed: HashMap::new(),
            next: 1,
        };
        assigner.claim(tree, NodePath::root())?;
        Ok(assigner)
    }

    fn claim(&mut self, node: &DraftNode, path: NodePath) -> Result<(), DuplicateIdentifier> {
        if let Some(id) = node.id() {
            if let Some(first) = self.claimed.get(id) {
                return Err(DuplicateIdentifier {
                    id: id.clone(),
                    first: first.clone(),
                    second: path,
                });
            }
            self.claimed.insert(id.clone(), path.clone());
        }
        for (index, child) in node.children().iter().enumerate() {
            self.claim(child, path.child(index))?;
        }
        Ok(())
    }

    pub fn is_claimed(&self, id: &BlockId) -> bool {
        self.claimed.contains_key(id)
    }

    /// The next generated identifier not claimed by the caller.
    pub fn next_id(&mut self) -> BlockId {
        loop {
            let id = BlockId::generated(self.next);
            self.next += 1;
            if !self.is_claimed(&id) {
                return id;
            }
        }
    }

    /// Give every node without an identifier the next generated one, in
    /// pre-order. Caller identifiers are kept as they are.
    pub fn assign(mut self, tree: DraftNode) -> BlockNode {
        self.assign_node(tree)
    }

    fn assign_node(&mut self, node: DraftNode) -> BlockNode {
        match node {
            Node::Group { id, children } => {
                let id = id.unwrap_or_else(|| self.next_id());
                let children = children
                    .into_iter()
                    .map(|child| self.assign_node(child))
                    .collect();
                Node::Group { id, children }
            }
            Node::Leaf { id, content } => {
                let id = id.unwrap_or_else(|| self.next_id());
                Node::Leaf { id, content }
            }
        }
    }
}

/// Assign identifiers to a normalized tree.
pub fn assign_ids(tree: DraftNode) -> Result<BlockNode, DuplicateIdentifier> {
    let assigner = IdAssigner::for_tree(&tree)?;
    Ok(assigner.assign(tree))
}
