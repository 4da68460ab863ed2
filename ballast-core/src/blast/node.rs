//! Arena-allocated, tagged-union nodes for the BLAST index.
//!
//! Mirrors the IHCI arena's discipline: nodes address each other through
//! [`NodeHandle`] indices into a flat, append-only [`Arena`], never by
//! pointer, and a slot once allocated is never freed or reused.

use crate::vector_id::VectorId;

/// Index into an [`Arena`]. Stable for the lifetime of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(pub(crate) usize);

/// Variant-specific node data.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// A single stored vector.
    Vector {
        /// The vector this node represents.
        vector_id: VectorId,
        /// Bounded neighbor-edge list, ascending by distance.
        outgoing_neighbors: Vec<NodeHandle>,
        /// Distances parallel to `outgoing_neighbors`.
        outgoing_distances: Vec<f32>,
        /// Unbounded back-references: nodes that hold an outgoing edge to
        /// this one.
        incoming_neighbors: Vec<NodeHandle>,
    },
    /// A bucket of children, either vectors or sibling buckets produced by a
    /// prior BLAST reorganization.
    Bucket {
        /// Sample vector used as the bucket's distance proxy during routing.
        /// `None` only for an empty bucket.
        representative: Option<VectorId>,
        /// Child node handles, in no particular order.
        children: Vec<NodeHandle>,
        /// Bounded neighbor-edge list, ascending by distance.
        outgoing_neighbors: Vec<NodeHandle>,
        /// Distances parallel to `outgoing_neighbors`.
        outgoing_distances: Vec<f32>,
        /// Unbounded back-references: nodes that hold an outgoing edge to
        /// this one.
        incoming_neighbors: Vec<NodeHandle>,
    },
}

/// A single BLAST node: fields common to vectors and buckets, plus the
/// variant-specific payload in `kind`.
#[derive(Debug, Clone)]
pub struct BlastNode {
    /// Owning bucket, or `None` for the root.
    pub parent: Option<NodeHandle>,
    /// This node's index in `parent`'s children list.
    pub index_in_parent: usize,
    /// Saturating insert/visit counter driving BLAST epicenter selection.
    pub heat: u32,
    /// Variant-specific payload.
    pub kind: NodeKind,
}

impl BlastNode {
    pub(crate) fn new_bucket(parent: Option<NodeHandle>, index_in_parent: usize) -> Self {
        Self {
            parent,
            index_in_parent,
            heat: 0,
            kind: NodeKind::Bucket {
                representative: None,
                children: Vec::new(),
                outgoing_neighbors: Vec::new(),
                outgoing_distances: Vec::new(),
                incoming_neighbors: Vec::new(),
            },
        }
    }

    pub(crate) fn new_vector(
        parent: Option<NodeHandle>,
        index_in_parent: usize,
        vector_id: VectorId,
    ) -> Self {
        Self {
            parent,
            index_in_parent,
            heat: 0,
            kind: NodeKind::Vector {
                vector_id,
                outgoing_neighbors: Vec::new(),
                outgoing_distances: Vec::new(),
                incoming_neighbors: Vec::new(),
            },
        }
    }

    pub(crate) fn is_bucket(&self) -> bool {
        matches!(self.kind, NodeKind::Bucket { .. })
    }
}

/// Slab arena for [`BlastNode`]s. Append-only, matching the IHCI arena.
#[derive(Debug, Clone, Default)]
pub struct Arena {
    nodes: Vec<BlastNode>,
}

impl Arena {
    pub(crate) fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub(crate) fn push(&mut self, node: BlastNode) -> NodeHandle {
        let handle = NodeHandle(self.nodes.len());
        self.nodes.push(node);
        handle
    }

    pub(crate) fn get(&self, handle: NodeHandle) -> &BlastNode {
        &self.nodes[handle.0]
    }

    pub(crate) fn get_mut(&mut self, handle: NodeHandle) -> &mut BlastNode {
        &mut self.nodes[handle.0]
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_handles_are_stable_across_pushes() {
        let mut arena = Arena::new();
        let a = arena.push(BlastNode::new_bucket(None, 0));
        let b = arena.push(BlastNode::new_vector(Some(a), 0, VectorId::new(0)));
        assert!(arena.get(a).is_bucket());
        assert!(!arena.get(b).is_bucket());
    }
}
