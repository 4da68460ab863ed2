//! Arena-allocated IHCI tree nodes.
//!
//! Nodes never hold owning references to each other: a parent points at its
//! children, and a child points back at its parent, through [`NodeHandle`]
//! indices into the tree's [`Arena`]. This sidesteps the back-pointer/cycle
//! problem a safe-Rust tree would otherwise run into, the same way an HNSW
//! graph addresses nodes by id into a flat record space instead of by
//! pointer.

/// Index into an [`Arena`]. Arena slots are never freed or reused in this
/// index, so a handle remains valid for the tree's entire lifetime once
/// issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(pub(crate) usize);

/// Variant-specific node data.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// A leaf holding member vectors directly.
    Leaf {
        /// Member vector ids, in insertion order.
        vectors: Vec<crate::vector_id::VectorId>,
        /// Bounded neighbor-graph edges to other leaves, ascending by distance.
        neighbors: Vec<NodeHandle>,
        /// Distances parallel to `neighbors`.
        neighbor_distances: Vec<f32>,
        /// Set once this leaf has been replaced by a split; a disposed leaf
        /// must never be queried or mutated again.
        disposed: bool,
    },
    /// An internal routing node holding child handles.
    Routing {
        /// Child node handles, in no particular order.
        children: Vec<NodeHandle>,
    },
}

/// A single IHCI tree node: the fields common to leaves and routing nodes,
/// plus the variant-specific payload in `kind`.
#[derive(Debug, Clone)]
pub struct IhciNode {
    /// Owning routing node, or `None` for the root.
    pub parent: Option<NodeHandle>,
    /// This node's index in `parent`'s children list.
    pub index_in_parent: usize,
    /// Representative point: mean of member vectors (leaf) or child centers
    /// weighted by descendant count (routing). Empty until first repair.
    pub center: Vec<f32>,
    /// Upper bound such that every descendant vector lies within `radius` of
    /// `center` (true Euclidean distance, not squared).
    pub radius: f32,
    /// Count of vectors reachable from this subtree.
    pub desc_count: usize,
    /// Dedup flag: true while this node has a pending entry in the repair queue.
    pub in_repair_queue: bool,
    /// Variant-specific payload.
    pub kind: NodeKind,
}

impl IhciNode {
    pub(crate) fn new_leaf(parent: Option<NodeHandle>, index_in_parent: usize) -> Self {
        Self {
            parent,
            index_in_parent,
            center: Vec::new(),
            radius: 0.0,
            desc_count: 0,
            in_repair_queue: false,
            kind: NodeKind::Leaf {
                vectors: Vec::new(),
                neighbors: Vec::new(),
                neighbor_distances: Vec::new(),
                disposed: false,
            },
        }
    }

    pub(crate) fn new_routing(parent: Option<NodeHandle>, index_in_parent: usize) -> Self {
        Self {
            parent,
            index_in_parent,
            center: Vec::new(),
            radius: 0.0,
            desc_count: 0,
            in_repair_queue: false,
            kind: NodeKind::Routing {
                children: Vec::new(),
            },
        }
    }

    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    pub(crate) fn is_disposed(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { disposed: true, .. })
    }
}

/// Slab of IHCI nodes, indexed by [`NodeHandle`]. Slots are appended only —
/// nothing is ever freed or recycled.
#[derive(Debug, Clone, Default)]
pub struct Arena {
    nodes: Vec<IhciNode>,
}

impl Arena {
    pub(crate) fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub(crate) fn push(&mut self, node: IhciNode) -> NodeHandle {
        let handle = NodeHandle(self.nodes.len());
        self.nodes.push(node);
        handle
    }

    pub(crate) fn get(&self, handle: NodeHandle) -> &IhciNode {
        &self.nodes[handle.0]
    }

    pub(crate) fn get_mut(&mut self, handle: NodeHandle) -> &mut IhciNode {
        &mut self.nodes[handle.0]
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }
}
