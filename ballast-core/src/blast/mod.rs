//! BLAST Index — a graph-first hierarchical index.
//!
//! Vectors attach to buckets chosen by a priority-ordered descent over a
//! bucket/vector graph (not a strict tree: buckets and vectors both carry
//! bounded outgoing neighbor edges, explored alongside parent/child links).
//! The only structural mutation is "BLAST": when a bucket overflows
//! `bucket_capacity`, a hot epicenter among its children is chosen and a
//! sibling bucket is carved out for the subset of children that strictly
//! improve their distance to the new bucket's representative. Everything
//! else — insertion target selection, sliding-window neighbor linking,
//! querying — rides the same graph.

mod blast;
mod config;
mod edges;
mod insert;
mod node;
mod query;
mod trace;

pub use config::BlastConfig;
pub use node::NodeHandle;
pub use trace::{TraceEvent, TraceReason};

use node::{Arena, BlastNode};
#[cfg(test)]
use node::NodeKind;

use crate::error::BallastError;
use crate::metric::Metric;
#[cfg(test)]
use crate::store::VectorStore;
use crate::vector_id::VectorId;

/// A graph-first hierarchical approximate-nearest-neighbor index over dense
/// float vectors.
///
/// Holds no [`VectorStore`] of its own: the store is owned by the caller and
/// passed by reference into every operation that needs to read a vector's
/// contents, so the same store can back a [`BlastIndex`] and a
/// [`super::IhciTree`] (or several indices) over one shared id space without
/// either index ever holding the store hostage.
#[derive(Debug)]
pub struct BlastIndex {
    pub(crate) dimensions: usize,
    pub(crate) metric: Metric,
    pub(crate) config: BlastConfig,
    pub(crate) arena: Arena,
    pub(crate) root: NodeHandle,
    pub(crate) len: usize,
}

impl BlastIndex {
    /// Creates an empty index over `dimensions`-dimensional vectors.
    ///
    /// `dimensions` should match the [`VectorStore`](crate::store::VectorStore)
    /// this index will be queried and inserted against; nothing here
    /// validates that agreement until the first store access.
    #[must_use]
    pub fn new(dimensions: usize, metric: Metric, config: BlastConfig) -> Self {
        let mut arena = Arena::new();
        let root = arena.push(BlastNode::new_bucket(None, 0));
        Self {
            dimensions,
            metric,
            config,
            arena,
            root,
            len: 0,
        }
    }

    /// Number of vectors inserted into this index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the index holds no vectors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Dimension every vector in this index shares.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of arena slots allocated so far (nodes are never freed, so this
    /// only ever grows).
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    pub(crate) fn metric_distance(&self, a: &[f32], b: &[f32]) -> f32 {
        self.metric
            .distance(a, b)
            .expect("internal distance call with mismatched dimensions")
    }

    /// Hierarchical dotted path to `node`, for diagnostic traces. Built
    /// lazily by walking `index_in_parent` up to the root; never cached.
    pub(crate) fn node_path(&self, node: NodeHandle) -> String {
        let mut segments = Vec::new();
        let mut current = node;
        loop {
            let n = self.arena.get(current);
            segments.push(n.index_in_parent.to_string());
            match n.parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        segments.reverse();
        segments.join("/")
    }
}
