//! Shared edge-list and routing-proxy helpers used by insertion, BLAST
//! reorganization, and query.

use std::cmp::Ordering;

use super::node::{NodeHandle, NodeKind};
use super::BlastIndex;
use crate::bounded::bounded_sorted_insert;
use crate::store::VectorStore;

/// Min-heap entry: `Ord` is reversed so `BinaryHeap::pop` yields the smallest
/// distance first. Shared by the target-bucket descent and query traversal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct HeapEntry {
    pub(super) dist: f32,
    pub(super) node: NodeHandle,
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.dist.partial_cmp(&self.dist).unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl BlastIndex {
    pub(super) fn outgoing_mut(&mut self, node: NodeHandle) -> (&mut Vec<NodeHandle>, &mut Vec<f32>) {
        match &mut self.arena.get_mut(node).kind {
            NodeKind::Vector { outgoing_neighbors, outgoing_distances, .. }
            | NodeKind::Bucket { outgoing_neighbors, outgoing_distances, .. } => {
                (outgoing_neighbors, outgoing_distances)
            }
        }
    }

    pub(super) fn incoming_mut(&mut self, node: NodeHandle) -> &mut Vec<NodeHandle> {
        match &mut self.arena.get_mut(node).kind {
            NodeKind::Vector { incoming_neighbors, .. }
            | NodeKind::Bucket { incoming_neighbors, .. } => incoming_neighbors,
        }
    }

    pub(super) fn outgoing(&self, node: NodeHandle) -> (&[NodeHandle], &[f32]) {
        match &self.arena.get(node).kind {
            NodeKind::Vector { outgoing_neighbors, outgoing_distances, .. }
            | NodeKind::Bucket { outgoing_neighbors, outgoing_distances, .. } => {
                (outgoing_neighbors, outgoing_distances)
            }
        }
    }

    pub(super) fn incoming(&self, node: NodeHandle) -> &[NodeHandle] {
        match &self.arena.get(node).kind {
            NodeKind::Vector { incoming_neighbors, .. }
            | NodeKind::Bucket { incoming_neighbors, .. } => incoming_neighbors,
        }
    }

    /// Forms a bidirectional edge between `a` and `b` at the given distance:
    /// bounded-sorted-insert into both outgoing lists, append-if-absent into
    /// both incoming lists.
    pub(super) fn link_bidirectional(&mut self, a: NodeHandle, b: NodeHandle, dist: f32) {
        if a == b {
            return;
        }
        let cap = self.config.outgoing_neighbor_count;
        {
            let (out_n, out_d) = self.outgoing_mut(a);
            bounded_sorted_insert(out_n, out_d, cap, b, dist);
        }
        {
            let (out_n, out_d) = self.outgoing_mut(b);
            bounded_sorted_insert(out_n, out_d, cap, a, dist);
        }
        {
            let inc = self.incoming_mut(b);
            if !inc.contains(&a) {
                inc.push(a);
            }
        }
        {
            let inc = self.incoming_mut(a);
            if !inc.contains(&b) {
                inc.push(b);
            }
        }
    }

    /// Distance from `query` to a node's routing proxy: a vector node's own
    /// vector, or a bucket's representative. `None` if unavailable (an empty
    /// bucket has no representative yet).
    pub(super) fn proxy_distance(&self, store: &VectorStore, query: &[f32], node: NodeHandle) -> Option<f32> {
        let vector_id = match &self.arena.get(node).kind {
            NodeKind::Vector { vector_id, .. } => *vector_id,
            NodeKind::Bucket { representative, .. } => (*representative)?,
        };
        let v = store.get(vector_id).ok()?;
        Some(self.metric_distance(query, v))
    }

    pub(super) fn bump_heat(&mut self, node: NodeHandle) {
        let n = self.arena.get_mut(node);
        n.heat = n.heat.saturating_add(1);
    }
}
