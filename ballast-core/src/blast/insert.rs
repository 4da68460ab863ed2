//! BLAST insertion: priority-ordered target-bucket descent, sliding-window
//! neighbor linking, and overflow-triggered reorganization.

use std::collections::{BinaryHeap, HashSet};

use tracing::{debug, instrument};

use super::edges::HeapEntry;
use super::node::{NodeHandle, NodeKind};
use super::BlastIndex;
use crate::error::BallastError;
use crate::store::VectorStore;
use crate::vector_id::VectorId;

impl BlastIndex {
    /// Inserts the vector identified by `vector_id` into the index.
    ///
    /// `vector_id` must already exist in `store`. May trigger a BLAST
    /// reorganization of the target bucket.
    ///
    /// # Errors
    ///
    /// Returns [`BallastError::InvalidId`] if `vector_id` is the invalid
    /// sentinel or outside `store`'s range.
    #[instrument(level = "debug", skip(self, store), fields(vector_id = %vector_id))]
    pub fn insert(&mut self, store: &VectorStore, vector_id: VectorId) -> Result<VectorId, BallastError> {
        let v = store.get(vector_id)?.to_vec();

        let (target, window) = self.find_target_bucket(store, &v);

        let index_in_parent = match &self.arena.get(target).kind {
            NodeKind::Bucket { children, .. } => children.len(),
            NodeKind::Vector { .. } => unreachable!("find_target_bucket always returns a bucket"),
        };
        let new_handle = self.arena.push(super::node::BlastNode::new_vector(
            Some(target),
            index_in_parent,
            vector_id,
        ));
        if let NodeKind::Bucket { children, representative, .. } = &mut self.arena.get_mut(target).kind {
            children.push(new_handle);
            if representative.is_none() {
                *representative = Some(vector_id);
            }
        }

        self.link_window(store, new_handle, &v, &window);

        let overflowed = match &self.arena.get(target).kind {
            NodeKind::Bucket { children, .. } => children.len() > self.config.bucket_capacity,
            NodeKind::Vector { .. } => false,
        };
        if overflowed {
            debug!(node = target.0, "bucket overflowed, BLASTing");
            self.blast_reorganize(store, target);
        }

        Ok(vector_id)
    }

    /// Priority-ordered descent from the root: explores bucket children,
    /// outgoing edges, and incoming back-references by ascending proxy
    /// distance to `v`. Stops at the first vector node popped (its parent is
    /// the target) or, failing that, falls back to the last bucket seen or
    /// the root. Returns the target bucket plus up to `window_size` buckets
    /// encountered along the way, for sliding-window neighbor linking.
    pub(super) fn find_target_bucket(&mut self, store: &VectorStore, v: &[f32]) -> (NodeHandle, Vec<NodeHandle>) {
        let mut heap = BinaryHeap::new();
        let root_dist = self.proxy_distance(store, v, self.root).unwrap_or(f32::INFINITY);
        heap.push(HeapEntry { dist: root_dist, node: self.root });

        let mut visited: HashSet<NodeHandle> = HashSet::new();
        let mut window: Vec<NodeHandle> = Vec::new();
        let mut last_bucket_seen: Option<NodeHandle> = None;
        let mut target: Option<NodeHandle> = None;

        while let Some(HeapEntry { node, .. }) = heap.pop() {
            if !visited.insert(node) {
                continue;
            }
            self.bump_heat(node);

            if !self.arena.get(node).is_bucket() {
                let parent = self.arena.get(node).parent;
                target = Some(parent.unwrap_or_else(|| last_bucket_seen.unwrap_or(self.root)));
                break;
            }

            last_bucket_seen = Some(node);
            if window.len() < self.config.window_size {
                window.push(node);
            }

            let mut to_push: Vec<NodeHandle> = Vec::new();
            if let NodeKind::Bucket { children, .. } = &self.arena.get(node).kind {
                to_push.extend(children.iter().copied());
            }
            let (out_n, _) = self.outgoing(node);
            to_push.extend(out_n.iter().copied());
            to_push.extend(self.incoming(node).iter().copied());

            for candidate in to_push {
                if visited.contains(&candidate) {
                    continue;
                }
                let d = self.proxy_distance(store, v, candidate).unwrap_or(f32::INFINITY);
                heap.push(HeapEntry { dist: d, node: candidate });
            }
        }

        let target = target.unwrap_or_else(|| last_bucket_seen.unwrap_or(self.root));
        (target, window)
    }

    /// Links the new vector node bidirectionally to every child of every
    /// bucket in the descent window, excluding itself.
    fn link_window(&mut self, store: &VectorStore, new_handle: NodeHandle, v: &[f32], window: &[NodeHandle]) {
        let mut candidates: Vec<NodeHandle> = Vec::new();
        for &bucket in window {
            if let NodeKind::Bucket { children, .. } = &self.arena.get(bucket).kind {
                candidates.extend(children.iter().copied().filter(|&c| c != new_handle));
            }
        }

        for candidate in candidates {
            if let Some(d) = self.proxy_distance(store, v, candidate) {
                self.link_bidirectional(new_handle, candidate, d);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::BlastConfig;
    use super::*;
    use crate::metric::Metric;

    #[test]
    fn first_insert_becomes_roots_representative() {
        let mut store = VectorStore::new(2).unwrap();
        let mut index = BlastIndex::new(2, Metric::SquaredEuclidean, BlastConfig::default());
        let id = store.append(&[1.0, 2.0]).unwrap();
        index.insert(&store, id).unwrap();
        let NodeKind::Bucket { representative, children, .. } = &index.arena.get(index.root).kind else {
            panic!("root must be a bucket");
        };
        assert!(representative.is_some());
        assert_eq!(children.len(), 1);
    }

    #[test]
    fn insert_rejects_invalid_id() {
        let store = VectorStore::new(3).unwrap();
        let mut index = BlastIndex::new(3, Metric::SquaredEuclidean, BlastConfig::default());
        let err = index.insert(&store, VectorId::INVALID).unwrap_err();
        assert!(matches!(err, BallastError::InvalidId { .. }));
    }

    #[test]
    fn nearby_inserts_end_up_bidirectionally_linked() {
        let mut store = VectorStore::new(2).unwrap();
        let mut index = BlastIndex::new(2, Metric::SquaredEuclidean, BlastConfig::default());
        let a_id = store.append(&[0.0, 0.0]).unwrap();
        let b_id = store.append(&[0.01, 0.0]).unwrap();
        let a = index.insert(&store, a_id).unwrap();
        let b = index.insert(&store, b_id).unwrap();

        let a_handle = index
            .arena
            .get(index.root)
            .kind
            .clone();
        let NodeKind::Bucket { children, .. } = a_handle else {
            panic!("root must be a bucket");
        };

        let find = |id: crate::vector_id::VectorId| -> NodeHandle {
            *children
                .iter()
                .find(|&&h| matches!(&index.arena.get(h).kind, NodeKind::Vector { vector_id, .. } if *vector_id == id))
                .unwrap()
        };
        let (a_h, b_h) = (find(a), find(b));
        let (a_out, _) = index.outgoing(a_h);
        assert!(a_out.contains(&b_h));
        let (b_out, _) = index.outgoing(b_h);
        assert!(b_out.contains(&a_h));
    }

    #[test]
    fn overflowing_bucket_capacity_triggers_a_blast() {
        let config = BlastConfig {
            bucket_capacity: 4,
            outgoing_neighbor_count: 4,
            neighbor_hops: 2,
            window_size: 4,
        };
        let mut store = VectorStore::new(2).unwrap();
        let mut index = BlastIndex::new(2, Metric::SquaredEuclidean, config);
        for i in 0..6 {
            let id = store.append(&[i as f32, 0.0]).unwrap();
            index.insert(&store, id).unwrap();
        }
        assert!(index.node_count() > 7);
    }
}
