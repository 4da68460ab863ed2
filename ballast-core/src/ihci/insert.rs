//! IHCI insertion: greedy descent, sphere-bound upkeep, and split triggering.

use tracing::{debug, instrument};

use super::node::{NodeHandle, NodeKind};
use super::IhciTree;
use crate::error::BallastError;
use crate::store::VectorStore;
use crate::vector_id::VectorId;

impl IhciTree {
    /// Inserts the vector identified by `vector_id` into the tree.
    ///
    /// `vector_id` must already exist in `store`. May trigger one or more
    /// leaf/routing splits and enqueues affected nodes for lazy repair.
    /// Amortizes repair draining across inserts per `repair_every_inserts`,
    /// with extra draining if the repair queue backs up past
    /// `repair_queue_high_watermark`.
    ///
    /// # Errors
    ///
    /// Returns [`BallastError::InvalidId`] if `vector_id` is the invalid
    /// sentinel or outside `store`'s range.
    #[instrument(level = "debug", skip(self, store), fields(vector_id = %vector_id))]
    pub fn insert(&mut self, store: &VectorStore, vector_id: VectorId) -> Result<VectorId, BallastError> {
        let v = store.get(vector_id)?.to_vec();

        let path = self.descend_path(&v);
        let leaf = *path
            .last()
            .expect("descent path always contains at least the root");

        self.append_to_leaf(leaf, vector_id, &path);
        self.inflate_leaf_radius(leaf, &v);
        self.propagate_radius_upward(&path);

        let overflowed = {
            let node = self.arena.get(leaf);
            match &node.kind {
                NodeKind::Leaf { vectors, .. } => vectors.len() > self.config.leaf_capacity,
                NodeKind::Routing { .. } => unreachable!("descent always ends at a leaf"),
            }
        };

        if overflowed {
            debug!(node = leaf.0, "leaf overflowed, splitting");
            self.split_leaf(store, leaf);
        } else {
            self.enqueue_repair(leaf);
        }

        self.inserts_since_repair += 1;
        if self.inserts_since_repair >= self.config.repair_every_inserts {
            self.inserts_since_repair = 0;
            self.repair_one(store);
        }
        if self.repair_queue.len() > self.config.repair_queue_high_watermark {
            tracing::warn!(
                queue_len = self.repair_queue.len(),
                "repair queue over high watermark, draining extra"
            );
            self.repair_one(store);
        }

        self.len += 1;
        Ok(vector_id)
    }

    /// Greedy descent from the root to a leaf, returning the full path
    /// (root first, leaf last).
    pub(super) fn descend_path(&self, v: &[f32]) -> Vec<NodeHandle> {
        let mut path = vec![self.root];
        loop {
            let current = *path.last().expect("path is never empty");
            let node = self.arena.get(current);
            match &node.kind {
                NodeKind::Leaf { .. } => return path,
                NodeKind::Routing { children } => {
                    let mut best = None;
                    let mut best_dist = f32::INFINITY;
                    for &child in children {
                        let child_center = &self.arena.get(child).center;
                        if child_center.is_empty() {
                            continue;
                        }
                        let d = self.metric_distance(child_center, v);
                        if d < best_dist {
                            best_dist = d;
                            best = Some(child);
                        }
                    }
                    let next = best.unwrap_or(children[0]);
                    path.push(next);
                }
            }
        }
    }

    fn append_to_leaf(&mut self, leaf: NodeHandle, id: VectorId, path: &[NodeHandle]) {
        let node = self.arena.get_mut(leaf);
        if let NodeKind::Leaf { vectors, .. } = &mut node.kind {
            vectors.push(id);
        }
        for &handle in path {
            self.arena.get_mut(handle).desc_count += 1;
        }
    }

    fn inflate_leaf_radius(&mut self, leaf: NodeHandle, v: &[f32]) {
        let center = self.arena.get(leaf).center.clone();
        if center.is_empty() {
            return;
        }
        let d = self.euclidean_distance(&center, v);
        let node = self.arena.get_mut(leaf);
        if d > node.radius {
            node.radius = d;
        }
    }

    /// Walks `path` from the leaf upward, inflating each ancestor's radius
    /// to keep containing its child's sphere. Stops at the first ancestor
    /// that already contains the child without modification.
    pub(super) fn propagate_radius_upward(&mut self, path: &[NodeHandle]) {
        for i in (1..path.len()).rev() {
            let child = path[i];
            let parent = path[i - 1];

            let child_center = self.arena.get(child).center.clone();
            let child_radius = self.arena.get(child).radius;
            let parent_center = self.arena.get(parent).center.clone();

            if child_center.is_empty() || parent_center.is_empty() {
                continue;
            }

            let needed = self.euclidean_distance(&parent_center, &child_center) + child_radius;
            let parent_node = self.arena.get_mut(parent);
            if needed > parent_node.radius {
                parent_node.radius = needed;
                self.enqueue_repair(parent);
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::IhciConfig;
    use super::*;
    use crate::metric::Metric;

    #[test]
    fn insert_grows_desc_count_along_path() {
        let mut store = VectorStore::new(2).unwrap();
        let mut tree = IhciTree::new(2, Metric::SquaredEuclidean, IhciConfig::default());
        let a = store.append(&[0.0, 0.0]).unwrap();
        let b = store.append(&[1.0, 1.0]).unwrap();
        tree.insert(&store, a).unwrap();
        tree.insert(&store, b).unwrap();
        assert_eq!(tree.arena.get(tree.root).desc_count, 2);
    }

    #[test]
    fn insert_rejects_invalid_id() {
        let store = VectorStore::new(3).unwrap();
        let mut tree = IhciTree::new(3, Metric::SquaredEuclidean, IhciConfig::default());
        let err = tree.insert(&store, VectorId::INVALID).unwrap_err();
        assert!(matches!(err, BallastError::InvalidId { .. }));
    }

    #[test]
    fn overflowing_leaf_capacity_triggers_a_split() {
        let config = IhciConfig {
            leaf_capacity: 2,
            routing_max_children: 4,
            leaf_neighbor_count: 2,
            repair_every_inserts: 1,
            repair_queue_high_watermark: 8,
        };
        let mut store = VectorStore::new(2).unwrap();
        let mut tree = IhciTree::new(2, Metric::SquaredEuclidean, config);
        let a = store.append(&[0.0, 0.0]).unwrap();
        let b = store.append(&[10.0, 10.0]).unwrap();
        let c = store.append(&[5.0, 5.0]).unwrap();
        tree.insert(&store, a).unwrap();
        tree.insert(&store, b).unwrap();
        let before = tree.node_count();
        tree.insert(&store, c).unwrap();
        assert!(tree.node_count() > before);
    }
}
