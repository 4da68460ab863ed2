//! Lazy repair: recompute center/radius/neighbor ordering for nodes queued
//! by insert or split.

use tracing::instrument;

use super::node::{NodeHandle, NodeKind};
use super::IhciTree;
use crate::store::VectorStore;

impl IhciTree {
    pub(super) fn enqueue_repair(&mut self, node: NodeHandle) {
        let already_queued = self.arena.get(node).in_repair_queue;
        if already_queued {
            return;
        }
        self.arena.get_mut(node).in_repair_queue = true;
        self.repair_queue.push_back(node);
    }

    /// Drains one node from the repair queue, recomputing its bounds and
    /// (for leaves) re-sorting its neighbor list. Returns `false` if the
    /// queue was already empty.
    #[instrument(level = "trace", skip(self, store))]
    pub fn repair_one(&mut self, store: &VectorStore) -> bool {
        let Some(node) = self.repair_queue.pop_front() else {
            return false;
        };
        self.arena.get_mut(node).in_repair_queue = false;
        self.recompute_bounds(store, node);

        if let Some(parent) = self.arena.get(node).parent {
            let child_center = self.arena.get(node).center.clone();
            let child_radius = self.arena.get(node).radius;
            let parent_center = self.arena.get(parent).center.clone();
            if !child_center.is_empty() && !parent_center.is_empty() {
                let needed = self.euclidean_distance(&parent_center, &child_center) + child_radius;
                if needed > self.arena.get(parent).radius {
                    self.arena.get_mut(parent).radius = needed;
                    self.enqueue_repair(parent);
                }
            }
        }

        true
    }

    /// Drains the entire repair queue.
    pub fn repair_all(&mut self, store: &VectorStore) {
        while self.repair_one(store) {}
    }

    fn recompute_bounds(&mut self, store: &VectorStore, node: NodeHandle) {
        let dims = self.dimensions();
        match self.arena.get(node).kind.clone() {
            NodeKind::Leaf { vectors, .. } => {
                if vectors.is_empty() {
                    return;
                }
                let mut center = vec![0.0_f32; dims];
                for &id in &vectors {
                    let v = store.get(id).expect("leaf holds a valid vector id");
                    for (c, x) in center.iter_mut().zip(v.iter()) {
                        *c += x;
                    }
                }
                for c in center.iter_mut() {
                    *c /= vectors.len() as f32;
                }
                let radius = vectors
                    .iter()
                    .map(|&id| {
                        let v = store.get(id).expect("leaf holds a valid vector id").to_vec();
                        self.euclidean_distance(&center, &v)
                    })
                    .fold(0.0_f32, f32::max);

                let node_mut = self.arena.get_mut(node);
                node_mut.center = center.clone();
                node_mut.radius = radius;

                self.resort_leaf_neighbors(node, &center);
            }
            NodeKind::Routing { children } => {
                if children.is_empty() {
                    return;
                }
                let mut center = vec![0.0_f32; dims];
                let mut weight_sum = 0.0_f32;
                for &h in &children {
                    let child = self.arena.get(h);
                    let weight = child.desc_count.max(1) as f32;
                    weight_sum += weight;
                    for (c, v) in center.iter_mut().zip(child.center.iter()) {
                        *c += v * weight;
                    }
                }
                if weight_sum > 0.0 {
                    for c in center.iter_mut() {
                        *c /= weight_sum;
                    }
                }
                let radius = children
                    .iter()
                    .map(|&h| {
                        let child = self.arena.get(h);
                        if child.center.is_empty() {
                            0.0
                        } else {
                            self.euclidean_distance(&center, &child.center) + child.radius
                        }
                    })
                    .fold(0.0_f32, f32::max);

                let node_mut = self.arena.get_mut(node);
                node_mut.center = center;
                node_mut.radius = radius;
                node_mut.desc_count = children.iter().map(|&h| self.arena.get(h).desc_count).sum();
            }
        }
    }

    /// Re-sorts a leaf's neighbor list by distance to its (just recomputed)
    /// center. Neighbor set membership is left untouched — only the split
    /// path (`split.rs`) adds or removes edges; repair only re-derives
    /// ordering, per design (no neighbor refresh during repair beyond this).
    fn resort_leaf_neighbors(&mut self, leaf: NodeHandle, center: &[f32]) {
        let neighbors = {
            let NodeKind::Leaf { neighbors, .. } = &self.arena.get(leaf).kind else {
                return;
            };
            neighbors.clone()
        };
        let mut with_dist: Vec<(NodeHandle, f32)> = neighbors
            .into_iter()
            .map(|h| {
                let other_center = self.arena.get(h).center.clone();
                let d = if other_center.is_empty() {
                    f32::INFINITY
                } else {
                    self.euclidean_distance(center, &other_center)
                };
                (h, d)
            })
            .collect();
        with_dist.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        if let NodeKind::Leaf { neighbors, neighbor_distances, .. } = &mut self.arena.get_mut(leaf).kind {
            *neighbors = with_dist.iter().map(|(h, _)| *h).collect();
            *neighbor_distances = with_dist.iter().map(|(_, d)| *d).collect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::IhciConfig;
    use super::*;
    use crate::metric::Metric;

    #[test]
    fn repair_one_is_idempotent_on_empty_queue() {
        let mut store = VectorStore::new(2).unwrap();
        let mut tree = IhciTree::new(2, Metric::SquaredEuclidean, IhciConfig::default());
        let id = store.append(&[0.0, 0.0]).unwrap();
        tree.insert(&store, id).unwrap();
        tree.repair_all(&store);
        assert!(!tree.repair_one(&store));
        assert!(!tree.repair_one(&store));
    }

    #[test]
    fn repair_establishes_sphere_containment() {
        let mut store = VectorStore::new(2).unwrap();
        let mut tree = IhciTree::new(2, Metric::SquaredEuclidean, IhciConfig::default());
        let ids = [
            store.append(&[0.0, 0.0]).unwrap(),
            store.append(&[3.0, 4.0]).unwrap(),
            store.append(&[-1.0, -1.0]).unwrap(),
        ];
        for id in ids {
            tree.insert(&store, id).unwrap();
        }
        tree.repair_all(&store);

        let root = tree.arena.get(tree.root);
        let center = root.center.clone();
        let radius = root.radius;
        for id in ids {
            let v = store.get(id).unwrap().to_vec();
            let d = tree.euclidean_distance(&center, &v);
            assert!(d <= radius + 1e-4, "vector outside sphere: {d} > {radius}");
        }
    }
}
