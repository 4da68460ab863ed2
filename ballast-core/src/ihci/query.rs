//! IHCI top-K query: multi-candidate descent with sphere pruning, neighbor-
//! graph refinement, and a bounded scan phase.

use std::collections::HashSet;

use tracing::instrument;

use super::node::{NodeHandle, NodeKind};
use super::IhciTree;
use crate::bounded::TopK;
use crate::error::BallastError;
use crate::store::VectorStore;
use crate::vector_id::VectorId;

impl IhciTree {
    /// Returns the `k` vectors nearest `query`, ascending by distance (ties
    /// broken by ascending id).
    ///
    /// `routing_width` controls how many candidate subtrees are kept alive
    /// at each level of the descent; wider keeps more candidates (higher
    /// recall, more work).
    ///
    /// # Errors
    ///
    /// Returns [`BallastError::InvalidArgument`] if `k == 0` or
    /// `routing_width == 0`, or [`BallastError::DimensionMismatch`] if
    /// `query.len()` does not match the tree's dimension.
    #[instrument(level = "debug", skip(self, store, query), fields(k, routing_width))]
    pub fn query(
        &self,
        store: &VectorStore,
        query: &[f32],
        k: usize,
        routing_width: usize,
    ) -> Result<Vec<(VectorId, f32)>, BallastError> {
        if k == 0 {
            return Err(BallastError::invalid_argument("k must be positive"));
        }
        if routing_width == 0 {
            return Err(BallastError::invalid_argument(
                "routing_width must be at least 1",
            ));
        }
        if query.len() != self.dimensions() {
            return Err(BallastError::DimensionMismatch {
                expected: self.dimensions(),
                actual: query.len(),
            });
        }

        let mut best = TopK::new(k);

        let candidate_leaves = self.descend_candidates(query, routing_width, &best);
        let refined = self.refine_via_neighbor_graph(query, &candidate_leaves, routing_width);
        self.scan_candidates(store, query, &refined, &mut best);

        Ok(best.into_sorted_vec())
    }

    fn worst_euclidean(&self, best: &TopK) -> f32 {
        match self.metric {
            crate::metric::Metric::SquaredEuclidean => best.worst_distance().sqrt(),
            crate::metric::Metric::Cosine => best.worst_distance(),
        }
    }

    /// Beam-search descent, pruning routing children against the sphere
    /// bound. Returns the leaves that survive to the bottom.
    fn descend_candidates(&self, query: &[f32], routing_width: usize, best: &TopK) -> Vec<NodeHandle> {
        let mut frontier = vec![self.root];

        loop {
            let (leaves, routings): (Vec<_>, Vec<_>) = frontier
                .iter()
                .partition(|&&h| self.arena.get(h).is_leaf());

            if routings.is_empty() {
                return leaves;
            }

            let mut pool: Vec<(NodeHandle, f32)> = Vec::new();
            for &r in &routings {
                let NodeKind::Routing { children } = &self.arena.get(r).kind else {
                    unreachable!();
                };
                for &child in children {
                    let child_node = self.arena.get(child);
                    if child_node.center.is_empty() {
                        pool.push((child, 0.0));
                        continue;
                    }
                    let dist = self.euclidean_distance(query, &child_node.center);
                    if best.has_worst() {
                        let worst = self.worst_euclidean(best);
                        if dist - child_node.radius > worst {
                            continue;
                        }
                    }
                    pool.push((child, dist));
                }
            }

            pool.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
            pool.truncate(routing_width);

            frontier = leaves.into_iter().chain(pool.into_iter().map(|(h, _)| h)).collect();

            if frontier.is_empty() {
                return Vec::new();
            }
        }
    }

    /// Greedily walks the leaf-neighbor graph from each candidate leaf,
    /// moving to a neighbor whenever it is strictly closer to `query` than
    /// the current leaf. Returns the union of every walk's endpoints, capped
    /// at `routing_width * 4`.
    fn refine_via_neighbor_graph(
        &self,
        query: &[f32],
        candidates: &[NodeHandle],
        routing_width: usize,
    ) -> Vec<NodeHandle> {
        let cap = routing_width.saturating_mul(4);
        let mut visited = HashSet::new();
        let mut result = Vec::new();

        for &start in candidates {
            let mut current = start;
            let mut current_dist = {
                let center = &self.arena.get(current).center;
                if center.is_empty() {
                    f32::INFINITY
                } else {
                    self.euclidean_distance(query, center)
                }
            };

            loop {
                let NodeKind::Leaf { neighbors, .. } = &self.arena.get(current).kind else {
                    break;
                };
                let mut moved = false;
                for &neighbor in neighbors {
                    if visited.contains(&neighbor) {
                        continue;
                    }
                    let neighbor_center = &self.arena.get(neighbor).center;
                    if neighbor_center.is_empty() {
                        continue;
                    }
                    let d = self.euclidean_distance(query, neighbor_center);
                    if d < current_dist {
                        current = neighbor;
                        current_dist = d;
                        moved = true;
                        break;
                    }
                }
                if !moved {
                    break;
                }
            }

            if visited.insert(current) {
                result.push(current);
                if result.len() >= cap {
                    break;
                }
            }
        }

        result
    }

    fn scan_candidates(&self, store: &VectorStore, query: &[f32], leaves: &[NodeHandle], best: &mut TopK) {
        let mut visited: HashSet<NodeHandle> = HashSet::new();
        let mut queue: Vec<NodeHandle> = leaves.to_vec();

        while let Some(leaf) = queue.pop() {
            if !visited.insert(leaf) {
                continue;
            }
            let node = self.arena.get(leaf);
            if node.is_disposed() {
                continue;
            }

            if !node.center.is_empty() && best.has_worst() {
                let dist = self.euclidean_distance(query, &node.center);
                let worst = self.worst_euclidean(best);
                if dist - node.radius > worst {
                    continue;
                }
            }

            let NodeKind::Leaf { vectors, neighbors, .. } = &node.kind else {
                continue;
            };

            for &id in vectors {
                let Ok(v) = store.get(id) else { continue };
                let Ok(dist) = self.metric.distance(query, v) else {
                    continue;
                };
                best.add(id, dist);
            }

            for &neighbor in neighbors {
                if !visited.contains(&neighbor) {
                    queue.push(neighbor);
                }
            }
        }
    }
}
