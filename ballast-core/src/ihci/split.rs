//! Farthest-pair splitting, shared in spirit (not in code, since leaves and
//! routing nodes carry different payloads) between leaf and routing-node
//! overflow.

use tracing::{debug, instrument};

use super::node::{IhciNode, NodeHandle, NodeKind};
use super::IhciTree;
use crate::bounded::bounded_sorted_insert;
use crate::store::VectorStore;

impl IhciTree {
    /// Splits an overflowing leaf into two leaves using the farthest-pair
    /// heuristic, rewires the leaf-neighbor graph, and integrates the
    /// successors into the parent (recursing into a routing split if the
    /// parent now overflows).
    #[instrument(level = "debug", skip(self, store))]
    pub(super) fn split_leaf(&mut self, store: &VectorStore, leaf: NodeHandle) {
        let (ids, center) = {
            let node = self.arena.get(leaf);
            let NodeKind::Leaf { vectors, .. } = &node.kind else {
                unreachable!("split_leaf called on a non-leaf node");
            };
            (vectors.clone(), node.center.clone())
        };

        let points: Vec<Vec<f32>> = ids
            .iter()
            .map(|&id| store.get(id).expect("leaf holds a valid vector id").to_vec())
            .collect();

        let reference = if center.is_empty() { &points[0] } else { &center };
        let (seed_a, seed_b, split_distance) = self.farthest_pair(&points, reference);

        let mut left_ids = Vec::new();
        let mut left_points = Vec::new();
        let mut right_ids = Vec::new();
        let mut right_points = Vec::new();

        for (i, point) in points.iter().enumerate() {
            let d_a = self.euclidean_distance(point, &points[seed_a]);
            let d_b = self.euclidean_distance(point, &points[seed_b]);
            if d_a <= d_b {
                left_ids.push(ids[i]);
                left_points.push(point.clone());
            } else {
                right_ids.push(ids[i]);
                right_points.push(point.clone());
            }
        }

        if left_ids.is_empty() || right_ids.is_empty() {
            debug!(node = leaf.0, "farthest-pair split degenerate, falling back to midpoint");
            let mid = ids.len() / 2;
            left_ids = ids[..mid].to_vec();
            left_points = points[..mid].to_vec();
            right_ids = ids[mid..].to_vec();
            right_points = points[mid..].to_vec();
        }

        let left_center = mean_point(&left_points, self.dimensions());
        let right_center = mean_point(&right_points, self.dimensions());
        let left_radius = left_points
            .iter()
            .map(|p| self.euclidean_distance(&left_center, p))
            .fold(0.0_f32, f32::max);
        let right_radius = right_points
            .iter()
            .map(|p| self.euclidean_distance(&right_center, p))
            .fold(0.0_f32, f32::max);

        let parent = self.arena.get(leaf).parent;

        let mut left_node = IhciNode::new_leaf(parent, 0);
        left_node.center = left_center.clone();
        left_node.radius = left_radius;
        left_node.desc_count = left_ids.len();
        let left_kind = &mut left_node.kind;
        if let NodeKind::Leaf { vectors, .. } = left_kind {
            *vectors = left_ids;
        }

        let mut right_node = IhciNode::new_leaf(parent, 0);
        right_node.center = right_center.clone();
        right_node.radius = right_radius;
        right_node.desc_count = right_ids.len();
        if let NodeKind::Leaf { vectors, .. } = &mut right_node.kind {
            *vectors = right_ids;
        }

        let new_left = self.arena.push(left_node);
        let new_right = self.arena.push(right_node);

        self.rewire_leaf_neighbors(leaf, new_left, new_right, split_distance);

        if let NodeKind::Leaf { disposed, .. } = &mut self.arena.get_mut(leaf).kind {
            *disposed = true;
        }

        self.integrate_split(leaf, new_left, new_right);

        self.enqueue_repair(new_left);
        self.enqueue_repair(new_right);
    }

    /// Splits an overflowing routing node into two routing nodes, using the
    /// same farthest-pair heuristic over child centers.
    #[instrument(level = "debug", skip(self))]
    pub(super) fn split_routing(&mut self, routing: NodeHandle) {
        let (children, center) = {
            let node = self.arena.get(routing);
            let NodeKind::Routing { children } = &node.kind else {
                unreachable!("split_routing called on a non-routing node");
            };
            (children.clone(), node.center.clone())
        };

        let points: Vec<Vec<f32>> = children
            .iter()
            .map(|&h| self.arena.get(h).center.clone())
            .collect();

        let reference = if center.is_empty() { &points[0] } else { &center };
        let (seed_a, seed_b, split_distance) = self.farthest_pair(&points, reference);

        let mut left_children = Vec::new();
        let mut right_children = Vec::new();

        for (i, point) in points.iter().enumerate() {
            let d_a = self.euclidean_distance(point, &points[seed_a]);
            let d_b = self.euclidean_distance(point, &points[seed_b]);
            if d_a <= d_b {
                left_children.push(children[i]);
            } else {
                right_children.push(children[i]);
            }
        }

        if left_children.is_empty() || right_children.is_empty() {
            let mid = children.len() / 2;
            left_children = children[..mid].to_vec();
            right_children = children[mid..].to_vec();
        }

        let parent = self.arena.get(routing).parent;

        let (left_center, left_radius, left_desc) = self.routing_bounds(&left_children);
        let (right_center, right_radius, right_desc) = self.routing_bounds(&right_children);

        let mut left_node = IhciNode::new_routing(parent, 0);
        left_node.center = left_center;
        left_node.radius = left_radius;
        left_node.desc_count = left_desc;
        if let NodeKind::Routing { children } = &mut left_node.kind {
            *children = left_children.clone();
        }

        let mut right_node = IhciNode::new_routing(parent, 0);
        right_node.center = right_center;
        right_node.radius = right_radius;
        right_node.desc_count = right_desc;
        if let NodeKind::Routing { children } = &mut right_node.kind {
            *children = right_children.clone();
        }

        let new_left = self.arena.push(left_node);
        let new_right = self.arena.push(right_node);

        for (i, &child) in left_children.iter().enumerate() {
            let child_node = self.arena.get_mut(child);
            child_node.parent = Some(new_left);
            child_node.index_in_parent = i;
        }
        for (i, &child) in right_children.iter().enumerate() {
            let child_node = self.arena.get_mut(child);
            child_node.parent = Some(new_right);
            child_node.index_in_parent = i;
        }

        let _ = split_distance;
        self.integrate_split(routing, new_left, new_right);

        self.enqueue_repair(new_left);
        self.enqueue_repair(new_right);
    }

    fn routing_bounds(&self, children: &[NodeHandle]) -> (Vec<f32>, f32, usize) {
        let dims = self.dimensions();
        let mut center = vec![0.0_f32; dims];
        let mut total_desc = 0usize;
        for &h in children {
            let node = self.arena.get(h);
            let weight = node.desc_count.max(1) as f32;
            total_desc += node.desc_count;
            for (c, v) in center.iter_mut().zip(node.center.iter()) {
                *c += v * weight;
            }
        }
        let weight_sum: f32 = children
            .iter()
            .map(|&h| self.arena.get(h).desc_count.max(1) as f32)
            .sum();
        if weight_sum > 0.0 {
            for c in center.iter_mut() {
                *c /= weight_sum;
            }
        }
        let radius = children
            .iter()
            .map(|&h| {
                let node = self.arena.get(h);
                if node.center.is_empty() {
                    0.0
                } else {
                    self.euclidean_distance(&center, &node.center) + node.radius
                }
            })
            .fold(0.0_f32, f32::max);
        (center, radius, total_desc)
    }

    /// Both new leaves inherit the source leaf's neighbor edges; the
    /// farthest-pair split distance becomes a direct edge between them.
    /// Every existing neighbor of the source replaces its edge to the source
    /// with edges to whichever (or both) of the two successors it is
    /// actually close to.
    fn rewire_leaf_neighbors(
        &mut self,
        source: NodeHandle,
        new_left: NodeHandle,
        new_right: NodeHandle,
        split_distance: f32,
    ) {
        let (old_neighbors, old_distances) = {
            let node = self.arena.get(source);
            let NodeKind::Leaf { neighbors, neighbor_distances, .. } = &node.kind else {
                unreachable!();
            };
            (neighbors.clone(), neighbor_distances.clone())
        };
        let neighbor_count = self.config.leaf_neighbor_count;

        if let NodeKind::Leaf { neighbors, neighbor_distances, .. } = &mut self.arena.get_mut(new_left).kind {
            *neighbors = old_neighbors.clone();
            *neighbor_distances = old_distances.clone();
            bounded_sorted_insert(neighbors, neighbor_distances, neighbor_count, new_right, split_distance);
        }
        if let NodeKind::Leaf { neighbors, neighbor_distances, .. } = &mut self.arena.get_mut(new_right).kind {
            *neighbors = old_neighbors.clone();
            *neighbor_distances = old_distances.clone();
            bounded_sorted_insert(neighbors, neighbor_distances, neighbor_count, new_left, split_distance);
        }

        let left_center = self.arena.get(new_left).center.clone();
        let right_center = self.arena.get(new_right).center.clone();

        for &neighbor in &old_neighbors {
            let neighbor_center = self.arena.get(neighbor).center.clone();
            if let NodeKind::Leaf { neighbors, neighbor_distances, .. } = &mut self.arena.get_mut(neighbor).kind {
                if let Some(pos) = neighbors.iter().position(|&h| h == source) {
                    neighbors.swap_remove(pos);
                    neighbor_distances.swap_remove(pos);
                }
            }
            if !neighbor_center.is_empty() && !left_center.is_empty() {
                let d = self.euclidean_distance(&neighbor_center, &left_center);
                if let NodeKind::Leaf { neighbors, neighbor_distances, .. } = &mut self.arena.get_mut(neighbor).kind {
                    bounded_sorted_insert(neighbors, neighbor_distances, neighbor_count, new_left, d);
                }
            }
            if !neighbor_center.is_empty() && !right_center.is_empty() {
                let d = self.euclidean_distance(&neighbor_center, &right_center);
                if let NodeKind::Leaf { neighbors, neighbor_distances, .. } = &mut self.arena.get_mut(neighbor).kind {
                    bounded_sorted_insert(neighbors, neighbor_distances, neighbor_count, new_right, d);
                }
            }
        }
    }

    /// Swaps `source`'s slot for `new_left` in its parent's children list
    /// (or makes a fresh routing root when `source` was the root), appends
    /// `new_right`, and recurses into a routing split if the parent now
    /// overflows `routing_max_children`.
    fn integrate_split(&mut self, source: NodeHandle, new_left: NodeHandle, new_right: NodeHandle) {
        let parent = self.arena.get(source).parent;

        let Some(parent) = parent else {
            let mut new_root = IhciNode::new_routing(None, 0);
            if let NodeKind::Routing { children } = &mut new_root.kind {
                *children = vec![new_left, new_right];
            }
            let root_handle = self.arena.push(new_root);
            self.arena.get_mut(new_left).parent = Some(root_handle);
            self.arena.get_mut(new_left).index_in_parent = 0;
            self.arena.get_mut(new_right).parent = Some(root_handle);
            self.arena.get_mut(new_right).index_in_parent = 1;
            self.root = root_handle;
            self.enqueue_repair(root_handle);
            return;
        };

        let source_index = self.arena.get(source).index_in_parent;

        {
            let parent_node = self.arena.get_mut(parent);
            let NodeKind::Routing { children } = &mut parent_node.kind else {
                unreachable!("a node's parent is always a routing node");
            };
            children[source_index] = new_left;
            children.push(new_right);
        }
        self.arena.get_mut(new_left).parent = Some(parent);
        self.arena.get_mut(new_left).index_in_parent = source_index;

        let new_right_index = {
            let parent_node = self.arena.get(parent);
            let NodeKind::Routing { children } = &parent_node.kind else {
                unreachable!();
            };
            children.len() - 1
        };
        self.arena.get_mut(new_right).parent = Some(parent);
        self.arena.get_mut(new_right).index_in_parent = new_right_index;

        let overflowed = {
            let parent_node = self.arena.get(parent);
            let NodeKind::Routing { children } = &parent_node.kind else {
                unreachable!();
            };
            children.len() > self.config.routing_max_children
        };

        if overflowed {
            self.split_routing(parent);
        } else {
            self.enqueue_repair(parent);
        }
    }

    /// Farthest-pair seed selection: `reference` is the node's existing
    /// center if known, otherwise the first item stands in for it.
    fn farthest_pair(&self, points: &[Vec<f32>], reference: &[f32]) -> (usize, usize, f32) {
        let mut seed_a = 0;
        let mut best = -1.0_f32;
        for (i, p) in points.iter().enumerate() {
            let d = self.euclidean_distance(reference, p);
            if d > best {
                best = d;
                seed_a = i;
            }
        }

        let mut seed_b = usize::from(seed_a == 0);
        let mut best2 = -1.0_f32;
        for (i, p) in points.iter().enumerate() {
            if i == seed_a {
                continue;
            }
            let d = self.euclidean_distance(&points[seed_a], p);
            if d > best2 {
                best2 = d;
                seed_b = i;
            }
        }

        (seed_a, seed_b, best2.max(0.0))
    }
}

fn mean_point(points: &[Vec<f32>], dims: usize) -> Vec<f32> {
    let mut center = vec![0.0_f32; dims];
    for p in points {
        for (c, v) in center.iter_mut().zip(p.iter()) {
            *c += v;
        }
    }
    let n = points.len().max(1) as f32;
    for c in center.iter_mut() {
        *c /= n;
    }
    center
}
