//! IHCI Tree — an incremental hierarchical clustering index.
//!
//! A dynamic ball-tree: routing nodes fan out to children bounded by
//! `routing_max_children`, leaves hold up to `leaf_capacity` vectors directly.
//! Every node carries a sphere bound `(center, radius)`; queries prune
//! subtrees whose sphere cannot contain anything closer than the current
//! worst retained candidate. A neighbor graph between leaves lets queries
//! hop sideways to nearby leaves the routing descent itself would have
//! missed. Structural changes (splits) are immediate; center/radius upkeep
//! is lazy, queued and drained either explicitly or amortized during insert.
//!
//! The tree holds no [`VectorStore`] of its own: every operation that needs
//! to read a vector's contents takes the store as an argument, so the same
//! store can be mutated (via [`VectorStore::append`]) and read by several
//! indices without the indices ever holding a long-lived borrow of it.

mod config;
mod insert;
mod node;
mod query;
mod repair;
mod split;

pub use config::IhciConfig;
pub use node::NodeHandle;

use std::collections::VecDeque;

use node::{Arena, IhciNode};
#[cfg(test)]
use node::NodeKind;

use crate::metric::Metric;
use crate::store::VectorStore;

/// An incremental hierarchical clustering index over dense float vectors.
///
/// Does not own a [`VectorStore`]; every method that needs to read a
/// vector's contents takes `store: &VectorStore` as an argument. This lets
/// the same store back an [`IhciTree`] and a [`super::BlastIndex`] (or
/// several trees) over one shared id space, with the caller free to keep
/// appending to the store between calls.
#[derive(Debug)]
pub struct IhciTree {
    pub(crate) dimensions: usize,
    pub(crate) metric: Metric,
    pub(crate) config: IhciConfig,
    pub(crate) arena: Arena,
    pub(crate) root: NodeHandle,
    pub(crate) repair_queue: VecDeque<NodeHandle>,
    pub(crate) inserts_since_repair: usize,
    pub(crate) len: usize,
}

impl IhciTree {
    /// Creates an empty tree for vectors of the given dimension.
    ///
    /// `dimensions` should match the [`VectorStore`] that will be passed to
    /// [`IhciTree::insert`] and [`IhciTree::query`].
    #[must_use]
    pub fn new(dimensions: usize, metric: Metric, config: IhciConfig) -> Self {
        let mut arena = Arena::new();
        let root = arena.push(IhciNode::new_leaf(None, 0));
        Self {
            dimensions,
            metric,
            config,
            arena,
            root,
            repair_queue: VecDeque::new(),
            inserts_since_repair: 0,
            len: 0,
        }
    }

    /// Number of vectors inserted into this tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the tree holds no vectors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Dimension every vector in this tree shares.
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

    /// Number of nodes currently queued for lazy repair.
    #[must_use]
    pub fn pending_repairs(&self) -> usize {
        self.repair_queue.len()
    }

    fn metric_distance(&self, a: &[f32], b: &[f32]) -> f32 {
        // Dimensions are guaranteed to match within a single tree, so this
        // cannot fail; callers at the public boundary use `self.metric.distance`
        // directly when the input is caller-supplied.
        self.metric
            .distance(a, b)
            .expect("internal distance call with mismatched dimensions")
    }

    fn euclidean_distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self.metric {
            Metric::SquaredEuclidean => self.metric_distance(a, b).sqrt(),
            Metric::Cosine => self.metric_distance(a, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::error::BallastError;
    use crate::vector_id::VectorId;

    fn check_node_invariants(
        tree: &IhciTree,
        store: &VectorStore,
        handle: NodeHandle,
        parent: Option<NodeHandle>,
        index_in_parent: usize,
    ) {
        let node = tree.arena.get(handle);
        assert_eq!(node.parent, parent, "parent pointer mismatch");
        assert_eq!(node.index_in_parent, index_in_parent, "index_in_parent mismatch");

        match &node.kind {
            NodeKind::Leaf { vectors, neighbors, neighbor_distances, disposed } => {
                if *disposed {
                    return;
                }
                assert_eq!(node.desc_count, vectors.len());
                assert!(neighbors.len() <= tree.config.leaf_neighbor_count);
                assert_eq!(neighbors.len(), neighbor_distances.len());
                assert!(neighbor_distances.windows(2).all(|w| w[0] <= w[1] + 1e-4));
                if !node.center.is_empty() {
                    for &id in vectors {
                        let v = store.get(id).unwrap().to_vec();
                        let d = tree.euclidean_distance(&node.center, &v);
                        assert!(d <= node.radius + 1e-3, "vector outside sphere: {d} > {}", node.radius);
                    }
                }
            }
            NodeKind::Routing { children } => {
                let sum: usize = children.iter().map(|&h| tree.arena.get(h).desc_count).sum();
                assert_eq!(node.desc_count, sum);
                for (i, &child) in children.iter().enumerate() {
                    check_node_invariants(tree, store, child, Some(handle), i);
                }
            }
        }
    }

    proptest! {
        #[test]
        fn structural_invariants_hold_after_random_inserts(
            vectors in prop::collection::vec(prop::collection::vec(-10.0f32..10.0, 4), 1..40)
        ) {
            let config = IhciConfig {
                leaf_capacity: 3,
                routing_max_children: 3,
                leaf_neighbor_count: 2,
                repair_every_inserts: 1,
                repair_queue_high_watermark: 4,
            };
            let mut store = VectorStore::new(4).unwrap();
            let mut tree = IhciTree::new(4, Metric::SquaredEuclidean, config);
            for v in &vectors {
                let id = store.append(v).unwrap();
                tree.insert(&store, id).unwrap();
            }
            tree.repair_all(&store);

            check_node_invariants(&tree, &store, tree.root, None, 0);
        }
    }

    fn unit_basis_tree() -> (VectorStore, IhciConfig, Vec<VectorId>) {
        let config = IhciConfig {
            leaf_capacity: 4,
            routing_max_children: 4,
            leaf_neighbor_count: 2,
            repair_every_inserts: 1,
            repair_queue_high_watermark: 4,
        };
        let mut store = VectorStore::new(4).unwrap();

        let e1 = [1.0, 0.0, 0.0, 0.0];
        let e2 = [0.0, 1.0, 0.0, 0.0];
        let e3 = [0.0, 0.0, 1.0, 0.0];
        let e4 = [0.0, 0.0, 0.0, 1.0];

        let add = |v: &[f32; 4], u: &[f32; 4]| -> Vec<f32> {
            (0..4).map(|i| v[i] + u[i]).collect()
        };

        let vectors: Vec<Vec<f32>> = vec![
            e1.to_vec(),
            e2.to_vec(),
            e3.to_vec(),
            e4.to_vec(),
            add(&e1, &e2),
            add(&e1, &e3),
            add(&e1, &e4),
            add(&e2, &e3),
            add(&e2, &e4),
            add(&e3, &e4),
        ];

        let ids: Vec<VectorId> = vectors.iter().map(|v| store.append(v).unwrap()).collect();
        (store, config, ids)
    }

    #[test]
    fn scenario_unit_basis_4d_l2() {
        let (store, config, ids) = unit_basis_tree();
        let mut tree = IhciTree::new(4, Metric::SquaredEuclidean, config);
        for &id in &ids {
            tree.insert(&store, id).unwrap();
        }
        tree.repair_all(&store);

        let results = tree.query(&store, &[1.0, 0.0, 0.0, 0.0], 3, 2).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].1, 0.0);
        for (_, dist) in &results[1..] {
            assert!((*dist - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn scenario_self_match_sanity_500_random_8d() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(500);
        let mut store = VectorStore::new(8).unwrap();
        let mut tree = IhciTree::new(8, Metric::SquaredEuclidean, IhciConfig::default());

        let mut last_id = VectorId::INVALID;
        for _ in 0..500 {
            let v: Vec<f32> = (0..8).map(|_| rng.random_range(-1.0..1.0)).collect();
            last_id = store.append(&v).unwrap();
            tree.insert(&store, last_id).unwrap();
        }
        tree.repair_all(&store);

        let query_vec = store.get(last_id).unwrap().to_vec();
        let results = tree.query(&store, &query_vec, 1, 2).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, last_id);
        assert!(results[0].1 < 1e-6);
    }

    #[test]
    fn boundary_k_one_on_singleton() {
        let mut store = VectorStore::new(2).unwrap();
        let mut tree = IhciTree::new(2, Metric::SquaredEuclidean, IhciConfig::default());
        let id = store.append(&[1.0, 2.0]).unwrap();
        tree.insert(&store, id).unwrap();
        let results = tree.query(&store, &[1.0, 2.0], 1, 2).unwrap();
        assert_eq!(results, vec![(id, 0.0)]);
    }

    #[test]
    fn insert_rejects_invalid_id() {
        let store = VectorStore::new(3).unwrap();
        let mut tree = IhciTree::new(3, Metric::SquaredEuclidean, IhciConfig::default());
        let err = tree.insert(&store, VectorId::INVALID).unwrap_err();
        assert!(matches!(err, BallastError::InvalidId { .. }));
    }

    #[test]
    fn query_rejects_dimension_mismatch() {
        let mut store = VectorStore::new(3).unwrap();
        let mut tree = IhciTree::new(3, Metric::SquaredEuclidean, IhciConfig::default());
        let id = store.append(&[0.0, 0.0, 0.0]).unwrap();
        tree.insert(&store, id).unwrap();
        let err = tree.query(&store, &[0.0, 0.0], 1, 2).unwrap_err();
        assert!(matches!(err, BallastError::DimensionMismatch { .. }));
    }

    #[test]
    fn query_rejects_zero_k() {
        let mut store = VectorStore::new(3).unwrap();
        let mut tree = IhciTree::new(3, Metric::SquaredEuclidean, IhciConfig::default());
        let id = store.append(&[0.0, 0.0, 0.0]).unwrap();
        tree.insert(&store, id).unwrap();
        let err = tree.query(&store, &[0.0, 0.0, 0.0], 0, 2).unwrap_err();
        assert!(matches!(err, BallastError::InvalidArgument { .. }));
    }

    #[test]
    fn repeated_splits_preserve_query_correctness() {
        let config = IhciConfig {
            leaf_capacity: 2,
            routing_max_children: 2,
            leaf_neighbor_count: 2,
            repair_every_inserts: 1,
            repair_queue_high_watermark: 4,
        };
        let mut store = VectorStore::new(8).unwrap();
        let mut tree = IhciTree::new(8, Metric::SquaredEuclidean, config);

        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(7);

        let vectors: Vec<Vec<f32>> = (0..25)
            .map(|_| (0..8).map(|_| rng.random_range(-1.0..1.0)).collect())
            .collect();
        let ids: Vec<VectorId> = vectors
            .iter()
            .map(|v| {
                let id = store.append(v).unwrap();
                tree.insert(&store, id).unwrap();
                id
            })
            .collect();
        tree.repair_all(&store);

        assert!(tree.node_count() > 1);

        let mut hits = 0;
        for (v, id) in vectors.iter().zip(ids.iter()) {
            let results = tree.query(&store, v, 1, 4).unwrap();
            if results.first().map(|(rid, _)| rid) == Some(id) {
                hits += 1;
            }
        }
        let recall = hits as f64 / vectors.len() as f64;
        assert!(recall >= 0.5, "recall too low: {recall}");
    }
}
