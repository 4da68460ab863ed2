//! The BLAST bucket-overflow reorganization: the sole structural mutation in
//! this index. A hot epicenter among the overflowing bucket's children seeds
//! a sibling bucket; only children that strictly improve their distance to
//! the new bucket's representative move over.

use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::{instrument, trace};

use super::node::{BlastNode, NodeHandle, NodeKind};
use super::BlastIndex;
use crate::store::VectorStore;
use crate::vector_id::VectorId;

impl BlastIndex {
    /// Reorganizes an overflowing bucket by carving a sibling bucket out of
    /// its hottest, farthest-drifting children. A no-op if fewer than two
    /// children exist or no child strictly improves by moving.
    ///
    /// A bucket's representative is only set once it gains its first vector
    /// descendant; a root-of-roots bucket holding only other buckets can
    /// overflow while still having none. Such a bucket is treated as
    /// infinitely far from every candidate, so any candidate with a finite
    /// distance to the new epicenter counts as a strict improvement.
    #[instrument(level = "debug", skip(self, store))]
    pub(super) fn blast_reorganize(&mut self, store: &VectorStore, source: NodeHandle) {
        let children = match &self.arena.get(source).kind {
            NodeKind::Bucket { children, .. } => children.clone(),
            NodeKind::Vector { .. } => return,
        };
        if children.len() < 2 {
            return;
        }

        let Some(epicenter) = self.select_epicenter(store, source, &children) else {
            return;
        };
        let eligible: HashSet<NodeHandle> = children.iter().copied().collect();
        let hop_candidates = self.collect_candidates(epicenter, self.config.neighbor_hops, &eligible);

        let Some(new_rep_id) = self.representative_vector(epicenter) else {
            return;
        };
        let new_rep = store
            .get(new_rep_id)
            .expect("epicenter proxy is a valid id")
            .to_vec();
        let source_rep = self.representative_vector(source).map(|id| {
            store
                .get(id)
                .expect("bucket representative is a valid id")
                .to_vec()
        });

        let mut movers = self.filter_strict_improvement(store, source_rep.as_deref(), &new_rep, hop_candidates);
        if movers.is_empty() {
            trace!(node = source.0, "no strict improvement found, BLAST skipped");
            return;
        }
        if !movers.contains(&epicenter) {
            movers.push(epicenter);
        }

        self.detach_children(source, &movers);

        let parent = self.arena.get(source).parent;
        let new_index = match parent {
            Some(p) => match &self.arena.get(p).kind {
                NodeKind::Bucket { children, .. } => children.len(),
                NodeKind::Vector { .. } => 0,
            },
            None => 1,
        };
        let new_bucket = self.arena.push(BlastNode::new_bucket(parent, new_index));

        if let NodeKind::Bucket { representative, children, .. } = &mut self.arena.get_mut(new_bucket).kind {
            *representative = Some(new_rep_id);
            children.extend(movers.iter().copied());
        }
        for (idx, &m) in movers.iter().enumerate() {
            let node = self.arena.get_mut(m);
            node.parent = Some(new_bucket);
            node.index_in_parent = idx;
        }

        let dist = source_rep
            .as_deref()
            .map(|rep| self.metric_distance(rep, &new_rep))
            .unwrap_or(0.0);
        self.link_bidirectional(source, new_bucket, dist);

        match parent {
            Some(p) => {
                if let NodeKind::Bucket { children, .. } = &mut self.arena.get_mut(p).kind {
                    children.push(new_bucket);
                }
                let overflowed = matches!(
                    &self.arena.get(p).kind,
                    NodeKind::Bucket { children, .. } if children.len() > self.config.bucket_capacity
                );
                if overflowed {
                    self.blast_reorganize(store, p);
                }
            }
            None => {
                let new_root = self.arena.push(BlastNode::new_bucket(None, 0));
                self.arena.get_mut(source).parent = Some(new_root);
                self.arena.get_mut(source).index_in_parent = 0;
                self.arena.get_mut(new_bucket).parent = Some(new_root);
                self.arena.get_mut(new_bucket).index_in_parent = 1;
                if let NodeKind::Bucket { children, .. } = &mut self.arena.get_mut(new_root).kind {
                    children.push(source);
                    children.push(new_bucket);
                }
                self.root = new_root;
            }
        }
    }

    /// Picks the hottest child among the farther (≥50th-percentile) half of
    /// `children` by distance to `source`'s representative. Falls back to
    /// the hottest child over all of `children` when `source` has no
    /// representative (or none of its children has a usable proxy
    /// distance) — there's no "farther half" without a reference point.
    fn select_epicenter(&self, store: &VectorStore, source: NodeHandle, children: &[NodeHandle]) -> Option<NodeHandle> {
        let hottest_overall = || children.iter().copied().max_by_key(|&h| self.arena.get(h).heat);

        let Some(rep) = self.representative_vector(source) else {
            return hottest_overall();
        };
        let Some(rep_v) = store.get(rep).ok().map(<[f32]>::to_vec) else {
            return hottest_overall();
        };

        let mut dists: Vec<(NodeHandle, f32)> = children
            .iter()
            .filter_map(|&c| self.proxy_distance(store, &rep_v, c).map(|d| (c, d)))
            .collect();
        if dists.is_empty() {
            return hottest_overall();
        }
        dists.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

        let median_idx = dists.len() / 2;
        dists[median_idx..]
            .iter()
            .max_by_key(|(h, _)| self.arena.get(*h).heat)
            .map(|(h, _)| *h)
    }

    /// Breadth-first walk of `hops` steps over outgoing/incoming edges from
    /// `epicenter`, restricted to `eligible` nodes (the overflowing bucket's
    /// direct children — only those can be reparented).
    fn collect_candidates(&self, epicenter: NodeHandle, hops: usize, eligible: &HashSet<NodeHandle>) -> Vec<NodeHandle> {
        let mut visited = HashSet::new();
        visited.insert(epicenter);
        let mut frontier = vec![epicenter];

        for _ in 0..hops {
            let mut next = Vec::new();
            for &n in &frontier {
                let (out, _) = self.outgoing(n);
                for &o in out {
                    if visited.insert(o) {
                        next.push(o);
                    }
                }
                for &i in self.incoming(n) {
                    if visited.insert(i) {
                        next.push(i);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        visited.into_iter().filter(|h| eligible.contains(h)).collect()
    }

    /// Keeps only candidates whose distance to `new_rep` strictly improves on
    /// their distance to `source_rep`. A missing `source_rep` (the source
    /// bucket has no representative of its own) is treated as infinitely
    /// far, so any candidate with a finite distance to `new_rep` qualifies.
    fn filter_strict_improvement(
        &self,
        store: &VectorStore,
        source_rep: Option<&[f32]>,
        new_rep: &[f32],
        candidates: Vec<NodeHandle>,
    ) -> Vec<NodeHandle> {
        candidates
            .into_iter()
            .filter(|&c| {
                let Some(d_new) = self.proxy_distance(store, new_rep, c) else {
                    return false;
                };
                match source_rep {
                    None => true,
                    Some(rep) => self.proxy_distance(store, rep, c).is_some_and(|d_old| d_new < d_old),
                }
            })
            .collect()
    }

    fn representative_vector(&self, node: NodeHandle) -> Option<VectorId> {
        match &self.arena.get(node).kind {
            NodeKind::Vector { vector_id, .. } => Some(*vector_id),
            NodeKind::Bucket { representative, .. } => *representative,
        }
    }

    /// Removes each of `movers` from `source`'s children list via
    /// swap-remove, fixing up the `index_in_parent` of whichever child lands
    /// in the vacated slot.
    fn detach_children(&mut self, source: NodeHandle, movers: &[NodeHandle]) {
        for &m in movers {
            let idx = self.arena.get(m).index_in_parent;
            let moved_into_slot = if let NodeKind::Bucket { children, .. } = &mut self.arena.get_mut(source).kind {
                if idx < children.len() && children[idx] == m {
                    children.swap_remove(idx);
                    children.get(idx).copied()
                } else {
                    None
                }
            } else {
                None
            };
            if let Some(moved) = moved_into_slot {
                self.arena.get_mut(moved).index_in_parent = idx;
            }
        }
    }
}
