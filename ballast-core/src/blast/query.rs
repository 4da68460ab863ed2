//! BLAST top-K query: best-first traversal over the bucket/vector graph,
//! bounded by a visit budget. No sphere bounds exist here (unlike IHCI), so
//! pruning is the softer "can't already beat the current worst" heuristic.

use std::collections::{BinaryHeap, HashSet};

use tracing::instrument;

use super::edges::HeapEntry;
use super::node::{NodeHandle, NodeKind};
use super::trace::{TraceEvent, TraceReason};
use super::BlastIndex;
use crate::bounded::TopK;
use crate::error::BallastError;
use crate::store::VectorStore;
use crate::vector_id::VectorId;

impl BlastIndex {
    /// Returns the `k` vectors nearest `query`, ascending by distance (ties
    /// broken by ascending id).
    ///
    /// `visit_budget` caps the number of nodes popped off the search
    /// frontier; larger values trade work for recall.
    ///
    /// # Errors
    ///
    /// Returns [`BallastError::InvalidArgument`] if `k == 0` or
    /// `visit_budget == 0`, or [`BallastError::DimensionMismatch`] if
    /// `query.len()` does not match the index's dimension.
    #[instrument(level = "debug", skip(self, store, query), fields(k, visit_budget))]
    pub fn query(
        &self,
        store: &VectorStore,
        query: &[f32],
        k: usize,
        visit_budget: usize,
    ) -> Result<Vec<(VectorId, f32)>, BallastError> {
        self.query_inner(store, query, k, visit_budget, None)
    }

    /// Like [`BlastIndex::query`], but also returns a step-by-step trace of
    /// the traversal for diagnostics.
    ///
    /// # Errors
    ///
    /// Same as [`BlastIndex::query`].
    pub fn query_with_trace(
        &self,
        store: &VectorStore,
        query: &[f32],
        k: usize,
        visit_budget: usize,
    ) -> Result<(Vec<(VectorId, f32)>, Vec<TraceEvent>), BallastError> {
        let mut events = Vec::new();
        let results = self.query_inner(store, query, k, visit_budget, Some(&mut events))?;
        Ok((results, events))
    }

    fn query_inner(
        &self,
        store: &VectorStore,
        query: &[f32],
        k: usize,
        visit_budget: usize,
        mut trace: Option<&mut Vec<TraceEvent>>,
    ) -> Result<Vec<(VectorId, f32)>, BallastError> {
        if k == 0 {
            return Err(BallastError::invalid_argument("k must be positive"));
        }
        if visit_budget == 0 {
            return Err(BallastError::invalid_argument("visit_budget must be at least 1"));
        }
        if query.len() != self.dimensions() {
            return Err(BallastError::DimensionMismatch {
                expected: self.dimensions(),
                actual: query.len(),
            });
        }

        let mut best = TopK::new(k);
        let mut heap = BinaryHeap::new();
        let root_dist = self.proxy_distance(store, query, self.root).unwrap_or(f32::INFINITY);
        heap.push(HeapEntry { dist: root_dist, node: self.root });

        let mut visited: HashSet<NodeHandle> = HashSet::new();
        let mut visits = 0usize;

        while let Some(HeapEntry { dist, node }) = heap.pop() {
            if !visited.insert(node) {
                continue;
            }
            if let Some(t) = trace.as_deref_mut() {
                t.push(TraceEvent::PopCandidate { path: self.node_path(node), distance: dist });
            }

            visits += 1;
            if visits > visit_budget {
                if let Some(t) = trace.as_deref_mut() {
                    t.push(TraceEvent::Terminate { reason: TraceReason::QueueExhausted });
                }
                break;
            }
            if let Some(t) = trace.as_deref_mut() {
                t.push(TraceEvent::SetCurrent { path: self.node_path(node) });
            }

            if let NodeKind::Vector { vector_id, .. } = &self.arena.get(node).kind {
                let vector_id = *vector_id;
                if let Ok(v) = store.get(vector_id) {
                    if let Ok(d) = self.metric.distance(query, v) {
                        if let Some(t) = trace.as_deref_mut() {
                            t.push(TraceEvent::ScanVector { id: vector_id, distance: d });
                        }
                        best.add(vector_id, d);
                    }
                }
            }

            let mut to_push: Vec<(NodeHandle, TraceReason)> = Vec::new();
            if let NodeKind::Bucket { children, .. } = &self.arena.get(node).kind {
                to_push.extend(children.iter().map(|&c| (c, TraceReason::BucketChild)));
            }
            let (out_n, _) = self.outgoing(node);
            to_push.extend(out_n.iter().map(|&c| (c, TraceReason::OutgoingEdge)));
            to_push.extend(self.incoming(node).iter().map(|&c| (c, TraceReason::IncomingEdge)));

            for (candidate, reason) in to_push {
                if visited.contains(&candidate) {
                    continue;
                }
                let d = self.proxy_distance(store, query, candidate).unwrap_or(f32::INFINITY);
                if best.has_worst() && d > best.worst_distance() {
                    continue;
                }
                if let Some(t) = trace.as_deref_mut() {
                    t.push(TraceEvent::AddCandidate { path: self.node_path(candidate), distance: d, reason });
                }
                heap.push(HeapEntry { dist: d, node: candidate });
            }
        }

        if heap.is_empty() {
            if let Some(t) = trace.as_deref_mut() {
                t.push(TraceEvent::Terminate { reason: TraceReason::QueueExhausted });
            }
        } else if best.has_worst() {
            if let Some(t) = trace.as_deref_mut() {
                t.push(TraceEvent::Terminate { reason: TraceReason::TopKSatisfied });
            }
        }

        Ok(best.into_sorted_vec())
    }
}
