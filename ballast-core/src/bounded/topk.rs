//! Bounded top-K max-heap, keyed by distance.
//!
//! A plain max-heap bounded to `k` entries, with the worst entry evicted
//! whenever a strictly better candidate arrives.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::vector_id::VectorId;

#[derive(Debug, Clone, Copy, PartialEq)]
struct ScoredId {
    id: VectorId,
    distance: f32,
}

impl Eq for ScoredId {}

impl Ord for ScoredId {
    fn cmp(&self, other: &Self) -> Ordering {
        // Trusts finite distances; NaN inputs would violate the ordering invariant.
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for ScoredId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Bounded max-heap retaining the `k` closest `(VectorId, distance)` pairs
/// seen so far.
#[derive(Debug, Clone)]
pub struct TopK {
    capacity: usize,
    heap: BinaryHeap<ScoredId>,
}

impl TopK {
    /// Creates an empty top-K collector with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity),
        }
    }

    /// Offers a candidate. Returns `true` if it was kept (either because the
    /// heap had room, or because it displaced the current worst entry).
    pub fn add(&mut self, id: VectorId, distance: f32) -> bool {
        if self.heap.len() < self.capacity {
            self.heap.push(ScoredId { id, distance });
            return true;
        }

        let Some(mut worst) = self.heap.peek_mut() else {
            return false;
        };
        if distance < worst.distance {
            *worst = ScoredId { id, distance };
            true
        } else {
            false
        }
    }

    /// True once the heap holds `capacity` entries.
    #[must_use]
    pub fn has_worst(&self) -> bool {
        self.heap.len() >= self.capacity
    }

    /// Distance of the current worst (farthest) retained entry.
    ///
    /// Callers must check [`TopK::has_worst`] first; calling this before the
    /// heap is full is a caller bug.
    #[must_use]
    pub fn worst_distance(&self) -> f32 {
        debug_assert!(self.has_worst(), "worst_distance called on a non-full TopK");
        self.heap.peek().map_or(f32::INFINITY, |s| s.distance)
    }

    /// Number of entries currently retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// True if no candidates have been offered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drains the heap into an ascending-by-distance vector, breaking ties by
    /// ascending vector id.
    #[must_use]
    pub fn into_sorted_vec(self) -> Vec<(VectorId, f32)> {
        let mut items: Vec<ScoredId> = self.heap.into_vec();
        items.sort();
        items.into_iter().map(|s| (s.id, s.distance)).collect()
    }
}
