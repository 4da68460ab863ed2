//! Construction-time tuning knobs for [`super::BlastIndex`].

/// Tuning parameters for a [`super::BlastIndex`].
#[derive(Debug, Clone, Copy)]
pub struct BlastConfig {
    /// Maximum children a bucket holds before BLAST reorganization triggers.
    pub bucket_capacity: usize,
    /// Bounded size of a node's outgoing neighbor-edge list.
    pub outgoing_neighbor_count: usize,
    /// Hop count explored from the epicenter's edges during BLAST candidate collection.
    pub neighbor_hops: usize,
    /// Number of buckets recorded along an insert's descent for window linking.
    pub window_size: usize,
}

impl Default for BlastConfig {
    fn default() -> Self {
        Self {
            bucket_capacity: 128,
            outgoing_neighbor_count: 8,
            neighbor_hops: 2,
            window_size: 4,
        }
    }
}
