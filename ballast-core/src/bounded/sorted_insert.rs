//! Bounded-sorted-insert-with-mirror: insertion into an ascending-sorted,
//! capacity-bounded array, keeping a parallel "value" array in lock-step.
//!
//! This is the primitive neighbor-list maintenance is built on, both for
//! IHCI leaf neighbors and BLAST outgoing edges. It plays the role an
//! HNSW graph's diversity-heuristic neighbor eviction would play, but
//! without the diversity phase: this is a literal nearest-`capacity` list.

/// Inserts `(key, distance)` into the ascending-by-distance parallel arrays
/// `keys`/`distances`, evicting the current farthest entry if the arrays are
/// already at `capacity` and the new entry is closer than the farthest.
///
/// Returns the index the new entry was inserted at, or `None` if it was
/// rejected (arrays at capacity and the new entry is not strictly closer than
/// the current farthest entry).
///
/// # Panics
///
/// Panics (via `debug_assert`) if `keys.len() != distances.len()`.
pub fn bounded_sorted_insert<T: Copy>(
    keys: &mut Vec<T>,
    distances: &mut Vec<f32>,
    capacity: usize,
    key: T,
    distance: f32,
) -> Option<usize> {
    debug_assert_eq!(keys.len(), distances.len());

    let pos = distances.partition_point(|&d| d <= distance);

    if keys.len() < capacity {
        keys.insert(pos, key);
        distances.insert(pos, distance);
        return Some(pos);
    }

    // Already at capacity: reject anything that wouldn't displace the
    // current farthest entry.
    if pos >= capacity {
        return None;
    }

    keys.insert(pos, key);
    distances.insert(pos, distance);
    keys.truncate(capacity);
    distances.truncate(capacity);
    Some(pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_up_to_capacity_in_ascending_order() {
        let mut keys = Vec::new();
        let mut distances = Vec::new();

        assert_eq!(bounded_sorted_insert(&mut keys, &mut distances, 3, 'a', 3.0), Some(0));
        assert_eq!(bounded_sorted_insert(&mut keys, &mut distances, 3, 'b', 1.0), Some(0));
        assert_eq!(bounded_sorted_insert(&mut keys, &mut distances, 3, 'c', 2.0), Some(1));

        assert_eq!(keys, vec!['b', 'c', 'a']);
        assert_eq!(distances, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn rejects_when_full_and_not_strictly_better() {
        let mut keys = vec!['a', 'b'];
        let mut distances = vec![1.0, 2.0];

        assert_eq!(bounded_sorted_insert(&mut keys, &mut distances, 2, 'c', 5.0), None);
        assert_eq!(keys, vec!['a', 'b']);
    }

    #[test]
    fn evicts_farthest_when_full_and_better() {
        let mut keys = vec!['a', 'b'];
        let mut distances = vec![1.0, 2.0];

        let idx = bounded_sorted_insert(&mut keys, &mut distances, 2, 'c', 1.5);
        assert_eq!(idx, Some(1));
        assert_eq!(keys, vec!['a', 'c']);
        assert_eq!(distances, vec![1.0, 1.5]);
    }

    #[test]
    fn keys_and_distances_stay_parallel() {
        let mut keys = Vec::new();
        let mut distances = Vec::new();
        for (k, d) in [(0, 5.0), (1, 2.0), (2, 8.0), (3, 1.0), (4, 0.5)] {
            bounded_sorted_insert(&mut keys, &mut distances, 4, k, d);
        }
        assert_eq!(keys.len(), distances.len());
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }
}
