//! Ballast - embeddable approximate-nearest-neighbor vector index
//!
//! Ballast indexes dense float vectors in memory and answers top-K nearest
//! neighbor queries, in two interchangeable flavors built over the same
//! distance kernels and vector store:
//!
//! - [`IhciTree`] — an incremental hierarchical clustering index: a dynamic
//!   ball-tree with sphere-bound pruning and a leaf-to-leaf neighbor graph
//!   for sideways hops the routing descent alone would miss.
//! - [`BlastIndex`] — a graph-first hierarchical index: vectors attach to
//!   buckets chosen by priority-ordered graph descent, and the only
//!   structural mutation is a bucket-overflow reorganization ("BLAST") that
//!   carves a sibling bucket out of a hot, drifting subset of children.
//!
//! # Features
//!
//! - SIMD-accelerated squared-Euclidean and cosine distance kernels, with a
//!   scalar fallback
//! - Arena-allocated nodes addressed by handle, never by pointer
//! - Deterministic construction (farthest-pair heuristics; no randomness
//!   inside the index itself)
//! - Lazy, amortized bounds repair for the IHCI tree
//!
//! # Example
//!
//! The vector store is owned by the caller and borrowed into each index
//! operation, so one store can back several indices over the same id space:
//!
//! ```no_run
//! use ballast_core::{IhciConfig, IhciTree, Metric, VectorStore};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut store = VectorStore::new(128)?;
//! let mut tree = IhciTree::new(128, Metric::SquaredEuclidean, IhciConfig::default());
//!
//! let embedding = vec![0.1; 128];
//! let id = store.append(&embedding)?;
//! tree.insert(&store, id)?;
//!
//! let results = tree.query(&store, &embedding, 10, 4)?;
//! assert_eq!(results[0].0, id);
//! # Ok(())
//! # }
//! ```
//!
//! # Design Philosophy
//!
//! Ballast is an in-memory index, not a storage engine. It does not aim to
//! be:
//! - A persistence layer (no on-disk format, no durability guarantees)
//! - A distributed or replicated system
//! - A full query engine with filtering/scoring DSLs
//! - A network service
//!
//! These concerns are left to the application layer embedding it.

mod blast;
mod bounded;
mod error;
mod ihci;
mod metric;
mod store;
mod vector_id;

pub use blast::{BlastConfig, BlastIndex, TraceEvent, TraceReason};
pub use error::BallastError;
pub use ihci::{IhciConfig, IhciTree};
pub use metric::Metric;
pub use store::VectorStore;
pub use vector_id::VectorId;

/// Raw distance kernels and the bounded-collection primitives, exposed only
/// under the `internals` feature for benchmarking — ordinary callers go
/// through [`Metric::distance`], [`IhciTree`], or [`BlastIndex`] instead.
#[cfg(feature = "internals")]
pub use bounded::{bounded_sorted_insert, TopK};
#[cfg(feature = "internals")]
pub use metric::{cosine_distance, dot, norm, normalize, squared_l2, squared_l2_scalar, subtract_scaled};
