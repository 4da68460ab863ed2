//! Bounded-capacity collection primitives shared by both index structures:
//! a max-heap for top-K query results, and a sorted-array insert used to
//! maintain bounded, ascending neighbor lists.

mod sorted_insert;
mod topk;

pub use sorted_insert::bounded_sorted_insert;
pub use topk::TopK;
