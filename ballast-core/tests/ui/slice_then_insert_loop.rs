//! This test verifies that Rust's borrow checker prevents calling `append()`
//! in a loop while holding a slice from `get()`.
//!
//! If this code compiles, there is a bug in the API design.

use ballast_core::VectorStore;

fn main() {
    let mut store = VectorStore::new(4).unwrap();
    let id = store.append(&[1.0; 4]).unwrap();

    let slice = store.get(id).unwrap();

    // ERROR: Cannot append in a loop because append() requires &mut self,
    // but `slice` is still borrowing &self
    for i in 0..10 {
        store.append(&[i as f32; 4]).unwrap();
    }

    println!("{}", slice[0]);
}
