//! This test verifies that Rust's borrow checker prevents calling `append()`
//! while a slice from `get()` is alive.
//!
//! If this code compiles, there is a bug in the API design.

use ballast_core::VectorStore;

fn main() {
    let mut store = VectorStore::new(4).unwrap();
    let id = store.append(&[1.0; 4]).unwrap();

    let slice = store.get(id).unwrap();

    // ERROR: Cannot call append() because it requires &mut self,
    // but `slice` is still borrowing &self
    store.append(&[2.0; 4]).unwrap();

    println!("{}", slice[0]);
}
