//! This test verifies that a borrow of a slice extends through function
//! returns, preventing mutations even when the slice is returned.
//!
//! If this code compiles, there is a bug in the API design.

use ballast_core::{VectorId, VectorStore};

fn get_first_slice(store: &VectorStore, id: VectorId) -> &[f32] {
    store.get(id).unwrap()
}

fn main() {
    let mut store = VectorStore::new(4).unwrap();
    let id = store.append(&[1.0; 4]).unwrap();

    let slice = get_first_slice(&store, id);

    // ERROR: Cannot call append() because the borrow from get_first_slice
    // extends through the return and `slice` is still borrowing &store
    store.append(&[2.0; 4]).unwrap();

    println!("{}", slice[0]);
}
