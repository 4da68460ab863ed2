//! This test verifies that a slice cannot outlive the `VectorStore` it
//! borrows from.
//!
//! If this code compiles, there is a bug in the API design.

use ballast_core::VectorStore;

fn main() {
    let slice = {
        let mut store = VectorStore::new(4).unwrap();
        let id = store.append(&[1.0; 4]).unwrap();

        // ERROR: Cannot return slice because it borrows from `store`,
        // which will be dropped at the end of this block
        store.get(id).unwrap()
    };

    println!("{}", slice[0]);
}
