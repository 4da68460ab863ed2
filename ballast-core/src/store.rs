//! In-memory, append-only vector storage.

use crate::error::BallastError;
use crate::vector_id::VectorId;

/// Row-major, append-only storage for fixed-dimension float vectors.
///
/// Vectors are never rewritten or removed once appended — the indices built
/// over a `VectorStore` rely on that to keep a previously returned
/// [`VectorId`] valid for the store's entire lifetime.
#[derive(Debug, Clone)]
pub struct VectorStore {
    dimensions: usize,
    data: Vec<f32>,
}

impl VectorStore {
    /// Creates an empty store for vectors of the given dimension.
    ///
    /// # Errors
    ///
    /// Returns [`BallastError::InvalidArgument`] if `dimensions` is zero.
    pub fn new(dimensions: usize) -> Result<Self, BallastError> {
        if dimensions == 0 {
            return Err(BallastError::invalid_argument(
                "vector store dimension must be positive",
            ));
        }
        Ok(Self {
            dimensions,
            data: Vec::new(),
        })
    }

    /// Appends `vector` and returns its newly assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`BallastError::DimensionMismatch`] if `vector.len() !=
    /// self.dimensions()`.
    pub fn append(&mut self, vector: &[f32]) -> Result<VectorId, BallastError> {
        if vector.len() != self.dimensions {
            return Err(BallastError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }

        let index = self.count() as u64;
        self.data.extend_from_slice(vector);
        Ok(VectorId::new(index))
    }

    /// Returns a zero-copy slice view of the vector with the given id.
    ///
    /// The returned slice borrows from `self`, so the ordinary borrow-checker
    /// rules prevent holding it across a call to [`VectorStore::append`]
    /// (which takes `&mut self`).
    ///
    /// # Errors
    ///
    /// Returns [`BallastError::InvalidId`] if `id` is the invalid sentinel or
    /// out of range for this store.
    pub fn get(&self, id: VectorId) -> Result<&[f32], BallastError> {
        let index = id.index().map_err(|_| BallastError::InvalidId { id: 0 })?;
        let index = usize::try_from(index).map_err(|_| BallastError::InvalidId { id: index })?;

        if index >= self.count() {
            return Err(BallastError::InvalidId { id: index as u64 });
        }

        let start = index * self.dimensions;
        let end = start + self.dimensions;
        // SAFETY net not needed: `start`/`end` are derived from a bounds-checked
        // `index` and the fixed per-row stride, so the slice is always in range.
        Ok(&self.data[start..end])
    }

    /// Number of vectors currently stored.
    #[must_use]
    pub fn count(&self) -> usize {
        self.data.len() / self.dimensions
    }

    /// Dimension every vector in this store shares.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// True if no vectors have been appended yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}
