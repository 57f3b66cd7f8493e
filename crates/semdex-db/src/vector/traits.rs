//! Vector index traits and core types.

use crate::error::DbResult;
use serde::{Deserialize, Serialize};

// ============================================================================
// VectorId
// ============================================================================

/// Key of a vector in the index; the same key names the document in the
/// metadata store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorId(pub u64);

impl VectorId {
    pub fn new(id: u64) -> Self {
        VectorId(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for VectorId {
    fn from(id: u64) -> Self {
        VectorId(id)
    }
}

impl std::fmt::Display for VectorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// VectorMatch
// ============================================================================

/// One nearest-neighbour hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorMatch {
    pub id: VectorId,
    /// Cosine distance: 0 = identical, 2 = opposite.
    pub distance: f32,
}

impl VectorMatch {
    /// `1 - distance`.
    pub fn similarity(&self) -> f32 {
        1.0 - self.distance
    }
}

// ============================================================================
// VectorIndexBackend Trait
// ============================================================================

/// Approximate nearest-neighbour index over fixed-dimension vectors.
///
/// ## Implementation Notes
///
/// - `add` has upsert semantics: an existing key is replaced.
/// - `remove` of an absent key is not an error.
/// - After `remove`, `search` never returns the key again.
/// - `search` returns at most `k` hits sorted by ascending distance.
pub trait VectorIndexBackend {
    fn add(&mut self, id: VectorId, vector: &[f32]) -> DbResult<()>;

    /// Returns whether the key was present.
    fn remove(&mut self, id: VectorId) -> DbResult<bool>;

    fn search(&self, query: &[f32], k: usize) -> DbResult<Vec<VectorMatch>>;

    fn contains(&self, id: VectorId) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn dimension(&self) -> usize;
}
