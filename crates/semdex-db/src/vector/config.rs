//! HNSW graph parameters.

use serde::{Deserialize, Serialize};

/// Graph degree (M). 16 is the usual default for text embeddings.
pub const DEFAULT_CONNECTIVITY: usize = 16;

/// Candidate list size while inserting (efConstruction).
pub const DEFAULT_EXPANSION_ADD: usize = 128;

/// Candidate list size while searching (ef). Kept above the default
/// over-fetch of 50 so a full over-fetch does not degrade recall.
pub const DEFAULT_EXPANSION_SEARCH: usize = 64;

/// Parameters for building or loading an HNSW index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HnswConfig {
    pub dimensions: usize,
    #[serde(default = "default_connectivity")]
    pub connectivity: usize,
    #[serde(default = "default_expansion_add")]
    pub expansion_add: usize,
    #[serde(default = "default_expansion_search")]
    pub expansion_search: usize,
}

fn default_connectivity() -> usize {
    DEFAULT_CONNECTIVITY
}

fn default_expansion_add() -> usize {
    DEFAULT_EXPANSION_ADD
}

fn default_expansion_search() -> usize {
    DEFAULT_EXPANSION_SEARCH
}

impl HnswConfig {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            connectivity: DEFAULT_CONNECTIVITY,
            expansion_add: DEFAULT_EXPANSION_ADD,
            expansion_search: DEFAULT_EXPANSION_SEARCH,
        }
    }

    pub fn with_expansion_search(mut self, expansion_search: usize) -> Self {
        self.expansion_search = expansion_search;
        self
    }
}
