//! usearch-backed HNSW index under the cosine metric.
//!
//! The whole graph lives in memory while an operation runs and is persisted
//! as a single binary blob. Keys are the document IDs handed out by the
//! metadata store.

use std::path::Path;

use tracing::{debug, trace};
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use super::config::HnswConfig;
use super::traits::{VectorId, VectorIndexBackend, VectorMatch};
use crate::atomic::atomic_replace_with;
use crate::error::{DbError, DbResult};

/// Minimum number of slots reserved when the index grows.
const MIN_RESERVE: usize = 64;

/// HNSW vector index.
pub struct HnswVectorIndex {
    index: Index,
    config: HnswConfig,
}

impl std::fmt::Debug for HnswVectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HnswVectorIndex")
            .field("dimensions", &self.config.dimensions)
            .field("size", &self.index.size())
            .finish()
    }
}

fn index_options(config: &HnswConfig) -> IndexOptions {
    IndexOptions {
        dimensions: config.dimensions,
        metric: MetricKind::Cos,
        quantization: ScalarKind::F32,
        connectivity: config.connectivity,
        expansion_add: config.expansion_add,
        expansion_search: config.expansion_search,
        multi: false,
    }
}

impl HnswVectorIndex {
    /// Create an empty index.
    pub fn new(config: HnswConfig) -> DbResult<Self> {
        if config.dimensions == 0 {
            return Err(DbError::DimensionMismatch {
                expected: 1,
                actual: 0,
            });
        }
        let index = Index::new(&index_options(&config))
            .map_err(|e| DbError::vector_op("create", e.to_string()))?;
        Ok(Self { index, config })
    }

    /// Create an empty index with room for `capacity` vectors.
    pub fn with_capacity(config: HnswConfig, capacity: usize) -> DbResult<Self> {
        let index = Self::new(config)?;
        index
            .index
            .reserve(capacity.max(MIN_RESERVE))
            .map_err(|e| DbError::vector_op("reserve", e.to_string()))?;
        Ok(index)
    }

    /// Load a persisted index.
    ///
    /// Fails with `VectorParse` when the blob is unreadable or was built for a
    /// different dimension than `config.dimensions`.
    pub fn load(path: &Path, config: HnswConfig) -> DbResult<Self> {
        if !path.exists() {
            return Err(DbError::IndexNotFound {
                path: path.to_path_buf(),
            });
        }

        let index = Index::new(&index_options(&config))
            .map_err(|e| DbError::vector_op("create", e.to_string()))?;
        index
            .load(&path.to_string_lossy())
            .map_err(|e| DbError::vector_parse(path, e.to_string()))?;

        if index.dimensions() != config.dimensions {
            return Err(DbError::vector_parse(
                path,
                format!(
                    "index has {} dimensions, expected {}",
                    index.dimensions(),
                    config.dimensions
                ),
            ));
        }

        debug!("Loaded HNSW index from {:?} ({} vectors)", path, index.size());
        Ok(Self { index, config })
    }

    /// Persist the index with temp-then-rename.
    pub fn save(&self, path: &Path) -> DbResult<()> {
        atomic_replace_with(path, |temp| {
            self.index
                .save(&temp.to_string_lossy())
                .map_err(|e| DbError::write_failure(temp, e.to_string()))
        })?;
        debug!("Saved HNSW index to {:?} ({} vectors)", path, self.index.size());
        Ok(())
    }

    pub fn config(&self) -> &HnswConfig {
        &self.config
    }

    fn check_dimension(&self, vector: &[f32]) -> DbResult<()> {
        if vector.len() != self.config.dimensions {
            return Err(DbError::DimensionMismatch {
                expected: self.config.dimensions,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    fn grow(&self, at_least: usize) -> DbResult<()> {
        let target = at_least.max(self.index.capacity() * 2).max(MIN_RESERVE);
        trace!("Reserving HNSW capacity {}", target);
        self.index
            .reserve(target)
            .map_err(|e| DbError::vector_op("reserve", e.to_string()))
    }
}

impl VectorIndexBackend for HnswVectorIndex {
    fn add(&mut self, id: VectorId, vector: &[f32]) -> DbResult<()> {
        self.check_dimension(vector)?;

        if self.index.contains(id.value()) {
            self.remove(id)?;
        }
        if self.index.size() + 1 > self.index.capacity() {
            self.grow(self.index.size() + 1)?;
        }

        // Removed nodes can still occupy slots; retry once after growing.
        if self.index.add(id.value(), vector).is_err() {
            self.grow(self.index.capacity() + 1)?;
            self.index
                .add(id.value(), vector)
                .map_err(|e| DbError::vector_op("add", format!("key {}: {}", id, e)))?;
        }
        Ok(())
    }

    fn remove(&mut self, id: VectorId) -> DbResult<bool> {
        if !self.index.contains(id.value()) {
            return Ok(false);
        }
        let removed = self
            .index
            .remove(id.value())
            .map_err(|e| DbError::vector_op("remove", format!("key {}: {}", id, e)))?;
        Ok(removed > 0)
    }

    fn search(&self, query: &[f32], k: usize) -> DbResult<Vec<VectorMatch>> {
        self.check_dimension(query)?;
        if k == 0 || self.index.size() == 0 {
            return Ok(Vec::new());
        }

        let matches = self
            .index
            .search(query, k.min(self.index.size()))
            .map_err(|e| DbError::vector_op("search", e.to_string()))?;

        let mut hits: Vec<VectorMatch> = matches
            .keys
            .iter()
            .zip(matches.distances.iter())
            .map(|(key, distance)| VectorMatch {
                id: VectorId(*key),
                distance: *distance,
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        Ok(hits)
    }

    fn contains(&self, id: VectorId) -> bool {
        self.index.contains(id.value())
    }

    fn len(&self) -> usize {
        self.index.size()
    }

    fn dimension(&self) -> usize {
        self.config.dimensions
    }
}
