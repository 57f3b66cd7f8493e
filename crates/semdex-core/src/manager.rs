//! The index manager: the entry point for search, reindex and inspection.
//!
//! Every call is self-contained. State is loaded from disk, used, and (for
//! mutations) committed back before returning; nothing is cached between
//! calls except the embedding model inside the provider.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use semdex_db::{DocumentMetadata, VectorIndexBackend};
use tracing::{debug, info};

use crate::config::{EngineConfig, IndexConfig, IndexRegistry, PerformanceConfig, SearchConfig};
use crate::constants::DEFAULT_EMBED_BATCH_SIZE;
use crate::db_adapter::IntoSemdexResult;
use crate::embedding::{EmbeddingProvider, LazyEmbeddingProvider};
use crate::errors::{SemdexError, SemdexResult};
use crate::search::{materialize, rank};
use crate::store::{IndexPaths, IndexState};
use crate::types::{IndexStatus, SearchOptions, SearchResults};

/// Orchestrates the configured indexes of one project.
///
/// # Example
///
/// ```ignore
/// use semdex_core::{EngineConfig, IndexManager, IndexRegistry, SearchOptions};
///
/// let config = EngineConfig::load_or_default(root)?;
/// let manager = IndexManager::from_config(root, IndexRegistry::builtin(), config)?;
/// manager.reindex("docs")?;
/// let hits = manager.search("docs", "how to handle API authentication", SearchOptions::default())?;
/// ```
pub struct IndexManager {
    pub(crate) project_root: PathBuf,
    pub(crate) registry: IndexRegistry,
    pub(crate) embedder: Arc<dyn EmbeddingProvider>,
    pub(crate) search_config: SearchConfig,
    pub(crate) performance: PerformanceConfig,
    pub(crate) batch_size: usize,
}

impl std::fmt::Debug for IndexManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexManager")
            .field("project_root", &self.project_root)
            .field("indexes", &self.registry.names().collect::<Vec<_>>())
            .field("model_id", &self.embedder.model_id())
            .field("search_config", &self.search_config)
            .finish()
    }
}

impl IndexManager {
    /// Manager with an injected embedding provider and default tunables.
    pub fn new(
        project_root: impl Into<PathBuf>,
        registry: IndexRegistry,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            project_root: project_root.into(),
            registry,
            embedder,
            search_config: SearchConfig::default(),
            performance: PerformanceConfig::default(),
            batch_size: DEFAULT_EMBED_BATCH_SIZE,
        }
    }

    /// Manager backed by the lazily loaded Candle model described by `config`.
    pub fn from_config(
        project_root: impl Into<PathBuf>,
        registry: IndexRegistry,
        config: EngineConfig,
    ) -> SemdexResult<Self> {
        for warning in config.validate()? {
            tracing::warn!("Config warning: {}", warning);
        }
        let batch_size = config.embedding.batch_size;
        let embedder = Arc::new(LazyEmbeddingProvider::new(config.embedding));
        Ok(Self::new(project_root, registry, embedder)
            .with_search_config(config.search)
            .with_performance(config.performance)
            .with_batch_size(batch_size))
    }

    pub fn with_search_config(mut self, search_config: SearchConfig) -> Self {
        self.search_config = search_config;
        self
    }

    pub fn with_performance(mut self, performance: PerformanceConfig) -> Self {
        self.performance = performance;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn registry(&self) -> &IndexRegistry {
        &self.registry
    }

    pub fn search_config(&self) -> &SearchConfig {
        &self.search_config
    }

    pub(crate) fn paths(&self, name: &str) -> IndexPaths {
        IndexPaths::new(&self.project_root, name)
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    /// Whether `name` is configured and has been built.
    pub fn index_exists(&self, name: &str) -> bool {
        self.registry.get(name).is_some() && self.paths(name).exists()
    }

    /// Every configured index with whether it has been built.
    pub fn list_indexes(&self) -> Vec<(IndexConfig, bool)> {
        self.registry
            .iter()
            .map(|config| (config.clone(), self.paths(&config.name).exists()))
            .collect()
    }

    /// Summary of a built index. Reads metadata only.
    pub fn status(&self, name: &str) -> SemdexResult<IndexStatus> {
        self.registry.resolve(name)?;
        let paths = self.paths(name);
        if !paths.exists() {
            return Err(SemdexError::IndexNotFound {
                index: name.to_string(),
            });
        }
        let metadata = semdex_db::MetadataStore::load(&paths.metadata).for_index(name)?;
        Ok(IndexStatus {
            index: name.to_string(),
            document_count: metadata.len(),
            total_tokens: metadata.total_tokens(),
            next_id: metadata.next_id(),
            last_updated: metadata.last_updated(),
            model_id: metadata.model_id().to_string(),
            dimension: metadata.dimension(),
        })
    }

    /// The live documents of a built index, sorted by path.
    pub fn documents(&self, name: &str) -> SemdexResult<Vec<DocumentMetadata>> {
        self.registry.resolve(name)?;
        let state = IndexState::load(name, &self.paths(name))?;
        let mut docs: Vec<DocumentMetadata> = state.metadata().documents().cloned().collect();
        docs.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(docs)
    }

    // ------------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------------

    /// Rank the documents of `name` against `query`.
    ///
    /// Takes no lock: it reads the last committed state.
    pub fn search(
        &self,
        name: &str,
        query: &str,
        options: SearchOptions,
    ) -> SemdexResult<SearchResults> {
        self.registry.resolve(name)?;
        let state = IndexState::load(name, &self.paths(name))?;
        if state.metadata().is_empty() {
            debug!("Index {} is empty", name);
            return Ok(SearchResults::default());
        }

        let query_vector = self.embedder.embed(query)?;
        let dimension = state.metadata().dimension();
        if query_vector.len() != dimension {
            return Err(SemdexError::EmbeddingModelMismatch {
                index: name.to_string(),
                index_model: state.metadata().model_id().to_string(),
                index_dimension: dimension,
                active_model: self.embedder.model_id().to_string(),
                active_dimension: query_vector.len(),
            });
        }

        let matches = state
            .vectors()
            .search(&query_vector, self.search_config.k)
            .for_index(name)?;
        let hits = rank(
            &matches,
            |id| state.metadata().get_by_id(id),
            &self.search_config,
            options,
        );
        let results = materialize(hits, &self.project_root);

        info!(
            "Search {} returned {} of {} candidates",
            name,
            results.len(),
            matches.len()
        );
        Ok(SearchResults { results })
    }

    /// Embed `bodies`, checking the count and dimension of what comes back.
    pub(crate) fn embed_bodies(
        &self,
        bodies: &[String],
        dimension: usize,
    ) -> SemdexResult<Vec<Vec<f32>>> {
        let vectors = self.embedder.embed_batch(bodies)?;
        if vectors.len() != bodies.len() {
            return Err(SemdexError::EmbeddingFailed {
                model_id: self.embedder.model_id().to_string(),
                reason: format!(
                    "{} vectors returned for {} inputs",
                    vectors.len(),
                    bodies.len()
                ),
            });
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(SemdexError::EmbeddingFailed {
                model_id: self.embedder.model_id().to_string(),
                reason: format!("vector has {} dimensions, expected {}", bad.len(), dimension),
            });
        }
        Ok(vectors)
    }
}
