//! Configuration for semdex.
//!
//! Two layers:
//!
//! - [`IndexRegistry`]: the immutable `name → IndexConfig` table describing
//!   each knowledge base. Injected into the index manager; never global.
//! - [`EngineConfig`]: tunables loaded from `.semdex/config.yaml` (search
//!   numerics, embedding model, performance). Every field has a default, so a
//!   missing file is not an error.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use semdex_model::EmbeddingConfig;

use crate::constants::{should_ignore_dir, CONFIG_FILENAME, DATA_DIR};
use crate::errors::{SemdexError, SemdexResult};

// ============================================================================
// IndexConfig
// ============================================================================

/// One named knowledge base: where its documents live and which files count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Unique key; also the file stem of the persisted index.
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Directories scanned by a full reindex, relative to the project root.
    pub roots: Vec<String>,

    /// Accepted extensions, lowercase, without the dot.
    pub extensions: Vec<String>,

    /// File names that never count, such as navigation-only `README.md`.
    #[serde(default)]
    pub exclude_names: Vec<String>,
}

impl IndexConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            roots: Vec::new(),
            extensions: Vec::new(),
            exclude_names: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.roots.push(normalize_rel_path(&root.into()));
        self
    }

    pub fn with_extension(mut self, ext: impl AsRef<str>) -> Self {
        self.extensions
            .push(ext.as_ref().trim_start_matches('.').to_ascii_lowercase());
        self
    }

    pub fn with_excluded_name(mut self, name: impl Into<String>) -> Self {
        self.exclude_names.push(name.into());
        self
    }

    /// Whether `rel_path` (relative to the project root) belongs to this index.
    ///
    /// The path must sit under one of the roots, carry an accepted extension,
    /// not be an excluded name, and not pass through a hidden or
    /// build-artifact component below its root.
    pub fn accepts(&self, rel_path: &str) -> bool {
        let path = normalize_rel_path(rel_path);
        let Some(below_root) = self.roots.iter().find_map(|root| strip_root(&path, root)) else {
            return false;
        };

        let components: Vec<&str> = below_root.split('/').collect();
        let Some((file_name, dirs)) = components.split_last() else {
            return false;
        };
        if file_name.is_empty() || file_name.starts_with('.') {
            return false;
        }
        if dirs
            .iter()
            .any(|d| d.is_empty() || *d == ".." || d.starts_with('.') || should_ignore_dir(d))
        {
            return false;
        }
        if self.exclude_names.iter().any(|n| n == file_name) {
            return false;
        }

        match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => {
                let ext = ext.to_ascii_lowercase();
                self.extensions.iter().any(|e| *e == ext)
            }
            _ => false,
        }
    }

    fn validate(&self) -> SemdexResult<()> {
        let name_ok = !self.name.is_empty()
            && self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !name_ok {
            return Err(SemdexError::invalid_config(
                format!("index name `{}` is not usable as a file name", self.name),
                "Use ASCII letters, digits, '-' or '_'",
            ));
        }
        if self.roots.is_empty() {
            return Err(SemdexError::invalid_config(
                format!("index `{}` has no roots", self.name),
                "Add at least one root directory",
            ));
        }
        if self.extensions.is_empty() {
            return Err(SemdexError::invalid_config(
                format!("index `{}` accepts no extensions", self.name),
                "Add at least one extension such as `md`",
            ));
        }
        Ok(())
    }
}

/// Normalize a relative path to `/` separators without a leading `./`.
pub fn normalize_rel_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut rest = path.as_str();
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }
    rest.trim_end_matches('/').to_string()
}

/// The part of `path` below `root`, or `None` when `path` is outside it.
fn strip_root<'a>(path: &'a str, root: &str) -> Option<&'a str> {
    if root.is_empty() || root == "." {
        return Some(path);
    }
    path.strip_prefix(root)?.strip_prefix('/')
}

// ============================================================================
// IndexRegistry
// ============================================================================

/// Immutable table of index configurations, in registration order.
#[derive(Debug, Clone)]
pub struct IndexRegistry {
    indexes: Vec<IndexConfig>,
    by_name: BTreeMap<String, usize>,
}

impl IndexRegistry {
    /// Build a registry, rejecting duplicate names and unusable configs.
    pub fn new(configs: impl IntoIterator<Item = IndexConfig>) -> SemdexResult<Self> {
        let mut indexes = Vec::new();
        let mut by_name = BTreeMap::new();
        for config in configs {
            config.validate()?;
            if by_name.contains_key(&config.name) {
                return Err(SemdexError::invalid_config(
                    format!("index `{}` is registered twice", config.name),
                    "Index names must be unique",
                ));
            }
            by_name.insert(config.name.clone(), indexes.len());
            indexes.push(config);
        }
        Ok(Self { indexes, by_name })
    }

    /// The compiled-in knowledge bases.
    pub fn builtin() -> Self {
        let docs = IndexConfig::new("docs")
            .with_description("Project documentation")
            .with_root("docs")
            .with_extension("md")
            .with_extension("mdx")
            .with_excluded_name("README.md");
        let roadmap = IndexConfig::new("roadmap")
            .with_description("Roadmap specs and planning documents")
            .with_root("roadmap")
            .with_extension("md")
            .with_excluded_name("README.md");

        let indexes = vec![docs, roadmap];
        let by_name = indexes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();
        Self { indexes, by_name }
    }

    pub fn get(&self, name: &str) -> Option<&IndexConfig> {
        self.by_name.get(name).map(|&i| &self.indexes[i])
    }

    /// Like [`get`](Self::get), failing with `UnknownIndex`.
    pub fn resolve(&self, name: &str) -> SemdexResult<&IndexConfig> {
        self.get(name)
            .ok_or_else(|| SemdexError::UnknownIndex(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexConfig> {
        self.indexes.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.indexes.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }
}

// ============================================================================
// SearchConfig
// ============================================================================

pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.7;
pub const DEFAULT_FULL_CONTEXT_THRESHOLD: f32 = 0.85;
pub const DEFAULT_TOKEN_BUDGET: u64 = 8000;
pub const DEFAULT_SEARCH_K: usize = 50;

/// Numeric search parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConfig {
    /// Results below this cosine similarity are dropped.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Results at or above this similarity carry the full document body.
    #[serde(default = "default_full_context_threshold")]
    pub full_context_threshold: f32,

    /// Token cap over every result after the first.
    #[serde(default = "default_token_budget")]
    pub token_budget: u64,

    /// Candidates fetched from the vector index before filtering.
    #[serde(default = "default_k")]
    pub k: usize,
}

fn default_similarity_threshold() -> f32 {
    DEFAULT_SIMILARITY_THRESHOLD
}
fn default_full_context_threshold() -> f32 {
    DEFAULT_FULL_CONTEXT_THRESHOLD
}
fn default_token_budget() -> u64 {
    DEFAULT_TOKEN_BUDGET
}
fn default_k() -> usize {
    DEFAULT_SEARCH_K
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            full_context_threshold: DEFAULT_FULL_CONTEXT_THRESHOLD,
            token_budget: DEFAULT_TOKEN_BUDGET,
            k: DEFAULT_SEARCH_K,
        }
    }
}

impl SearchConfig {
    /// Validates the search configuration, returning warnings for questionable values.
    ///
    /// # Errors
    /// Returns an error if `k` is 0 or a threshold lies outside `[-1, 1]`.
    pub fn validate(&self) -> SemdexResult<Vec<String>> {
        let mut warnings = Vec::new();

        if self.k == 0 {
            return Err(SemdexError::invalid_config(
                "search.k cannot be 0",
                "Set k to at least 1 (recommended: 50)",
            ));
        }

        for (key, value) in [
            ("search.similarityThreshold", self.similarity_threshold),
            ("search.fullContextThreshold", self.full_context_threshold),
        ] {
            if !(-1.0..=1.0).contains(&value) {
                return Err(SemdexError::invalid_config(
                    format!("{key}={value} is outside [-1, 1]"),
                    "Cosine similarity ranges from -1 to 1",
                ));
            }
        }

        if self.full_context_threshold < self.similarity_threshold {
            warnings.push(format!(
                "search.fullContextThreshold={} is below search.similarityThreshold={}; every result will carry full context",
                self.full_context_threshold, self.similarity_threshold
            ));
        }

        if self.token_budget == 0 {
            warnings.push(
                "search.tokenBudget=0; only the top result will ever be returned".to_string(),
            );
        }

        Ok(warnings)
    }
}

// ============================================================================
// PerformanceConfig
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceConfig {
    /// Read and parse documents on the rayon pool during a full reindex.
    #[serde(default = "default_parallel_reads")]
    pub parallel_reads: bool,
}

fn default_parallel_reads() -> bool {
    true
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            parallel_reads: default_parallel_reads(),
        }
    }
}

// ============================================================================
// EngineConfig
// ============================================================================

/// Engine tunables, loaded from `.semdex/config.yaml`.
///
/// ```yaml
/// search:
///   similarityThreshold: 0.7
///   fullContextThreshold: 0.85
///   tokenBudget: 8000
///   k: 50
/// embedding:
///   model_id: BAAI/bge-base-en-v1.5
///   device: auto
///   batch_size: 32
/// performance:
///   parallelReads: true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub performance: PerformanceConfig,
}

impl EngineConfig {
    /// Path of the config file for a project.
    pub fn path_for_project(project_root: &Path) -> PathBuf {
        project_root.join(DATA_DIR).join(CONFIG_FILENAME)
    }

    /// Load the project's config, or defaults when it has none.
    pub fn load_or_default(project_root: &Path) -> SemdexResult<Self> {
        Self::from_path(&Self::path_for_project(project_root))
    }

    /// Load the configuration from a specific path.
    ///
    /// If the file does not exist, returns a default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SemdexError::ConfigParse`] if the file exists but cannot be
    /// read or parsed, and [`SemdexError::InvalidConfiguration`] if a value
    /// cannot work.
    pub fn from_path(path: &Path) -> SemdexResult<Self> {
        if !path.exists() {
            tracing::debug!("Config not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| SemdexError::ConfigParse {
            path: path.to_path_buf(),
            message: format!("failed to read: {e}"),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| SemdexError::ConfigParse {
            path: path.to_path_buf(),
            message: format!("failed to parse: {e}"),
        })?;

        let warnings = config.validate()?;
        for warning in warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok(config)
    }

    /// Validate all sections, returning the combined warnings.
    pub fn validate(&self) -> SemdexResult<Vec<String>> {
        let mut warnings = self.search.validate()?;

        if self.embedding.batch_size == 0 {
            return Err(SemdexError::invalid_config(
                "embedding.batch_size cannot be 0",
                "Set batch_size to at least 1 (recommended: 32)",
            ));
        }
        if self.embedding.batch_size > 512 {
            warnings.push(format!(
                "embedding.batch_size={} is very large; may cause OOM on constrained devices",
                self.embedding.batch_size
            ));
        }
        if self.embedding.max_sequence_length == 0 {
            return Err(SemdexError::invalid_config(
                "embedding.max_sequence_length cannot be 0",
                "Use the model's limit (512 for BERT base models)",
            ));
        }

        Ok(warnings)
    }
}
