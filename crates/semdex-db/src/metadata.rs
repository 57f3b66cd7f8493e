//! Document metadata store.
//!
//! The companion of the vector blob: a JSON file mapping vector IDs to
//! document paths and carrying the per-document metadata returned by search.
//!
//! ## Invariants
//!
//! - `id_to_path` and `path_to_id` are mutual inverses.
//! - `documents` has exactly the keys of `path_to_id`.
//! - `next_id` is greater than every ID ever allocated; IDs are never reused.
//!
//! Every mutation goes through methods that keep these true, and `load`
//! refuses files that break them.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::atomic::atomic_write;
use crate::error::{DbError, DbResult};
use crate::vector::VectorId;

/// Current on-disk format version.
pub const METADATA_FORMAT_VERSION: u32 = 1;

/// First ID handed out by a fresh store.
pub const FIRST_ID: u64 = 1;

// ============================================================================
// DocumentMetadata
// ============================================================================

/// What search returns about a document, besides its similarity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Path relative to the project root, `/`-separated.
    pub path: String,
    #[serde(default)]
    pub description: String,
    /// Paths the document references, in order of first mention.
    #[serde(default)]
    pub relevant_files: Vec<String>,
    /// Estimated cost of the full body, in tokens.
    #[serde(default)]
    pub token_count: u64,
}

impl DocumentMetadata {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            description: String::new(),
            relevant_files: Vec::new(),
            token_count: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_relevant_files(mut self, files: Vec<String>) -> Self {
        self.relevant_files = files;
        self
    }

    pub fn with_token_count(mut self, token_count: u64) -> Self {
        self.token_count = token_count;
        self
    }
}

// ============================================================================
// MetadataStore
// ============================================================================

/// ID ↔ path mapping plus per-document metadata for one named index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataStore {
    version: u32,
    index_name: String,
    /// Embedding model the vectors were produced with.
    model_id: String,
    dimension: usize,
    id_to_path: BTreeMap<u64, String>,
    path_to_id: BTreeMap<String, u64>,
    documents: BTreeMap<String, DocumentMetadata>,
    next_id: u64,
    last_updated: DateTime<Utc>,
}

impl MetadataStore {
    /// An empty store for a freshly built index.
    pub fn new(index_name: impl Into<String>, model_id: impl Into<String>, dimension: usize) -> Self {
        Self {
            version: METADATA_FORMAT_VERSION,
            index_name: index_name.into(),
            model_id: model_id.into(),
            dimension,
            id_to_path: BTreeMap::new(),
            path_to_id: BTreeMap::new(),
            documents: BTreeMap::new(),
            next_id: FIRST_ID,
            last_updated: Utc::now(),
        }
    }

    /// Start allocating at `next_id` instead of [`FIRST_ID`].
    ///
    /// A rebuild carries the counter of the store it replaces, so IDs stay
    /// unique across the whole life of an index.
    pub fn with_next_id(mut self, next_id: u64) -> Self {
        self.next_id = next_id.max(FIRST_ID);
        self
    }

    // ------------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------------

    pub fn get(&self, path: &str) -> Option<&DocumentMetadata> {
        self.documents.get(path)
    }

    pub fn id_of(&self, path: &str) -> Option<VectorId> {
        self.path_to_id.get(path).copied().map(VectorId)
    }

    pub fn path_of(&self, id: VectorId) -> Option<&str> {
        self.id_to_path.get(&id.value()).map(String::as_str)
    }

    /// Metadata for the document stored under `id`.
    pub fn get_by_id(&self, id: VectorId) -> Option<&DocumentMetadata> {
        self.path_of(id).and_then(|path| self.documents.get(path))
    }

    /// Live documents, sorted by path.
    pub fn documents(&self) -> impl Iterator<Item = &DocumentMetadata> {
        self.documents.values()
    }

    /// Live IDs, ascending.
    pub fn ids(&self) -> impl Iterator<Item = VectorId> + '_ {
        self.id_to_path.keys().copied().map(VectorId)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn total_tokens(&self) -> u64 {
        self.documents.values().map(|d| d.token_count).sum()
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Hand out a fresh ID. The only way IDs come into existence.
    pub fn allocate_id(&mut self) -> VectorId {
        let id = self.next_id;
        self.next_id += 1;
        VectorId(id)
    }

    /// Store `meta` under `id`.
    ///
    /// `id` must have been allocated by this store. Re-putting a path under
    /// the ID it already has replaces its metadata; binding a path or an ID
    /// that is already bound to something else is a conflict.
    pub fn put(&mut self, id: VectorId, meta: DocumentMetadata) -> DbResult<()> {
        if id.value() < FIRST_ID || id.value() >= self.next_id {
            return Err(DbError::metadata_conflict(format!(
                "id {} was not allocated by this store (next id {})",
                id, self.next_id
            )));
        }
        if let Some(existing) = self.path_to_id.get(&meta.path) {
            if *existing != id.value() {
                return Err(DbError::metadata_conflict(format!(
                    "path '{}' is already bound to id {}",
                    meta.path, existing
                )));
            }
        }
        if let Some(existing) = self.id_to_path.get(&id.value()) {
            if *existing != meta.path {
                return Err(DbError::metadata_conflict(format!(
                    "id {} is already bound to '{}'",
                    id, existing
                )));
            }
        }

        self.id_to_path.insert(id.value(), meta.path.clone());
        self.path_to_id.insert(meta.path.clone(), id.value());
        self.documents.insert(meta.path.clone(), meta);
        Ok(())
    }

    /// Drop `path` from all three maps. Returns its former ID and metadata.
    pub fn remove(&mut self, path: &str) -> Option<(VectorId, DocumentMetadata)> {
        let id = self.path_to_id.remove(path)?;
        self.id_to_path.remove(&id);
        let meta = self
            .documents
            .remove(path)
            .unwrap_or_else(|| DocumentMetadata::new(path));
        Some((VectorId(id), meta))
    }

    /// Stamp the store as modified now.
    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    // ------------------------------------------------------------------------
    // Invariants & persistence
    // ------------------------------------------------------------------------

    /// Describe the first broken invariant, if any.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.id_to_path.len() != self.path_to_id.len() {
            return Err(format!(
                "id_to_path has {} entries but path_to_id has {}",
                self.id_to_path.len(),
                self.path_to_id.len()
            ));
        }
        for (id, path) in &self.id_to_path {
            if self.path_to_id.get(path) != Some(id) {
                return Err(format!("id {} maps to '{}' but not back", id, path));
            }
            if *id >= self.next_id {
                return Err(format!("id {} is not below next_id {}", id, self.next_id));
            }
        }
        if self.documents.len() != self.path_to_id.len()
            || !self.documents.keys().eq(self.path_to_id.keys())
        {
            return Err("documents keys differ from path_to_id keys".to_string());
        }
        if let Some((key, doc)) = self.documents.iter().find(|(k, d)| **k != d.path) {
            return Err(format!("document key '{}' holds path '{}'", key, doc.path));
        }
        Ok(())
    }

    /// Write the store as pretty JSON with temp-then-rename.
    pub fn save(&self, path: &Path) -> DbResult<()> {
        let json = serde_json::to_vec_pretty(self)?;
        atomic_write(path, &json)?;
        debug!("Saved metadata for '{}' to {:?}", self.index_name, path);
        Ok(())
    }

    /// Read and verify a persisted store.
    pub fn load(path: &Path) -> DbResult<Self> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DbError::IndexNotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let store: MetadataStore = serde_json::from_slice(&bytes)
            .map_err(|e| DbError::metadata_parse(path, e.to_string()))?;

        if store.version > METADATA_FORMAT_VERSION {
            return Err(DbError::UnsupportedVersion {
                path: path.to_path_buf(),
                found: store.version,
                supported: METADATA_FORMAT_VERSION,
            });
        }
        store
            .check_invariants()
            .map_err(|message| DbError::metadata_parse(path, message))?;

        debug!(
            "Loaded metadata for '{}' ({} documents, next id {})",
            store.index_name,
            store.len(),
            store.next_id
        );
        Ok(store)
    }
}
