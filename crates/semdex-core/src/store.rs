//! Persisted index state: the vector index and metadata store of one name.
//!
//! The two files are always written vector first, metadata second, each with
//! temp-then-rename. A crash between the renames leaves metadata one step
//! behind the vectors:
//!
//! - an added vector without metadata is an orphan that the next upsert of
//!   that ID replaces (IDs come from the metadata's `next_id`);
//! - a deleted vector still named by metadata is pruned on load.

use std::fs;
use std::path::{Path, PathBuf};

use semdex_db::{
    DocumentMetadata, HnswConfig, HnswVectorIndex, MetadataStore, VectorId, VectorIndexBackend,
};
use tracing::{debug, warn};

use crate::constants::{
    DATA_DIR, DATA_DIR_GITIGNORE, KNOWLEDGE_DIR, LOCK_FILE_SUFFIX, METADATA_FILE_SUFFIX,
    VECTOR_FILE_SUFFIX,
};
use crate::db_adapter::IntoSemdexResult;
use crate::errors::{SemdexError, SemdexResult};

// ============================================================================
// Paths
// ============================================================================

/// On-disk locations of one named index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPaths {
    pub data_dir: PathBuf,
    pub knowledge_dir: PathBuf,
    pub vectors: PathBuf,
    pub metadata: PathBuf,
    pub lock: PathBuf,
}

impl IndexPaths {
    pub fn new(project_root: &Path, name: &str) -> Self {
        let data_dir = project_root.join(DATA_DIR);
        let knowledge_dir = data_dir.join(KNOWLEDGE_DIR);
        Self {
            vectors: knowledge_dir.join(format!("{name}{VECTOR_FILE_SUFFIX}")),
            metadata: knowledge_dir.join(format!("{name}{METADATA_FILE_SUFFIX}")),
            lock: knowledge_dir.join(format!("{name}{LOCK_FILE_SUFFIX}")),
            data_dir,
            knowledge_dir,
        }
    }

    /// A committed index has its metadata file; the vector file is written first.
    pub fn exists(&self) -> bool {
        self.metadata.is_file()
    }

    /// Create the data directory and its `.gitignore`.
    pub fn ensure_dirs(&self) -> SemdexResult<()> {
        fs::create_dir_all(&self.knowledge_dir).map_err(|e| SemdexError::WriteFailure {
            path: self.knowledge_dir.clone(),
            message: e.to_string(),
        })?;

        let gitignore = self.data_dir.join(".gitignore");
        if !gitignore.exists() {
            fs::write(&gitignore, DATA_DIR_GITIGNORE).map_err(|e| SemdexError::WriteFailure {
                path: gitignore.clone(),
                message: e.to_string(),
            })?;
            debug!("Created {}", gitignore.display());
        }
        Ok(())
    }
}

// ============================================================================
// IndexState
// ============================================================================

/// Whether an upsert created a document or replaced one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Added(VectorId),
    Updated(VectorId),
}

/// The in-memory pair for one index, loaded for the duration of an operation.
#[derive(Debug)]
pub struct IndexState {
    name: String,
    vectors: HnswVectorIndex,
    metadata: MetadataStore,
}

impl IndexState {
    /// An empty index for `name`, sized for `capacity` documents.
    pub fn create(
        name: &str,
        model_id: &str,
        dimension: usize,
        capacity: usize,
    ) -> SemdexResult<Self> {
        let vectors =
            HnswVectorIndex::with_capacity(HnswConfig::new(dimension), capacity).for_index(name)?;
        Ok(Self {
            name: name.to_string(),
            vectors,
            metadata: MetadataStore::new(name, model_id, dimension),
        })
    }

    /// An empty index that replaces the committed state of `name`.
    ///
    /// IDs continue from the committed `next_id` when that metadata still
    /// parses. If a crash lands between the two renames of the rebuild, the
    /// old metadata names no ID of the new vector file and is pruned on load.
    pub fn rebuild(
        name: &str,
        paths: &IndexPaths,
        model_id: &str,
        dimension: usize,
        capacity: usize,
    ) -> SemdexResult<Self> {
        let mut state = Self::create(name, model_id, dimension, capacity)?;
        if let Some(next_id) = committed_next_id(paths) {
            debug!("Rebuilding {} with IDs from {}", name, next_id);
            state.metadata = state.metadata.with_next_id(next_id);
        }
        Ok(state)
    }

    /// Load the committed state of `name`.
    ///
    /// `IndexNotFound` when the index was never built; `CorruptIndex` when a
    /// file does not parse or the pair disagrees.
    pub fn load(name: &str, paths: &IndexPaths) -> SemdexResult<Self> {
        if !paths.exists() {
            return Err(SemdexError::IndexNotFound {
                index: name.to_string(),
            });
        }

        let mut metadata = MetadataStore::load(&paths.metadata).for_index(name)?;
        if metadata.index_name() != name {
            return Err(SemdexError::corrupt(
                name,
                &paths.metadata,
                format!("metadata belongs to index `{}`", metadata.index_name()),
            ));
        }

        if !paths.vectors.is_file() {
            return Err(SemdexError::corrupt(
                name,
                &paths.vectors,
                "vector index file is missing",
            ));
        }
        let vectors = HnswVectorIndex::load(&paths.vectors, HnswConfig::new(metadata.dimension()))
            .for_index(name)?;

        let stale: Vec<String> = metadata
            .ids()
            .filter(|id| !vectors.contains(*id))
            .filter_map(|id| metadata.path_of(id).map(str::to_string))
            .collect();
        if !stale.is_empty() {
            warn!(
                "Index {} metadata names {} document(s) missing from the vector index; dropping them",
                name,
                stale.len()
            );
            for path in &stale {
                metadata.remove(path);
            }
        }

        Ok(Self {
            name: name.to_string(),
            vectors,
            metadata,
        })
    }

    /// Commit both files, vectors first.
    pub fn save(&mut self, paths: &IndexPaths) -> SemdexResult<()> {
        paths.ensure_dirs()?;
        self.metadata.touch();
        self.vectors.save(&paths.vectors).for_index(&self.name)?;
        self.metadata.save(&paths.metadata).for_index(&self.name)?;
        debug!(
            "Committed index {} ({} documents)",
            self.name,
            self.metadata.len()
        );
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    pub fn vectors(&self) -> &HnswVectorIndex {
        &self.vectors
    }

    /// Fail with `EmbeddingModelMismatch` unless the index was built with
    /// `model_id` at `dimension`.
    pub fn check_embedding(&self, model_id: &str, dimension: usize) -> SemdexResult<()> {
        if self.metadata.model_id() != model_id || self.metadata.dimension() != dimension {
            return Err(SemdexError::EmbeddingModelMismatch {
                index: self.name.clone(),
                index_model: self.metadata.model_id().to_string(),
                index_dimension: self.metadata.dimension(),
                active_model: model_id.to_string(),
                active_dimension: dimension,
            });
        }
        Ok(())
    }

    /// Insert or replace the document at `meta.path`.
    ///
    /// A known path keeps its ID and has its vector replaced in place; an
    /// unknown path gets a freshly allocated ID. The vector is written before
    /// the metadata so a failed add never leaves metadata pointing nowhere.
    pub fn upsert(&mut self, meta: DocumentMetadata, vector: &[f32]) -> SemdexResult<Upsert> {
        match self.metadata.id_of(&meta.path) {
            Some(id) => {
                self.vectors.add(id, vector).for_index(&self.name)?;
                self.metadata.put(id, meta).for_index(&self.name)?;
                Ok(Upsert::Updated(id))
            }
            None => {
                let id = self.metadata.allocate_id();
                self.vectors.add(id, vector).for_index(&self.name)?;
                self.metadata.put(id, meta).for_index(&self.name)?;
                Ok(Upsert::Added(id))
            }
        }
    }

    /// Remove `path` from both stores. Absent paths are a no-op.
    pub fn remove(&mut self, path: &str) -> SemdexResult<bool> {
        let Some((id, _)) = self.metadata.remove(path) else {
            return Ok(false);
        };
        self.vectors.remove(id).for_index(&self.name)?;
        Ok(true)
    }
}

fn committed_next_id(paths: &IndexPaths) -> Option<u64> {
    if !paths.exists() {
        return None;
    }
    match MetadataStore::load(&paths.metadata) {
        Ok(store) => Some(store.next_id()),
        Err(e) => {
            warn!(
                "Cannot read previous metadata at {}, IDs restart: {}",
                paths.metadata.display(),
                e
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use tempfile::TempDir;

    fn unit(dim: usize, axis: usize) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[axis] = 1.0;
        v
    }

    #[test]
    fn test_paths_layout() {
        let paths = IndexPaths::new(Path::new("/repo"), "docs");
        assert_eq!(paths.vectors, Path::new("/repo/.semdex/knowledge/docs.usearch"));
        assert_eq!(paths.metadata, Path::new("/repo/.semdex/knowledge/docs.meta.json"));
        assert_eq!(paths.lock, Path::new("/repo/.semdex/knowledge/docs.lock"));
    }

    #[test]
    fn test_load_missing_is_index_not_found() {
        let dir = TempDir::new().unwrap();
        let err = IndexState::load("docs", &IndexPaths::new(dir.path(), "docs")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IndexNotFound);
    }

    #[test]
    fn test_upsert_remove_save_load() {
        let dir = TempDir::new().unwrap();
        let paths = IndexPaths::new(dir.path(), "docs");

        let mut state = IndexState::create("docs", "mock", 4, 8).unwrap();
        let a = state
            .upsert(DocumentMetadata::new("docs/a.md"), &unit(4, 0))
            .unwrap();
        let b = state
            .upsert(DocumentMetadata::new("docs/b.md"), &unit(4, 1))
            .unwrap();
        assert_eq!(a, Upsert::Added(VectorId(1)));
        assert_eq!(b, Upsert::Added(VectorId(2)));

        let again = state
            .upsert(
                DocumentMetadata::new("docs/a.md").with_description("edited"),
                &unit(4, 2),
            )
            .unwrap();
        assert_eq!(again, Upsert::Updated(VectorId(1)));

        assert!(state.remove("docs/b.md").unwrap());
        assert!(!state.remove("docs/b.md").unwrap());
        state.save(&paths).unwrap();

        assert_eq!(
            fs::read_to_string(paths.data_dir.join(".gitignore")).unwrap(),
            "*\n"
        );

        let loaded = IndexState::load("docs", &paths).unwrap();
        assert_eq!(loaded.metadata().len(), 1);
        assert_eq!(loaded.metadata().next_id(), 3);
        assert_eq!(
            loaded.metadata().get("docs/a.md").unwrap().description,
            "edited"
        );
        assert_eq!(loaded.vectors().len(), 1);
    }

    #[test]
    fn test_stale_metadata_is_pruned_on_load() {
        let dir = TempDir::new().unwrap();
        let paths = IndexPaths::new(dir.path(), "docs");

        let mut state = IndexState::create("docs", "mock", 4, 8).unwrap();
        state
            .upsert(DocumentMetadata::new("docs/a.md"), &unit(4, 0))
            .unwrap();
        state
            .upsert(DocumentMetadata::new("docs/b.md"), &unit(4, 1))
            .unwrap();
        state.save(&paths).unwrap();

        // Simulate a crash after the vector rename of a deletion.
        let mut vectors = HnswVectorIndex::load(&paths.vectors, HnswConfig::new(4)).unwrap();
        vectors.remove(VectorId(2)).unwrap();
        vectors.save(&paths.vectors).unwrap();

        let loaded = IndexState::load("docs", &paths).unwrap();
        assert!(loaded.metadata().get("docs/b.md").is_none());
        assert_eq!(loaded.metadata().len(), 1);
    }

    #[test]
    fn test_rebuild_continues_ids_and_outlives_crash() {
        let dir = TempDir::new().unwrap();
        let paths = IndexPaths::new(dir.path(), "docs");

        let fresh = IndexState::rebuild("docs", &paths, "mock", 4, 8).unwrap();
        assert_eq!(fresh.metadata().next_id(), 1);

        let mut state = IndexState::create("docs", "mock", 4, 8).unwrap();
        state
            .upsert(DocumentMetadata::new("docs/a.md"), &unit(4, 0))
            .unwrap();
        state
            .upsert(DocumentMetadata::new("docs/b.md"), &unit(4, 1))
            .unwrap();
        state.save(&paths).unwrap();
        let old_metadata = fs::read(&paths.metadata).unwrap();

        let mut rebuilt = IndexState::rebuild("docs", &paths, "mock", 4, 8).unwrap();
        let b = rebuilt
            .upsert(DocumentMetadata::new("docs/b.md"), &unit(4, 1))
            .unwrap();
        assert_eq!(b, Upsert::Added(VectorId(3)));
        rebuilt.save(&paths).unwrap();

        // Crash between the renames: new vectors, old metadata.
        fs::write(&paths.metadata, old_metadata).unwrap();
        let loaded = IndexState::load("docs", &paths).unwrap();
        assert!(loaded.metadata().is_empty());
        assert_eq!(loaded.metadata().next_id(), 3);
    }

    #[test]
    fn test_garbage_files_are_corrupt() {
        let dir = TempDir::new().unwrap();
        let paths = IndexPaths::new(dir.path(), "docs");
        let mut state = IndexState::create("docs", "mock", 4, 8).unwrap();
        state.save(&paths).unwrap();

        fs::write(&paths.vectors, b"truncated").unwrap();
        let err = IndexState::load("docs", &paths).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptIndex);

        fs::write(&paths.metadata, b"{ not json").unwrap();
        let err = IndexState::load("docs", &paths).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptIndex);
    }

    #[test]
    fn test_embedding_mismatch() {
        let state = IndexState::create("docs", "model-a", 4, 8).unwrap();
        assert!(state.check_embedding("model-a", 4).is_ok());
        let err = state.check_embedding("model-b", 4).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmbeddingMismatch);
        let err = state.check_embedding("model-a", 8).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmbeddingMismatch);
    }
}
