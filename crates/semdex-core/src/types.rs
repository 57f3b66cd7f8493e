//! Input and result types of the index manager.
//!
//! Result types serialize with the field names the CLI layer reports
//! (`files_indexed`, `missing_references`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// FileChange
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

/// One changed path, as derived from a version-control diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// Path relative to the project root.
    pub path: String,
    pub kind: ChangeKind,
}

impl FileChange {
    pub fn added(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Added,
        }
    }

    pub fn modified(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Modified,
        }
    }

    pub fn deleted(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Deleted,
        }
    }
}

// ============================================================================
// Search
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Never attach full document bodies.
    pub metadata_only: bool,
}

impl SearchOptions {
    pub fn metadata_only() -> Self {
        Self {
            metadata_only: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub resource_path: String,
    pub similarity: f32,
    pub token_count: u64,
    pub description: String,
    pub relevant_files: Vec<String>,
    /// Full document body, only for results at or above the full-context threshold.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_resource_context: Option<String>,
}

impl SearchResult {
    pub fn has_full_context(&self) -> bool {
        self.full_resource_context.is_some()
    }
}

/// Ordered search hits, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SearchResults {
    pub results: Vec<SearchResult>,
}

impl SearchResults {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SearchResult> {
        self.results.iter()
    }

    pub fn paths(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.resource_path.as_str()).collect()
    }

    /// Sum of token counts over all results.
    pub fn total_tokens(&self) -> u64 {
        self.results.iter().map(|r| r.token_count).sum()
    }

    /// Split into (full-context, metadata-only) subsets, each in rank order.
    pub fn split_by_context(self) -> (Vec<SearchResult>, Vec<SearchResult>) {
        self.results
            .into_iter()
            .partition(SearchResult::has_full_context)
    }

    pub fn into_vec(self) -> Vec<SearchResult> {
        self.results
    }
}

impl IntoIterator for SearchResults {
    type Item = SearchResult;
    type IntoIter = std::vec::IntoIter<SearchResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

// ============================================================================
// Reindex
// ============================================================================

/// A file a full reindex could not read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDocument {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FullReindexResult {
    pub index: String,
    pub files_indexed: usize,
    pub total_tokens: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedDocument>,
}

/// A document rejected by incremental reindex for referencing missing paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingReference {
    pub doc_path: String,
    pub missing_files: Vec<String>,
}

/// Serializes with a computed `success` key alongside the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncrementalReindexResult {
    pub index: String,
    pub files_added: usize,
    pub files_updated: usize,
    pub files_removed: usize,
    /// Changes whose path this index does not accept.
    pub files_skipped: usize,
    pub missing_references: Vec<MissingReference>,
}

impl IncrementalReindexResult {
    pub(crate) fn new(index: &str) -> Self {
        Self {
            index: index.to_string(),
            ..Default::default()
        }
    }

    /// False iff any document was rejected, even if others were applied.
    pub fn success(&self) -> bool {
        self.missing_references.is_empty()
    }

    /// Whether anything was written to the index.
    pub fn changed(&self) -> bool {
        self.files_added + self.files_updated + self.files_removed > 0
    }
}

impl Serialize for IncrementalReindexResult {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("IncrementalReindexResult", 7)?;
        state.serialize_field("index", &self.index)?;
        state.serialize_field("success", &self.success())?;
        state.serialize_field("files_added", &self.files_added)?;
        state.serialize_field("files_updated", &self.files_updated)?;
        state.serialize_field("files_removed", &self.files_removed)?;
        state.serialize_field("files_skipped", &self.files_skipped)?;
        state.serialize_field("missing_references", &self.missing_references)?;
        state.end()
    }
}

// ============================================================================
// Status
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStatus {
    pub index: String,
    pub document_count: usize,
    pub total_tokens: u64,
    pub next_id: u64,
    pub last_updated: DateTime<Utc>,
    pub model_id: String,
    pub dimension: usize,
}
