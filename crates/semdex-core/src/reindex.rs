//! Full and incremental reindex.
//!
//! Full reindex rebuilds an index from its roots into a fresh state and
//! replaces whatever was on disk. Incremental reindex applies a list of file
//! changes to the committed state.
//!
//! The two differ in reference handling: a full rebuild stores the extracted
//! `relevant_files` as found, while an incremental update rejects any
//! document whose references do not all exist.

use rayon::prelude::*;
use semdex_db::DocumentMetadata;
use tracing::{debug, info, warn};

use crate::config::normalize_rel_path;
use crate::discovery::discover_documents;
use crate::document::{prepare_document, PreparedDocument};
use crate::errors::SemdexResult;
use crate::lock::IndexLock;
use crate::manager::IndexManager;
use crate::references::validate;
use crate::store::{IndexState, Upsert};
use crate::types::{
    ChangeKind, FileChange, FullReindexResult, IncrementalReindexResult, MissingReference,
    SkippedDocument,
};

fn to_metadata(doc: &PreparedDocument, relevant_files: Vec<String>) -> DocumentMetadata {
    DocumentMetadata::new(doc.path.clone())
        .with_description(doc.description.clone())
        .with_relevant_files(relevant_files)
        .with_token_count(doc.token_count)
}

impl IndexManager {
    // ------------------------------------------------------------------------
    // Full reindex
    // ------------------------------------------------------------------------

    /// Rebuild `name` from scratch.
    ///
    /// Unreadable files are reported in `skipped` and do not abort the build.
    pub fn reindex(&self, name: &str) -> SemdexResult<FullReindexResult> {
        let config = self.registry.resolve(name)?.clone();
        let paths = self.paths(name);

        // Model load failures surface before anything is touched.
        let dimension = self.embedder.dimension()?;

        let _lock = IndexLock::acquire(&paths.lock)?;

        let files = discover_documents(&self.project_root, &config)?;
        debug!("Discovered {} document(s) for {}", files.len(), name);

        let read: Vec<SemdexResult<PreparedDocument>> = if self.performance.parallel_reads {
            files
                .par_iter()
                .map(|path| prepare_document(&self.project_root, path))
                .collect()
        } else {
            files
                .iter()
                .map(|path| prepare_document(&self.project_root, path))
                .collect()
        };

        let mut documents = Vec::with_capacity(read.len());
        let mut skipped = Vec::new();
        for (path, result) in files.iter().zip(read) {
            match result {
                Ok(doc) => documents.push(doc),
                Err(e) => {
                    warn!("Skipping {}: {}", path, e);
                    skipped.push(SkippedDocument {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let mut state = IndexState::rebuild(
            name,
            &paths,
            self.embedder.model_id(),
            dimension,
            documents.len(),
        )?;
        let mut total_tokens = 0u64;

        for batch in documents.chunks(self.batch_size) {
            let bodies: Vec<String> = batch.iter().map(|d| d.body.clone()).collect();
            let vectors = self.embed_bodies(&bodies, dimension)?;
            for (doc, vector) in batch.iter().zip(vectors) {
                state.upsert(to_metadata(doc, doc.relevant_files.clone()), &vector)?;
                total_tokens += doc.token_count;
            }
            debug!("Embedded batch of {} for {}", batch.len(), name);
        }

        state.save(&paths)?;

        let result = FullReindexResult {
            index: name.to_string(),
            files_indexed: state.metadata().len(),
            total_tokens,
            skipped,
        };
        info!(
            "Reindexed {}: {} file(s), {} token(s), {} skipped",
            name,
            result.files_indexed,
            result.total_tokens,
            result.skipped.len()
        );
        Ok(result)
    }

    /// Rebuild one index, or every configured index in registry order.
    pub fn reindex_all(&self, name: Option<&str>) -> SemdexResult<Vec<FullReindexResult>> {
        match name {
            Some(name) => Ok(vec![self.reindex(name)?]),
            None => {
                let names: Vec<String> = self.registry.names().map(str::to_string).collect();
                names.iter().map(|name| self.reindex(name)).collect()
            }
        }
    }

    // ------------------------------------------------------------------------
    // Incremental reindex
    // ------------------------------------------------------------------------

    /// Apply `changes` to the committed state of `name`.
    ///
    /// Each change is handled independently and in order:
    ///
    /// - `deleted`: drop the path if present;
    /// - `added`/`modified`: re-read the file; if any reference it makes is
    ///   missing, record it in `missing_references` and leave the index alone
    ///   for that path; otherwise upsert it. A path already indexed keeps its
    ///   ID whatever the change kind says. A file that no longer exists is
    ///   treated as deleted.
    ///
    /// Fails with `IndexNotFound` if `name` has never been built.
    pub fn reindex_from_changes(
        &self,
        name: &str,
        changes: &[FileChange],
    ) -> SemdexResult<IncrementalReindexResult> {
        let config = self.registry.resolve(name)?.clone();
        let paths = self.paths(name);

        let _lock = IndexLock::acquire(&paths.lock)?;
        let mut state = IndexState::load(name, &paths)?;
        let mut result = IncrementalReindexResult::new(name);
        let mut embedding_checked = false;

        for change in changes {
            let path = normalize_rel_path(&change.path);

            if change.kind == ChangeKind::Deleted {
                if state.remove(&path)? {
                    debug!("Removed {} from {}", path, name);
                    result.files_removed += 1;
                }
                continue;
            }

            if !config.accepts(&path) {
                debug!("Skipping {}: not part of index {}", path, name);
                result.files_skipped += 1;
                continue;
            }

            if !self.project_root.join(&path).is_file() {
                debug!("{} no longer exists, removing it from {}", path, name);
                if state.remove(&path)? {
                    result.files_removed += 1;
                }
                continue;
            }

            let doc = match prepare_document(&self.project_root, &path) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!("Skipping {}: {}", path, e);
                    result.files_skipped += 1;
                    continue;
                }
            };

            let report = validate(&doc.relevant_files, &self.project_root);
            if !report.is_valid() {
                debug!(
                    "Rejecting {}: missing references {:?}",
                    path, report.missing
                );
                result.missing_references.push(MissingReference {
                    doc_path: path,
                    missing_files: report.missing,
                });
                continue;
            }

            let dimension = state.metadata().dimension();
            if !embedding_checked {
                state.check_embedding(self.embedder.model_id(), self.embedder.dimension()?)?;
                embedding_checked = true;
            }

            let vector = self
                .embed_bodies(std::slice::from_ref(&doc.body), dimension)?
                .into_iter()
                .next()
                .unwrap_or_default();
            match state.upsert(to_metadata(&doc, report.valid), &vector)? {
                Upsert::Added(_) => result.files_added += 1,
                Upsert::Updated(_) => result.files_updated += 1,
            }
        }

        if result.changed() {
            state.save(&paths)?;
        }

        info!(
            "Incremental reindex of {}: {} added, {} updated, {} removed, {} skipped, {} rejected",
            name,
            result.files_added,
            result.files_updated,
            result.files_removed,
            result.files_skipped,
            result.missing_references.len()
        );
        Ok(result)
    }
}
