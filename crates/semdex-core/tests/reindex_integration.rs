//! Full and incremental reindex against real on-disk indexes.

mod common;

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use common::{at_similarity, axis, docs_registry, manager, write_file, FixtureEmbedder};
use semdex_core::{
    ErrorKind, FileChange, IndexConfig, IndexManager, IndexRegistry, MissingReference,
    SearchOptions,
};
use semdex_db::MetadataStore;
use tempfile::TempDir;

fn live_ids(root: &Path) -> (Vec<u64>, u64) {
    let store = MetadataStore::load(&root.join(".semdex/knowledge/docs.meta.json"))
        .expect("load metadata");
    let ids = store.ids().map(|id| id.value()).collect();
    (ids, store.next_id())
}

// ============================================================================
// Full reindex
// ============================================================================

#[test]
fn test_full_reindex_counts_only_eligible_files() {
    let temp = TempDir::new().expect("create temp dir");
    let root = temp.path();
    for i in 0..10 {
        write_file(root, &format!("docs/guide-{i}.md"), &format!("guide {i}\n"));
    }
    write_file(root, "docs/notes.txt", "plain text\n");
    write_file(root, "docs/data.json", "{}\n");

    let result = manager(root, FixtureEmbedder::new())
        .reindex("docs")
        .expect("reindex");
    assert_eq!(result.index, "docs");
    assert_eq!(result.files_indexed, 10);
}

#[test]
fn test_full_reindex_writes_private_data_dir() {
    let temp = TempDir::new().expect("create temp dir");
    let root = temp.path();
    write_file(root, "docs/a.md", "hello\n");
    let manager = manager(root, FixtureEmbedder::new());
    assert!(!manager.index_exists("docs"));

    manager.reindex("docs").expect("reindex");

    let knowledge = root.join(".semdex/knowledge");
    assert_eq!(
        fs::read_to_string(root.join(".semdex/.gitignore")).expect("gitignore"),
        "*\n"
    );
    assert!(knowledge.join("docs.usearch").is_file());
    assert!(knowledge.join("docs.meta.json").is_file());
    let leftovers: Vec<_> = fs::read_dir(&knowledge)
        .expect("read knowledge dir")
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
    assert!(manager.index_exists("docs"));
}

#[test]
fn test_full_reindex_discards_prior_state() {
    let temp = TempDir::new().expect("create temp dir");
    let root = temp.path();
    write_file(root, "docs/a.md", "a\n");
    write_file(root, "docs/b.md", "b\n");
    let manager = manager(root, FixtureEmbedder::new());
    manager.reindex("docs").expect("reindex");

    fs::remove_file(root.join("docs/a.md")).expect("remove");
    let result = manager.reindex("docs").expect("reindex");
    assert_eq!(result.files_indexed, 1);

    let paths: Vec<String> = manager
        .documents("docs")
        .expect("documents")
        .into_iter()
        .map(|d| d.path)
        .collect();
    assert_eq!(paths, vec!["docs/b.md"]);
    // IDs continue across rebuilds.
    assert_eq!(live_ids(root), (vec![3], 4));
}

#[test]
fn test_stale_metadata_after_rebuild_never_aliases_documents() {
    let temp = TempDir::new().expect("create temp dir");
    let root = temp.path();
    write_file(root, "docs/a.md", "alpha secret\n");
    write_file(root, "docs/b.md", "BRAVO\n");
    let query = "bravo";
    let manager = manager(
        root,
        FixtureEmbedder::new()
            .with_text(query, axis(0))
            .with_keyword("BRAVO", axis(0))
            .with_keyword("alpha", axis(1))
            .with_keyword("charlie", axis(2)),
    );
    manager.reindex("docs").expect("reindex");

    let meta_path = root.join(".semdex/knowledge/docs.meta.json");
    let old_metadata = fs::read(&meta_path).expect("read metadata");

    fs::remove_file(root.join("docs/a.md")).expect("remove");
    write_file(root, "docs/c.md", "charlie\n");
    manager.reindex("docs").expect("rebuild");

    // The rebuild's metadata rename never happened.
    fs::write(&meta_path, old_metadata).expect("restore metadata");

    let results = manager
        .search("docs", query, SearchOptions::default())
        .expect("search");
    assert!(
        !results.paths().contains(&"docs/a.md"),
        "deleted document resurfaced: {:?}",
        results.paths()
    );

    // Next rebuild recovers fully.
    manager.reindex("docs").expect("rebuild again");
    let results = manager
        .search("docs", query, SearchOptions::default())
        .expect("search");
    assert_eq!(results.paths(), vec!["docs/b.md"]);
}

#[test]
fn test_full_reindex_does_not_validate_references() {
    let temp = TempDir::new().expect("create temp dir");
    let root = temp.path();
    write_file(root, "docs/a.md", "See `src/missing.ts` for details.\n");
    let manager = manager(root, FixtureEmbedder::new());

    let result = manager.reindex("docs").expect("reindex");
    assert_eq!(result.files_indexed, 1);
    let docs = manager.documents("docs").expect("documents");
    assert_eq!(docs[0].relevant_files, vec!["src/missing.ts"]);
}

#[test]
fn test_reindex_all_and_status() {
    let temp = TempDir::new().expect("create temp dir");
    let root = temp.path();
    write_file(root, "docs/a.md", "abcdefgh");
    write_file(root, "roadmap/q1.md", "abcd");
    let registry = IndexRegistry::new(vec![
        IndexConfig::new("docs").with_root("docs").with_extension("md"),
        IndexConfig::new("roadmap").with_root("roadmap").with_extension("md"),
    ])
    .expect("registry");
    let manager = IndexManager::new(root, registry, Arc::new(FixtureEmbedder::new()));

    let listed: Vec<(String, bool)> = manager
        .list_indexes()
        .into_iter()
        .map(|(c, exists)| (c.name, exists))
        .collect();
    assert_eq!(
        listed,
        vec![("docs".to_string(), false), ("roadmap".to_string(), false)]
    );

    let results = manager.reindex_all(None).expect("reindex all");
    let names: Vec<&str> = results.iter().map(|r| r.index.as_str()).collect();
    assert_eq!(names, vec!["docs", "roadmap"]);

    let only = manager.reindex_all(Some("roadmap")).expect("reindex one");
    assert_eq!(only.len(), 1);
    assert_eq!(only[0].total_tokens, 1);

    let status = manager.status("docs").expect("status");
    assert_eq!(status.document_count, 1);
    assert_eq!(status.total_tokens, 2);
    assert_eq!(status.next_id, 2);
    assert_eq!(status.model_id, "fixture-embedder");
    assert_eq!(status.dimension, common::DIM);

    assert!(manager.list_indexes().iter().all(|(_, exists)| *exists));
    assert_eq!(
        manager.reindex_all(Some("nope")).unwrap_err().kind(),
        ErrorKind::UnknownIndex
    );
}

// ============================================================================
// Incremental reindex
// ============================================================================

#[test]
fn test_missing_reference_rejects_only_that_document() {
    let temp = TempDir::new().expect("create temp dir");
    let root = temp.path();
    write_file(root, "docs/existing.md", "existing\n");
    let manager = manager(root, FixtureEmbedder::new());
    manager.reindex("docs").expect("reindex");

    write_file(
        root,
        "docs/new.md",
        "---\ndescription: New feature\n---\nImplemented in `src/missing.ts`.\n",
    );
    write_file(root, "src/present.ts", "export {}\n");
    write_file(root, "docs/valid.md", "Implemented in `src/present.ts`.\n");

    let result = manager
        .reindex_from_changes(
            "docs",
            &[FileChange::added("docs/new.md"), FileChange::added("docs/valid.md")],
        )
        .expect("incremental");

    assert!(!result.success());
    assert_eq!(
        result.missing_references,
        vec![MissingReference {
            doc_path: "docs/new.md".to_string(),
            missing_files: vec!["src/missing.ts".to_string()],
        }]
    );
    assert_eq!(result.files_added, 1);

    let paths: Vec<String> = manager
        .documents("docs")
        .expect("documents")
        .into_iter()
        .map(|d| d.path)
        .collect();
    assert_eq!(paths, vec!["docs/existing.md", "docs/valid.md"]);

    // Fix the reference and retry just that document.
    write_file(root, "src/missing.ts", "export {}\n");
    let retry = manager
        .reindex_from_changes("docs", &[FileChange::added("docs/new.md")])
        .expect("retry");
    assert!(retry.success());
    assert_eq!(retry.files_added, 1);
    let docs = manager.documents("docs").expect("documents");
    let new = docs.iter().find(|d| d.path == "docs/new.md").expect("new doc");
    assert_eq!(new.description, "New feature");
    assert_eq!(new.relevant_files, vec!["src/missing.ts"]);
}

#[test]
fn test_rejected_modification_keeps_previous_version() {
    let temp = TempDir::new().expect("create temp dir");
    let root = temp.path();
    write_file(root, "src/auth.ts", "export {}\n");
    write_file(
        root,
        "docs/auth.md",
        "---\ndescription: Auth v1\n---\nSee `src/auth.ts`.\n",
    );
    let manager = manager(root, FixtureEmbedder::new());
    manager.reindex("docs").expect("reindex");
    let before = manager.documents("docs").expect("documents");
    let (ids_before, next_before) = live_ids(root);

    write_file(
        root,
        "docs/auth.md",
        "---\ndescription: Auth v2\n---\nNow in `src/gone.ts`.\n",
    );
    let result = manager
        .reindex_from_changes("docs", &[FileChange::modified("docs/auth.md")])
        .expect("incremental");

    assert!(!result.success());
    assert_eq!(result.files_updated, 0);
    assert_eq!(
        result.missing_references,
        vec![MissingReference {
            doc_path: "docs/auth.md".to_string(),
            missing_files: vec!["src/gone.ts".to_string()],
        }]
    );

    let after = manager.documents("docs").expect("documents");
    assert_eq!(after, before);
    assert_eq!(after[0].description, "Auth v1");
    assert_eq!(after[0].relevant_files, vec!["src/auth.ts"]);
    assert_eq!(live_ids(root), (ids_before, next_before));
}

#[test]
fn test_ids_are_unique_and_never_reused() {
    let temp = TempDir::new().expect("create temp dir");
    let root = temp.path();
    write_file(root, "docs/a.md", "a\n");
    write_file(root, "docs/b.md", "b\n");
    let manager = manager(root, FixtureEmbedder::new());
    manager.reindex("docs").expect("reindex");

    let mut ever_allocated: BTreeSet<u64> = live_ids(root).0.into_iter().collect();

    let steps: Vec<Vec<FileChange>> = vec![
        vec![FileChange::deleted("docs/b.md")],
        vec![FileChange::added("docs/c.md")],
        vec![FileChange::deleted("docs/a.md"), FileChange::added("docs/b.md")],
        vec![FileChange::modified("docs/c.md"), FileChange::added("docs/d.md")],
    ];
    for changes in steps {
        for change in &changes {
            if change.kind != semdex_core::ChangeKind::Deleted {
                write_file(root, &change.path, &format!("{} body\n", change.path));
            }
        }
        manager
            .reindex_from_changes("docs", &changes)
            .expect("incremental");

        let (ids, next_id) = live_ids(root);
        let unique: BTreeSet<u64> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len(), "duplicate live ids");
        ever_allocated.extend(ids);
        assert!(ever_allocated.iter().all(|id| *id < next_id));
    }

    // a=1, b=2, c=3, b again=4, d=5; c kept its id when modified.
    assert_eq!(live_ids(root), (vec![3, 4, 5], 6));
}

#[test]
fn test_deleting_unknown_path_is_noop() {
    let temp = TempDir::new().expect("create temp dir");
    let root = temp.path();
    write_file(root, "docs/a.md", "a\n");
    let manager = manager(root, FixtureEmbedder::new());
    manager.reindex("docs").expect("reindex");

    for _ in 0..2 {
        let result = manager
            .reindex_from_changes("docs", &[FileChange::deleted("docs/never.md")])
            .expect("delete");
        assert_eq!(result.files_removed, 0);
        assert!(result.success());
    }
    assert_eq!(manager.status("docs").expect("status").document_count, 1);
}

#[test]
fn test_incremental_matches_full_rebuild() {
    let temp = TempDir::new().expect("create temp dir");
    let root = temp.path();
    write_file(root, "src/auth.ts", "export {}\n");
    write_file(root, "src/session.ts", "export {}\n");
    write_file(
        root,
        "docs/auth.md",
        "---\ndescription: Auth\n---\nSee `src/auth.ts`.\n",
    );
    write_file(root, "docs/colors.md", "---\ndescription: Colors\n---\nPalette.\n");
    write_file(root, "docs/old.md", "Obsolete.\n");
    let manager = manager(root, FixtureEmbedder::new());
    manager.reindex("docs").expect("reindex");

    // FS0 -> FS1
    write_file(
        root,
        "docs/auth.md",
        "---\ndescription: Auth v2\nrelevant_files:\n  - src/session.ts\n---\nSee `src/auth.ts`.\n",
    );
    fs::remove_file(root.join("docs/old.md")).expect("remove");
    write_file(root, "docs/new.md", "---\ndescription: New\n---\nIn src/session.ts now.\n");
    let result = manager
        .reindex_from_changes(
            "docs",
            &[
                FileChange::modified("docs/auth.md"),
                FileChange::deleted("docs/old.md"),
                FileChange::added("docs/new.md"),
            ],
        )
        .expect("incremental");
    assert!(result.success());
    assert_eq!(
        (result.files_added, result.files_updated, result.files_removed),
        (1, 1, 1)
    );

    let incremental = manager.documents("docs").expect("documents");
    manager.reindex("docs").expect("full rebuild");
    let full = manager.documents("docs").expect("documents");

    let view = |docs: &[semdex_core::DocumentMetadata]| {
        docs.iter()
            .map(|d| {
                (
                    d.path.clone(),
                    d.description.clone(),
                    d.relevant_files.clone(),
                    d.token_count,
                )
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(view(&incremental), view(&full));
    assert_eq!(
        incremental[0].relevant_files,
        vec!["src/session.ts", "src/auth.ts"]
    );
}

#[test]
fn test_updated_document_is_found_by_new_content() {
    let temp = TempDir::new().expect("create temp dir");
    let root = temp.path();
    write_file(root, "docs/a.md", "OLD-TOPIC\n");
    let query = "what changed";
    let manager = manager(
        root,
        FixtureEmbedder::new()
            .with_text(query, axis(0))
            .with_keyword("NEW-TOPIC", at_similarity(0.9))
            .with_keyword("OLD-TOPIC", at_similarity(0.1)),
    );
    manager.reindex("docs").expect("reindex");
    assert!(manager
        .search("docs", query, SearchOptions::default())
        .expect("search")
        .is_empty());

    write_file(root, "docs/a.md", "NEW-TOPIC\n");
    let result = manager
        .reindex_from_changes("docs", &[FileChange::modified("docs/a.md")])
        .expect("incremental");
    assert_eq!(result.files_updated, 1);

    let results = manager
        .search("docs", query, SearchOptions::default())
        .expect("search");
    assert_eq!(results.paths(), vec!["docs/a.md"]);
}

#[test]
fn test_concurrent_writers_are_serialized() {
    let temp = TempDir::new().expect("create temp dir");
    let root = temp.path();
    write_file(root, "docs/base.md", "base\n");
    let manager = IndexManager::new(root, docs_registry(), Arc::new(FixtureEmbedder::new()));
    manager.reindex("docs").expect("reindex");

    for i in 0..8 {
        write_file(root, &format!("docs/w{i}.md"), &format!("writer {i}\n"));
    }

    std::thread::scope(|scope| {
        for i in 0..8 {
            let manager = &manager;
            scope.spawn(move || {
                manager
                    .reindex_from_changes("docs", &[FileChange::added(format!("docs/w{i}.md"))])
                    .expect("incremental");
            });
        }
    });

    let status = manager.status("docs").expect("status");
    assert_eq!(status.document_count, 9);
    assert_eq!(status.next_id, 10);
}
