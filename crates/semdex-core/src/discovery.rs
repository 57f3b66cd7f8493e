//! Document discovery for full reindex.

use std::path::Path;

use ignore::WalkBuilder;
use tracing::debug;

use crate::config::{normalize_rel_path, IndexConfig};
use crate::constants::should_ignore_dir;
use crate::errors::{SemdexError, SemdexResult};

/// Every file under `config`'s roots that the config accepts.
///
/// Paths are relative to `project_root`, `/`-separated, sorted and unique.
/// Missing roots contribute nothing. `.gitignore` rules are honored.
pub fn discover_documents(project_root: &Path, config: &IndexConfig) -> SemdexResult<Vec<String>> {
    let mut files = Vec::new();

    for root in &config.roots {
        let dir = project_root.join(root);
        if !dir.is_dir() {
            debug!("Index root {} does not exist, skipping", dir.display());
            continue;
        }

        let walker = WalkBuilder::new(&dir)
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(false)
            .filter_entry(|entry| {
                entry.depth() == 0 || !should_ignore_dir(&entry.file_name().to_string_lossy())
            })
            .build();

        for result in walker {
            let entry = match result {
                Ok(e) => e,
                Err(e) => {
                    if let Some(io_err) = e.io_error() {
                        if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                            debug!("Skipping entry due to permission denied: {}", e);
                            continue;
                        }
                    }
                    return Err(SemdexError::Discovery {
                        root: dir.clone(),
                        message: e.to_string(),
                    });
                }
            };

            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let Ok(rel) = entry.path().strip_prefix(project_root) else {
                continue;
            };
            let rel = normalize_rel_path(&rel.to_string_lossy());
            if config.accepts(&rel) {
                files.push(rel);
            } else {
                debug!("Not indexed by {}: {}", config.name, rel);
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}
