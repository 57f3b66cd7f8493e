//! Common constants used throughout semdex-core.

// ============================================================================
// Directory and File Names
// ============================================================================

/// The semdex data directory at the project root.
///
/// Layout:
///
/// ```text
/// .semdex/
///   .gitignore            "*"
///   config.yaml           optional engine config
///   knowledge/
///     <name>.usearch      vector index
///     <name>.meta.json    document metadata
///     <name>.lock         advisory writer lock
/// ```
pub const DATA_DIR: &str = ".semdex";

/// Subdirectory of [`DATA_DIR`] holding persisted indexes.
pub const KNOWLEDGE_DIR: &str = "knowledge";

/// Engine config file inside [`DATA_DIR`].
pub const CONFIG_FILENAME: &str = "config.yaml";

pub const VECTOR_FILE_SUFFIX: &str = ".usearch";
pub const METADATA_FILE_SUFFIX: &str = ".meta.json";
pub const LOCK_FILE_SUFFIX: &str = ".lock";

/// Content of the `.gitignore` written into [`DATA_DIR`].
pub const DATA_DIR_GITIGNORE: &str = "*\n";

// ============================================================================
// Ignored Directories
// ============================================================================

/// Directories that are never descended into, whatever the index roots say.
pub const ALWAYS_IGNORED_DIRS: &[&str] = &[
    ".git",
    ".semdex",
    "target",
    "node_modules",
    ".next",
    "dist",
    "build",
    "out",
    "coverage",
    "__pycache__",
    ".venv",
    "venv",
    ".mypy_cache",
    ".pytest_cache",
];

/// Check if a directory name should always be ignored.
#[inline]
pub fn should_ignore_dir(name: &str) -> bool {
    ALWAYS_IGNORED_DIRS.contains(&name)
}

// ============================================================================
// Indexing
// ============================================================================

/// Characters per token used by the token estimate.
pub const CHARS_PER_TOKEN: usize = 4;

/// Documents embedded per model call during a full reindex.
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_ignore_dir() {
        assert!(should_ignore_dir(".git"));
        assert!(should_ignore_dir(".semdex"));
        assert!(should_ignore_dir("node_modules"));
        assert!(!should_ignore_dir("docs"));
        assert!(!should_ignore_dir("src"));
    }
}
