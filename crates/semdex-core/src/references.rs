//! File-path references inside document bodies.
//!
//! Extraction is heuristic. Three patterns are recognized:
//!
//! - inline code spans that look like paths: `` `src/auth/session.ts` ``
//! - markdown link targets containing a `/`: `[flow](docs/api/flow.md)`
//! - bare paths under a conventional top-level directory: `see src/lib.rs`
//!
//! Validation only checks existence relative to the project root.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

/// Extensions that make a slash-free token count as a file reference.
const KNOWN_EXTENSIONS: &[&str] = &[
    "md", "mdx", "txt", "rs", "ts", "tsx", "js", "jsx", "mjs", "cjs", "py", "go", "java", "kt",
    "swift", "c", "h", "cc", "cpp", "hpp", "cs", "rb", "php", "sh", "sql", "json", "yaml", "yml",
    "toml", "html", "css", "scss", "proto", "graphql",
];

/// Top-level directories whose paths are recognized in plain prose.
const CONVENTIONAL_PREFIXES: &[&str] = &[
    "src", "lib", "test", "tests", "crates", "packages", "apps", "scripts", "docs", "config",
];

static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`\n]+)`").expect("valid inline code regex"));

static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\[[^\]\n]*\]\(\s*<?([^)\s>]+)>?(?:\s+"[^"]*")?\s*\)"#)
        .expect("valid markdown link regex")
});

static PREFIXED_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:^|[\s(\[<])((?:src|lib|tests?|crates|packages|apps|scripts|docs|config)/[A-Za-z0-9_./-]*[A-Za-z0-9_/-])",
    )
    .expect("valid prefixed path regex")
});

/// Extract candidate file references from `body`, in order of appearance,
/// without duplicates.
pub fn extract_references(body: &str) -> Vec<String> {
    let mut found: Vec<(usize, String)> = Vec::new();

    for caps in INLINE_CODE.captures_iter(body) {
        if let Some(m) = caps.get(1) {
            if let Some(path) = clean_candidate(m.as_str()).filter(|p| looks_like_path(p)) {
                found.push((m.start(), path));
            }
        }
    }

    for caps in MARKDOWN_LINK.captures_iter(body) {
        if let Some(m) = caps.get(1) {
            if let Some(path) = clean_candidate(m.as_str()).filter(|p| p.contains('/')) {
                found.push((m.start(), path));
            }
        }
    }

    for caps in PREFIXED_PATH.captures_iter(body) {
        if let Some(m) = caps.get(1) {
            if let Some(path) = clean_candidate(m.as_str()) {
                found.push((m.start(), path));
            }
        }
    }

    found.sort_by_key(|(pos, _)| *pos);
    let mut refs: Vec<String> = Vec::with_capacity(found.len());
    for (_, path) in found {
        if !refs.contains(&path) {
            refs.push(path);
        }
    }
    refs
}

/// Normalize a raw candidate, or reject it as not a local path.
fn clean_candidate(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty()
        || raw.starts_with('#')
        || raw.starts_with("mailto:")
        || raw.contains("://")
    {
        return None;
    }

    let mut path = raw.split('#').next().unwrap_or_default();
    path = strip_line_suffix(path);
    while let Some(rest) = path.strip_prefix("./") {
        path = rest;
    }
    let path = path.trim_start_matches('/');

    if path.is_empty()
        || path == ".."
        || path.starts_with("../")
        || path.contains("/../")
        || path.chars().any(|c| {
            c.is_whitespace()
                || matches!(
                    c,
                    '(' | ')' | '*' | '?' | '{' | '}' | '<' | '>' | '$' | '|' | '"' | '\'' | ','
                        | ';' | '=' | '\\' | '`' | '~'
                )
        })
    {
        return None;
    }
    Some(path.to_string())
}

/// Drop a trailing `:line` or `:line:col`.
fn strip_line_suffix(path: &str) -> &str {
    let mut path = path;
    for _ in 0..2 {
        match path.rsplit_once(':') {
            Some((head, tail)) if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) => {
                path = head;
            }
            _ => break,
        }
    }
    path
}

fn has_known_extension(path: &str) -> bool {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            KNOWN_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
        }
        _ => false,
    }
}

/// Inline code is full of commands and identifiers; only path-shaped spans count.
fn looks_like_path(path: &str) -> bool {
    if !path.contains('/') {
        return has_known_extension(path);
    }
    let first = path.split('/').next().unwrap_or_default();
    has_known_extension(path) || path.ends_with('/') || CONVENTIONAL_PREFIXES.contains(&first)
}

/// Existence check of references against the project root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceReport {
    pub valid: Vec<String>,
    pub missing: Vec<String>,
}

impl ReferenceReport {
    pub fn is_valid(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Split `paths` into those that exist under `project_root` and those that do not.
pub fn validate(paths: &[String], project_root: &Path) -> ReferenceReport {
    let mut report = ReferenceReport::default();
    for path in paths {
        if project_root.join(path).exists() {
            report.valid.push(path.clone());
        } else {
            report.missing.push(path.clone());
        }
    }
    report
}
