//! Document parsing: YAML front matter, body, token estimate.
//!
//! A document may open with a front matter block:
//!
//! ```text
//! ---
//! description: How API authentication works
//! relevant_files:
//!   - src/auth/session.ts
//! ---
//! # Body starts here
//! ```
//!
//! Everything after the closing delimiter line is the body. The body is what
//! gets embedded, counted and returned as full context.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::config::normalize_rel_path;
use crate::constants::CHARS_PER_TOKEN;
use crate::errors::{SemdexError, SemdexResult};
use crate::references::extract_references;

const UTF8_BOM: char = '\u{feff}';

/// Typed front matter. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DocumentFrontMatter {
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub relevant_files: Option<Vec<String>>,
}

impl DocumentFrontMatter {
    /// Description, or empty when absent.
    pub fn description(&self) -> String {
        self.description
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    }

    pub fn relevant_files(&self) -> &[String] {
        self.relevant_files.as_deref().unwrap_or_default()
    }
}

/// A document split into front matter and body.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub front_matter: DocumentFrontMatter,
    pub body: String,
    /// Set when a front matter block was present but its YAML was unusable.
    pub front_matter_error: Option<String>,
}

/// Split `text` into front matter and body.
///
/// Without an opening `---` line, or without a closing `---`/`...` line, the
/// whole text is the body. Malformed YAML falls back to empty front matter
/// but still strips the block from the body.
pub fn parse_document(text: &str) -> ParsedDocument {
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);
    let no_front_matter = || ParsedDocument {
        front_matter: DocumentFrontMatter::default(),
        body: text.to_string(),
        front_matter_error: None,
    };

    let mut lines = text.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return no_front_matter();
    };
    if first.trim_end() != "---" {
        return no_front_matter();
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    let mut block = None;
    for line in lines {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            block = Some((offset, offset + line.len()));
            break;
        }
        offset += line.len();
    }
    let Some((yaml_end, body_start)) = block else {
        return no_front_matter();
    };

    let yaml = &text[yaml_start..yaml_end];
    let body = text[body_start..].to_string();

    if yaml.trim().is_empty() {
        return ParsedDocument {
            front_matter: DocumentFrontMatter::default(),
            body,
            front_matter_error: None,
        };
    }

    match serde_yaml::from_str::<DocumentFrontMatter>(yaml) {
        Ok(front_matter) => ParsedDocument {
            front_matter,
            body,
            front_matter_error: None,
        },
        Err(e) => ParsedDocument {
            front_matter: DocumentFrontMatter::default(),
            body,
            front_matter_error: Some(e.to_string()),
        },
    }
}

/// Token estimate: one token per four characters, rounded up.
pub fn estimate_tokens(body: &str) -> u64 {
    body.chars().count().div_ceil(CHARS_PER_TOKEN) as u64
}

/// A document read from the working tree, ready for embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedDocument {
    /// Path relative to the project root, `/`-separated.
    pub path: String,
    pub description: String,
    /// Front matter entries first, then body references, de-duplicated.
    pub relevant_files: Vec<String>,
    pub token_count: u64,
    pub body: String,
}

/// Read and parse `rel_path` under `project_root`.
pub fn prepare_document(project_root: &Path, rel_path: &str) -> SemdexResult<PreparedDocument> {
    let abs = project_root.join(rel_path);
    let bytes = fs::read(&abs).map_err(|e| SemdexError::DocumentRead {
        path: rel_path.to_string(),
        message: e.to_string(),
    })?;
    let text = String::from_utf8(bytes).map_err(|_| SemdexError::DocumentRead {
        path: rel_path.to_string(),
        message: "not valid UTF-8".to_string(),
    })?;

    let parsed = parse_document(&text);
    if let Some(err) = &parsed.front_matter_error {
        warn!("Malformed front matter in {}: {}", rel_path, err);
    }

    let mut relevant_files: Vec<String> = Vec::new();
    let declared = parsed
        .front_matter
        .relevant_files()
        .iter()
        .map(|p| normalize_rel_path(p.trim()))
        .filter(|p| !p.is_empty());
    for path in declared.chain(extract_references(&parsed.body)) {
        if !relevant_files.contains(&path) {
            relevant_files.push(path);
        }
    }

    Ok(PreparedDocument {
        path: rel_path.to_string(),
        description: parsed.front_matter.description(),
        relevant_files,
        token_count: estimate_tokens(&parsed.body),
        body: parsed.body,
    })
}
