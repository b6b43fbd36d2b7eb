//! Artifact target-path rule.

use crate::util::errors::{AtelierError, AtelierResult};

pub const DEFAULT_DOCUMENT: &str = "index.html";

/// Map a model-supplied path to the repository file it is written to.
///
/// - surrounding whitespace and leading `/` are dropped
/// - empty (site root) maps to `index.html`
/// - a trailing `/` or an extension-less last segment is a directory: `<dir>/index.html`
/// - `.`, `..` and empty segments are rejected
pub fn resolve_target_path(raw: &str) -> AtelierResult<String> {
    let trimmed = raw.trim().trim_start_matches('/');
    if trimmed.is_empty() {
        return Ok(DEFAULT_DOCUMENT.to_string());
    }

    let is_dir = trimmed.ends_with('/');
    let segments: Vec<&str> = trimmed.trim_end_matches('/').split('/').collect();
    if segments
        .iter()
        .any(|s| s.is_empty() || *s == "." || *s == ".." || s.contains('\\'))
    {
        return Err(AtelierError::validation(format!("invalid document path: {}", raw)));
    }

    let joined = segments.join("/");
    let last = segments.last().copied().unwrap_or_default();
    if is_dir || !last.contains('.') {
        Ok(format!("{}/{}", joined, DEFAULT_DOCUMENT))
    } else {
        Ok(joined)
    }
}
