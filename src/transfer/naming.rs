//! Stored file naming
//!
//! Uploaded names never reach the filesystem as-is: every character outside
//! `[A-Za-z0-9._-]` is replaced, and each stored name carries a random token
//! so concurrent uploads cannot collide.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use uuid::Uuid;

/// Longest sanitized file name kept in a stored name
const MAX_NAME_LEN: usize = 100;

/// Longest identifier component kept in a stored name
const MAX_COMPONENT_LEN: usize = 32;

/// Longest extension preserved when a name is shortened
const MAX_EXTENSION_LEN: usize = 16;

/// Name used when nothing usable survives sanitization
const FALLBACK_NAME: &str = "file";

/// Reduce an untrusted file name to a safe, separator-free base name.
///
/// Only the last path segment is kept, disallowed characters become `_`,
/// leading dots are dropped and overlong names are shortened with their
/// extension preserved.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| if is_allowed(c) { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        return FALLBACK_NAME.to_string();
    }

    if cleaned.len() <= MAX_NAME_LEN {
        return cleaned.to_string();
    }

    // All characters are ASCII at this point, so byte slicing is safe
    match cleaned.rfind('.') {
        Some(dot) if cleaned.len() - dot <= MAX_EXTENSION_LEN + 1 => {
            let ext = &cleaned[dot..];
            let stem = &cleaned[..(MAX_NAME_LEN - ext.len()).min(dot)];
            format!("{}{}", stem, ext)
        }
        _ => cleaned[..MAX_NAME_LEN].to_string(),
    }
}

/// Reduce an identifier (user id, task id, week id) to `[A-Za-z0-9_-]`
pub fn sanitize_component(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .take(MAX_COMPONENT_LEN)
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();

    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

/// Compose the on-disk name for an upload.
///
/// Format: `{resource}_{user}_{YYYYMMDD_HHMMSS}_{token}_{name}`
pub fn stored_file_name(resource_id: &str, user_id: &str, client_name: &str, now: DateTime<Local>) -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}_{}_{}",
        sanitize_component(resource_id),
        sanitize_component(user_id),
        now.format("%Y%m%d_%H%M%S"),
        &token[..12],
        sanitize_file_name(client_name),
    )
}

/// Resolve a stored file reference to a path inside `root`.
///
/// Only the last path segment of the reference is considered. Names written
/// by this server are already sanitized, but videos registered by name may
/// carry spaces or non-ASCII text, so resolution only rejects what could
/// leave `root` or hide a file: empty names, dot-leading names and control
/// characters. The returned path is not checked for existence.
pub fn resolve_stored_file(root: &Path, reference: &str) -> Option<PathBuf> {
    let base = reference.rsplit(['/', '\\']).next()?;

    if base.is_empty() || base.starts_with('.') || base.chars().any(char::is_control) {
        return None;
    }

    Some(root.join(base))
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}
