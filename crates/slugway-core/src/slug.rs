//! Pure helpers for path-like page slugs.

use crate::error::CoreError;
use sha2::{Digest, Sha256};

/// Number of numeric suffixes tried before falling back to a hash suffix.
pub const MAX_NUMERIC_SUFFIX: u32 = 100;

/// Slugs are non-empty and always start with `/`.
pub fn validate(slug: &str) -> Result<(), CoreError> {
    if !slug.starts_with('/') {
        return Err(CoreError::InvalidSlug(format!(
            "slug must start with '/': '{slug}'"
        )));
    }
    Ok(())
}

/// Moves `slug` from below `old_parent` to below `new_parent`.
///
/// This is deliberately stricter than replacing a plain byte prefix: the
/// match must end on a path segment boundary, so `/older` is not below
/// `/old` and returns `None` instead of becoming `/newer`. A slug equal to
/// the old parent becomes the new parent itself rather than gaining a
/// trailing `/`. `None` is also returned when `slug` does not start with
/// `old_parent` at all.
pub fn rewrite_prefix(slug: &str, old_parent: &str, new_parent: &str) -> Option<String> {
    if !slug.starts_with(old_parent) {
        return None;
    }

    let old_trimmed = old_parent.trim_end_matches('/');
    let new_trimmed = new_parent.trim_end_matches('/');

    let remainder = match slug.strip_prefix(&format!("{old_trimmed}/")) {
        Some(rest) => rest,
        None if slug == old_trimmed => "",
        None => return None,
    };

    if remainder.is_empty() {
        if new_trimmed.is_empty() {
            return Some("/".to_string());
        }
        return Some(new_trimmed.to_string());
    }

    Some(format!("{new_trimmed}/{remainder}"))
}

/// The `attempt`-th numeric variant of `slug`, e.g. `/a/b-2`.
pub fn with_numeric_suffix(slug: &str, attempt: u32) -> String {
    format!("{}-{attempt}", slug.trim_end_matches('/'))
}

/// A hashed variant of `slug` used once numeric suffixes are exhausted.
pub fn with_hash_suffix(slug: &str, seed: &str) -> String {
    let digest = Sha256::digest(format!("{slug}:{seed}").as_bytes());
    let hex = format!("{digest:x}");
    format!("{}-{}", slug.trim_end_matches('/'), &hex[..13])
}
