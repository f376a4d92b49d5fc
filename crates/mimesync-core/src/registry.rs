//! The accumulating MIME type → extensions table.
//!
//! Mappings only ever grow: [`Registry::merge_in`] unions new extensions into
//! existing entries and never removes anything. All access goes through an
//! internal lock so merges from a refresh cycle can interleave with `append`
//! calls and lookups.

use std::collections::btree_map::Entry;
use std::sync::{LazyLock, PoisonError, RwLock};

use regex::Regex;
use tracing::debug;

use crate::{Error, MimeMap, Result};

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static MIME_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^/]+/[^/]+$").unwrap());

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static EXTENSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[a-z0-9\-_+.~%]+$").unwrap());

/// Lowercase and trim a MIME type.
#[must_use]
pub fn normalize_mime(mime: &str) -> String {
    mime.trim().to_lowercase()
}

/// Lowercase, trim and drop any leading dots from an extension.
#[must_use]
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// Extension of the final path component, normalized; empty when there is none.
///
/// ```rust
/// use mimesync_core::registry::extension_of;
///
/// assert_eq!(extension_of("docs/Report.PDF"), "pdf");
/// assert_eq!(extension_of("archive.tar.gz"), "gz");
/// assert_eq!(extension_of(".txt"), "txt");
/// assert_eq!(extension_of("some.dir/README"), "");
/// ```
#[must_use]
pub fn extension_of(path: &str) -> String {
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    file_name
        .rfind('.')
        .map_or_else(String::new, |idx| normalize_extension(&file_name[idx + 1..]))
}

/// Check that a caller-supplied MIME type has the `type/subtype` shape.
pub fn validate_mime(mime: &str) -> Result<()> {
    let trimmed = mime.trim();
    if trimmed.is_empty() || !MIME_TYPE_RE.is_match(trimmed) {
        return Err(Error::InvalidMimeType(mime.to_string()));
    }
    Ok(())
}

/// Check that a caller-supplied extension uses only `[a-z0-9-_+.~%]`.
pub fn validate_extension(ext: &str) -> Result<()> {
    let trimmed = ext.trim();
    if trimmed.is_empty() || !EXTENSION_RE.is_match(trimmed) {
        return Err(Error::InvalidExtension(ext.to_string()));
    }
    Ok(())
}

/// Thread-safe, append-only registry of MIME type mappings.
#[derive(Debug, Default)]
pub struct Registry {
    entries: RwLock<MimeMap>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a persisted snapshot, normalizing as it goes.
    #[must_use]
    pub fn from_snapshot(snapshot: &MimeMap) -> Self {
        let registry = Self::new();
        registry.merge_in(snapshot);
        registry
    }

    /// Union `content` into the registry.
    ///
    /// Returns `true` when at least one MIME type or extension was added.
    /// Merging the same content twice leaves the registry unchanged the second
    /// time and returns `false`.
    pub fn merge_in(&self, content: &MimeMap) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let mut changed = false;

        for (mime, extensions) in content {
            let mime = normalize_mime(mime);
            if mime.is_empty() {
                continue;
            }

            let incoming = extensions
                .iter()
                .map(|ext| normalize_extension(ext))
                .filter(|ext| !ext.is_empty());

            match entries.entry(mime) {
                Entry::Vacant(slot) => {
                    let mut fresh: Vec<String> = Vec::new();
                    for ext in incoming {
                        if !fresh.contains(&ext) {
                            fresh.push(ext);
                        }
                    }
                    debug!("Registered {} with {} extension(s)", slot.key(), fresh.len());
                    slot.insert(fresh);
                    changed = true;
                },
                Entry::Occupied(mut slot) => {
                    let known = slot.get_mut();
                    for ext in incoming {
                        if !known.contains(&ext) {
                            known.push(ext);
                            changed = true;
                        }
                    }
                },
            }
        }

        changed
    }

    /// MIME types whose extension set contains the extension of `path`.
    ///
    /// Results follow the registry's key order, each type at most once.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Vec<String> {
        let ext = extension_of(path);
        if ext.is_empty() {
            return Vec::new();
        }

        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .filter(|(_, exts)| exts.contains(&ext))
            .map(|(mime, _)| mime.clone())
            .collect()
    }

    /// Extensions registered for `mime`, if any.
    #[must_use]
    pub fn extensions(&self, mime: &str) -> Option<Vec<String>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(&normalize_mime(mime)).cloned()
    }

    /// Copy of the current mapping.
    #[must_use]
    pub fn snapshot(&self) -> MimeMap {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of MIME types known.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the registry has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
