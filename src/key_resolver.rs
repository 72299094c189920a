//! Candidate storage key calculation

use crate::models::{CandidateKey, ClassifiedPath, GZIP_SUFFIX};
use tracing::debug;

/// File extensions the renderer only ever writes compressed
const COMPRESSED_ONLY_EXTENSIONS: &[&str] = &["prbm"];

/// Per-map configuration files the renderer only ever writes compressed
const COMPRESSED_ONLY_FILENAMES: &[&str] = &["settings.json", "textures.json"];

/// Calculates the ordered list of storage keys to probe for a path
#[derive(Debug, Clone, Copy)]
pub struct KeyResolver;

impl KeyResolver {
    /// Create a new KeyResolver
    pub fn new() -> Self {
        KeyResolver
    }

    /// Produce candidates for a classified path
    ///
    /// The list is non-empty, ordered by ascending priority, and depends on the
    /// classified path alone.
    ///
    /// - Compressed-only keys probe `key.gz` first, then `key`
    /// - Other keys probe `key` first, then `key.gz`
    /// - A key already ending in `.gz` is probed as-is, never suffixed again,
    ///   and served as a plain download
    pub fn resolve(&self, classified: &ClassifiedPath) -> Vec<CandidateKey> {
        let key = classified.normalized_key.as_str();

        let candidates = if key.ends_with(GZIP_SUFFIX) {
            vec![CandidateKey::new(key, false, 0)]
        } else {
            let compressed = format!("{}{}", key, GZIP_SUFFIX);
            if is_compressed_only(key) {
                vec![
                    CandidateKey::new(compressed, true, 0),
                    CandidateKey::new(key, false, 1),
                ]
            } else {
                vec![
                    CandidateKey::new(key, false, 0),
                    CandidateKey::new(compressed, true, 1),
                ]
            }
        };

        debug!(
            "Resolved {} candidates for key={}: {:?}",
            candidates.len(),
            key,
            candidates.iter().map(|c| c.key.as_str()).collect::<Vec<_>>()
        );
        candidates
    }
}

impl Default for KeyResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a key belongs to the compressed-only set
///
/// Extensions match in any directory. File names match only directly below
/// a map directory, as `<map-id>/<name>`.
pub fn is_compressed_only(key: &str) -> bool {
    let file_name = key.rsplit('/').next().unwrap_or(key);

    if let Some((map_id, name)) = key.split_once('/') {
        if !map_id.is_empty() && COMPRESSED_ONLY_FILENAMES.contains(&name) {
            return true;
        }
    }

    match file_name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => {
            COMPRESSED_ONLY_EXTENSIONS.contains(&extension)
        }
        _ => false,
    }
}
