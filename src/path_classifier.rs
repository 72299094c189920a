//! Request path classification

use crate::config::GateConfig;
use crate::models::{ClassifiedPath, PathKind};
use std::sync::Arc;
use tracing::debug;

/// Path segment that marks live positional data under a map directory
const LIVE_SEGMENT: &str = "live";

/// Path segment that marks the tile pyramid under a map directory
const TILES_SEGMENT: &str = "tiles";

/// Tags incoming request paths with a semantic kind and derives the store key
///
/// Classification is a pure function of the path and the configuration. It is
/// case-sensitive and never percent-decodes: the transport has already decoded
/// the path once.
pub struct PathClassifier {
    config: Arc<GateConfig>,
}

impl PathClassifier {
    /// Create a new PathClassifier with the given configuration
    pub fn new(config: Arc<GateConfig>) -> Self {
        PathClassifier { config }
    }

    /// Classify a decoded request path
    ///
    /// # Rules
    /// Evaluated in order:
    /// 1. Empty path or root maps to the entry document
    /// 2. `<maps_root>/<map-id>/live/...` is live; the key keeps the prefix.
    ///    Paths with empty, `.` or `..` segments are never live
    /// 3. `<maps_root>/<map-id>/tiles/...` is a tile; the prefix is stripped
    /// 4. Anything else is generic, prefix stripped if present
    ///
    /// The maps-root prefix is optional in rules 2 and 3, so `/world/tiles/...`
    /// and `/maps/world/tiles/...` resolve to the same key.
    pub fn classify(&self, raw_path: &str) -> ClassifiedPath {
        let path = raw_path.trim_start_matches('/');

        if path.is_empty() {
            debug!("Root request rewritten to entry document: {}", self.config.entry_document);
            return ClassifiedPath::new(PathKind::Generic, self.config.entry_document.clone());
        }

        let stripped = self.strip_maps_root(path);

        let classified = match map_section(stripped) {
            Some(LIVE_SEGMENT) if is_plain_path(path) => ClassifiedPath::new(PathKind::Live, path),
            Some(TILES_SEGMENT) => ClassifiedPath::new(PathKind::Tile, stripped),
            _ => ClassifiedPath::new(PathKind::Generic, self.generic_key(stripped)),
        };

        debug!(
            "Classified path={} kind={} key={}",
            raw_path,
            classified.kind.as_str(),
            classified.normalized_key
        );
        classified
    }

    /// Remove the `<maps_root>/` prefix when the path starts with it
    ///
    /// Only whole segments are stripped: with a root of `maps`, `mapsfoo/x`
    /// is left alone.
    fn strip_maps_root<'a>(&self, path: &'a str) -> &'a str {
        let root = self.config.maps_root.as_str();
        if root.is_empty() {
            return path;
        }

        match path.strip_prefix(root) {
            Some("") => "",
            Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/'),
            _ => path,
        }
    }

    /// Store key for a generic path, resolving directory requests
    fn generic_key(&self, stripped: &str) -> String {
        if stripped.is_empty() || stripped.ends_with('/') {
            format!("{}{}", stripped, self.config.entry_document)
        } else {
            stripped.to_string()
        }
    }
}

/// Whether every segment is a real name, so the origin cannot resolve the path
/// to somewhere outside the live directory
fn is_plain_path(path: &str) -> bool {
    path.split('/')
        .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

/// The section segment of `<map-id>/<section>/<rest>`, when all three parts
/// are present and non-empty
fn map_section(path: &str) -> Option<&str> {
    let mut parts = path.splitn(3, '/');
    let map_id = parts.next()?;
    let section = parts.next()?;
    let rest = parts.next()?;

    if map_id.is_empty() || rest.is_empty() {
        return None;
    }
    Some(section)
}
