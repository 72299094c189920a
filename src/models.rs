//! Core data models for the tile gateway

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, Response, StatusCode};
use http_body_util::Full;
use serde::{Deserialize, Serialize};

/// Suffix the renderer appends to compressed objects
pub const GZIP_SUFFIX: &str = ".gz";

/// An incoming request as seen by the negotiation engine
///
/// The transport decodes `path` exactly once before building this value.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
}

impl Request {
    /// Create a request with no query string and no headers
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Request {
            method,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
        }
    }

    /// Shorthand for a GET request
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Add a header, ignoring values that are not valid header text
    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Attach a raw query string (without the leading '?')
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Value of the `If-None-Match` validator, if any
    pub fn if_none_match(&self) -> Option<&str> {
        self.headers
            .get(http::header::IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok())
    }
}

/// Semantic kind of a request path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathKind {
    /// A spatially addressed chunk of rendered map data, expected to be sparse
    Tile,
    /// Frequently changing positional data served by a live origin
    Live,
    /// Anything else in the asset tree
    Generic,
}

impl PathKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PathKind::Tile => "tile",
            PathKind::Live => "live",
            PathKind::Generic => "generic",
        }
    }
}

/// A request path after prefix stripping and classification
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassifiedPath {
    pub kind: PathKind,
    /// Store key for tile and generic paths; the public path for live paths
    pub normalized_key: String,
}

impl ClassifiedPath {
    pub fn new(kind: PathKind, normalized_key: impl Into<String>) -> Self {
        ClassifiedPath {
            kind,
            normalized_key: normalized_key.into(),
        }
    }
}

/// One storage key to probe, in priority order (0 first)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateKey {
    pub key: String,
    pub expect_compressed: bool,
    pub priority: u32,
}

impl CandidateKey {
    pub fn new(key: impl Into<String>, expect_compressed: bool, priority: u32) -> Self {
        CandidateKey {
            key: key.into(),
            expect_compressed,
            priority,
        }
    }

    /// Key of the uncompressed resource this candidate represents
    pub fn logical_key(&self) -> &str {
        if self.expect_compressed {
            self.key.strip_suffix(GZIP_SUFFIX).unwrap_or(&self.key)
        } else {
            &self.key
        }
    }
}

/// Content-Encoding of a stored object as served to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentEncoding {
    None,
    Gzip,
}

/// An object found in the store for one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    /// Storage key that was hit
    pub key: String,
    /// Key of the uncompressed resource, used for content-type detection
    pub logical_key: String,
    pub etag: String,
    pub size_bytes: u64,
    pub content_encoding: ContentEncoding,
    pub body: Bytes,
}

/// Terminal response value, produced exactly once per request
#[derive(Debug, Clone)]
pub struct ResponseOutcome {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl ResponseOutcome {
    /// Create an outcome with no headers and no body
    pub fn empty(status: StatusCode) -> Self {
        ResponseOutcome {
            status,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Header value as a string, if present and valid text
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Length of the body in bytes (0 when absent)
    pub fn body_len(&self) -> usize {
        self.body.as_ref().map_or(0, Bytes::len)
    }

    /// Convert into a hyper-compatible response
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body.unwrap_or_default()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_logical_key() {
        let compressed = CandidateKey::new("world/textures.json.gz", true, 0);
        assert_eq!(compressed.logical_key(), "world/textures.json");

        let plain = CandidateKey::new("world/textures.json", false, 1);
        assert_eq!(plain.logical_key(), "world/textures.json");
    }

    #[test]
    fn test_request_if_none_match() {
        let request = Request::get("/index.html").with_header("if-none-match", "\"abc\"");
        assert_eq!(request.if_none_match(), Some("\"abc\""));
        assert_eq!(Request::get("/").if_none_match(), None);
    }

    #[test]
    fn test_outcome_into_response() {
        let mut outcome = ResponseOutcome::empty(StatusCode::NO_CONTENT);
        outcome
            .headers
            .insert("access-control-allow-origin", HeaderValue::from_static("*"));
        let response = outcome.into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers().get("access-control-allow-origin").unwrap(), "*");
    }
}
