//! Response builder for found objects, misses and error outcomes

use crate::content_type::content_type_for;
use crate::error::GateError;
use crate::models::{ContentEncoding, ObjectRecord, PathKind, ResponseOutcome};
use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_MAX_AGE, ALLOW, CACHE_CONTROL, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE,
    ETAG, VARY,
};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use tracing::{debug, warn};

/// Methods the gateway answers
pub const ALLOWED_METHODS: &str = "GET, HEAD, OPTIONS";

/// Request headers a cross-origin caller may send
pub const ALLOWED_HEADERS: &str = "Accept, If-None-Match, Content-Type";

/// How long a browser may cache a preflight answer, in seconds
pub const PREFLIGHT_MAX_AGE: &str = "86400";

/// Builds the terminal response for every request outcome
///
/// Every response produced here carries `Access-Control-Allow-Origin: *`,
/// including errors.
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    cache_control: HeaderValue,
}

impl ResponseBuilder {
    /// Create a builder using `max_age` seconds for found objects
    pub fn new(max_age: u64) -> Self {
        ResponseBuilder {
            cache_control: cache_control_value(max_age),
        }
    }

    /// Build the response for a found object
    ///
    /// Returns 304 when `if_none_match` matches the record's etag, otherwise
    /// 200. HEAD requests get the same headers and no body.
    pub fn found(
        &self,
        record: ObjectRecord,
        method: &Method,
        if_none_match: Option<&str>,
    ) -> ResponseOutcome {
        let mut headers = HeaderMap::new();
        insert_cors(&mut headers);

        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(content_type_for(&record.logical_key)),
        );
        headers.insert(CACHE_CONTROL, self.cache_control.clone());

        if record.content_encoding == ContentEncoding::Gzip {
            headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
            headers.insert(VARY, HeaderValue::from_static("Accept-Encoding"));
        }

        match HeaderValue::from_str(&record.etag) {
            Ok(etag) => {
                headers.insert(ETAG, etag);
            }
            Err(e) => warn!("Dropping invalid etag for key={}: {}", record.key, e),
        }

        if let Some(validator) = if_none_match {
            if etag_matches(validator, &record.etag) {
                debug!("Conditional match for key={}, etag={}", record.key, record.etag);
                return ResponseOutcome {
                    status: StatusCode::NOT_MODIFIED,
                    headers,
                    body: None,
                };
            }
        }

        headers.insert(CONTENT_LENGTH, HeaderValue::from(record.size_bytes));

        let body = if *method == Method::HEAD {
            None
        } else {
            Some(record.body)
        };

        debug!(
            "Built found response: key={}, encoding={:?}, size={}",
            record.key, record.content_encoding, record.size_bytes
        );

        ResponseOutcome {
            status: StatusCode::OK,
            headers,
            body,
        }
    }

    /// Build the response for exhausted candidates
    ///
    /// Tiles are expected to be sparse, so a missing tile is 204 without a
    /// cache directive; a later render can still populate it. Everything else
    /// is 404.
    pub fn miss(&self, kind: PathKind) -> ResponseOutcome {
        let status = match kind {
            PathKind::Tile => StatusCode::NO_CONTENT,
            PathKind::Live | PathKind::Generic => StatusCode::NOT_FOUND,
        };
        bare(status)
    }

    /// Build the response for an error outcome
    pub fn error(&self, error: &GateError) -> ResponseOutcome {
        let status = StatusCode::from_u16(error.to_http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut outcome = bare(status);

        if matches!(error, GateError::MethodNotAllowed(_)) {
            outcome
                .headers
                .insert(ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
        }
        outcome
    }

    /// Fixed capability advertisement for preflight requests
    pub fn preflight(&self) -> ResponseOutcome {
        let mut outcome = bare(StatusCode::NO_CONTENT);
        outcome.headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        outcome.headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        );
        outcome
            .headers
            .insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(PREFLIGHT_MAX_AGE));
        outcome
    }
}

/// `public, max-age=<seconds>`
pub fn cache_control_value(max_age: u64) -> HeaderValue {
    HeaderValue::from_str(&format!("public, max-age={}", max_age))
        .unwrap_or_else(|_| HeaderValue::from_static("no-cache"))
}

/// Add the CORS allow-all header, replacing any existing value
pub fn insert_cors(headers: &mut HeaderMap) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
}

/// Status-only outcome with the CORS header
fn bare(status: StatusCode) -> ResponseOutcome {
    let mut outcome = ResponseOutcome::empty(status);
    insert_cors(&mut outcome.headers);
    outcome
}

/// Whether an `If-None-Match` value matches an etag
///
/// Uses weak comparison: a `W/` prefix on either side is ignored. The value
/// may be `*` or a comma-separated list of entity tags.
pub fn etag_matches(if_none_match: &str, etag: &str) -> bool {
    let if_none_match = if_none_match.trim();
    if if_none_match == "*" {
        return true;
    }

    let etag = strip_weak(etag.trim());
    if_none_match
        .split(',')
        .map(|candidate| strip_weak(candidate.trim()))
        .any(|candidate| !candidate.is_empty() && candidate == etag)
}

fn strip_weak(tag: &str) -> &str {
    tag.strip_prefix("W/").unwrap_or(tag)
}
