//! Live proxy for frequently changing positional data

use crate::config::GateConfig;
use crate::error::{GateError, Result};
use crate::models::{Request, ResponseOutcome};
use crate::response_builder::{cache_control_value, insert_cors};
use bytes::Bytes;
use http::header::{
    ACCEPT, CACHE_CONTROL, CONTENT_ENCODING, CONTENT_TYPE, ETAG, LAST_MODIFIED, LOCATION,
    USER_AGENT,
};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

/// User-Agent sent to the live origin
pub const LIVE_USER_AGENT: &str = concat!("tilegate/", env!("CARGO_PKG_VERSION"));

/// Characters re-encoded when the decoded path is put back into a URL
const PATH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Origin response headers relayed to the client
const RELAYED_HEADERS: [HeaderName; 5] =
    [CONTENT_TYPE, CONTENT_ENCODING, ETAG, LAST_MODIFIED, LOCATION];

/// LiveProxy forwards live requests to the configured origin server
///
/// Each request is one bounded attempt with no retry: live data is ephemeral
/// and clients poll again on their own.
pub struct LiveProxy {
    client: Client,
    origin: String,
    cache_control: HeaderValue,
}

impl LiveProxy {
    /// Create a new LiveProxy
    ///
    /// # Arguments
    /// * `origin` - Base URL of the origin, e.g. `http://127.0.0.1:8100`
    /// * `timeout` - Upper bound for the whole origin exchange
    /// * `max_age` - Cache lifetime in seconds set on relayed responses
    pub fn new(origin: impl Into<String>, timeout: Duration, max_age: u64) -> Result<Self> {
        // Redirects are relayed to the client, never followed
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|e| GateError::HttpError(format!("Failed to create HTTP client: {}", e)))?;

        let origin = origin.into().trim_end_matches('/').to_string();
        info!("Live proxy enabled: origin={}", origin);

        Ok(LiveProxy {
            client,
            origin,
            cache_control: cache_control_value(max_age),
        })
    }

    /// Build a LiveProxy from configuration, or `None` when no origin is set
    pub fn from_config(config: &GateConfig) -> Result<Option<Self>> {
        config
            .live_origin
            .as_deref()
            .map(|origin| {
                Self::new(
                    origin,
                    Duration::from_millis(config.live_timeout_ms),
                    config.live_cache_max_age,
                )
            })
            .transpose()
    }

    /// Origin base URL
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Full origin URL for a public live path (without leading '/')
    pub fn origin_url(&self, public_path: &str, query: Option<&str>) -> String {
        let path = utf8_percent_encode(public_path.trim_start_matches('/'), PATH_ENCODE_SET);
        match query {
            Some(query) if !query.is_empty() => format!("{}/{}?{}", self.origin, path, query),
            _ => format!("{}/{}", self.origin, path),
        }
    }

    /// Forward a live request and relay the origin's answer
    ///
    /// The origin's status and body are relayed unchanged. `Cache-Control` is
    /// replaced with the short live lifetime and the CORS header is always
    /// set. Any transport failure becomes [`GateError::UpstreamUnavailable`].
    pub async fn forward(&self, request: &Request, public_path: &str) -> Result<ResponseOutcome> {
        let url = self.origin_url(public_path, request.query.as_deref());
        debug!("Forwarding live request: method={}, url={}", request.method, url);

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header(USER_AGENT, LIVE_USER_AGENT);
        if let Some(accept) = request.headers.get(ACCEPT) {
            builder = builder.header(ACCEPT, accept.clone());
        }

        let response = builder.send().await.map_err(|e| {
            warn!("Live origin request failed for url={}: {}", url, e);
            GateError::UpstreamUnavailable(format!("request to {} failed: {}", url, e))
        })?;

        let status = response.status();
        let mut headers = HeaderMap::new();
        for name in RELAYED_HEADERS {
            if let Some(value) = response.headers().get(&name) {
                headers.insert(name, value.clone());
            }
        }
        headers.insert(CACHE_CONTROL, self.cache_control.clone());
        insert_cors(&mut headers);

        let body: Bytes = response.bytes().await.map_err(|e| {
            warn!("Failed to read live origin body for url={}: {}", url, e);
            GateError::UpstreamUnavailable(format!("reading body from {} failed: {}", url, e))
        })?;

        debug!(
            "Relayed live response: url={}, status={}, size={}",
            url,
            status,
            body.len()
        );

        Ok(ResponseOutcome {
            status,
            headers,
            body: if request.method == Method::HEAD {
                None
            } else {
                Some(body)
            },
        })
    }
}
