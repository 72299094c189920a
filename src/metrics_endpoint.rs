//! Operational HTTP endpoint
//!
//! Runs on its own listener, separate from the public gateway, and serves:
//!
//! - `GET /metrics` - Prometheus text exposition
//! - `GET /health` - liveness check
//! - `GET /keys?prefix=<p>&limit=<n>` - bounded listing of stored keys
//!
//! Nothing here takes part in request negotiation.

use crate::negotiator::Negotiator;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use percent_encoding::percent_decode_str;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Operational endpoint server
pub struct MetricsEndpoint {
    negotiator: Negotiator,
    addr: SocketAddr,
}

impl MetricsEndpoint {
    /// Create a new endpoint serving data from `negotiator`
    pub fn new(negotiator: Negotiator, addr: SocketAddr) -> Self {
        Self { negotiator, addr }
    }

    /// Start the endpoint server
    ///
    /// Runs until the process is terminated or the listener fails.
    pub async fn start(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(self.addr).await?;
        info!("Metrics endpoint listening on http://{}", self.addr);
        info!("  GET /metrics - Prometheus metrics");
        info!("  GET /health  - Health status");
        info!("  GET /keys    - Stored keys under ?prefix= (bounded by ?limit=)");

        loop {
            let (stream, _) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let negotiator = self.negotiator.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let negotiator = negotiator.clone();
                    async move { Ok::<_, hyper::Error>(handle_request(req, &negotiator).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection: {:?}", err);
                }
            });
        }
    }
}

/// Route a request on the operational endpoint
pub async fn handle_request<B>(req: Request<B>, negotiator: &Negotiator) -> Response<Full<Bytes>> {
    if req.method() != Method::GET {
        return text_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed\n");
    }

    match req.uri().path() {
        "/metrics" => metrics_response(negotiator),
        "/health" => json_response(StatusCode::OK, r#"{"status":"healthy"}"#.to_string()),
        "/keys" => keys_response(req.uri().query(), negotiator).await,
        _ => json_response(StatusCode::NOT_FOUND, r#"{"error":"not found"}"#.to_string()),
    }
}

fn metrics_response(negotiator: &Negotiator) -> Response<Full<Bytes>> {
    match negotiator.metrics().encode() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "text/plain; version=0.0.4; charset=utf-8")
            .body(Full::new(Bytes::from(body)))
            .unwrap_or_else(|_| internal_error()),
        Err(e) => {
            warn!("Failed to encode metrics: {}", e);
            internal_error()
        }
    }
}

async fn keys_response(query: Option<&str>, negotiator: &Negotiator) -> Response<Full<Bytes>> {
    let params = parse_query(query.unwrap_or(""));
    let prefix = params
        .iter()
        .find(|(name, _)| name == "prefix")
        .map(|(_, value)| value.as_str())
        .unwrap_or("");

    let limit = match params.iter().find(|(name, _)| name == "limit") {
        Some((_, value)) => match value.parse::<usize>() {
            Ok(limit) => Some(limit),
            Err(_) => {
                return json_response(
                    StatusCode::BAD_REQUEST,
                    r#"{"error":"limit must be a non-negative integer"}"#.to_string(),
                )
            }
        },
        None => None,
    };

    match negotiator.list_keys(prefix, limit).await {
        Ok(keys) => match serde_json::to_string(&keys) {
            Ok(body) => json_response(StatusCode::OK, body),
            Err(_) => internal_error(),
        },
        Err(e) => {
            warn!("Key listing failed for prefix={}: {}", prefix, e);
            json_response(
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({ "error": e.to_string() }).to_string(),
            )
        }
    }
}

/// Split a raw query string into decoded name/value pairs
fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(name), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    percent_decode_str(&raw).decode_utf8_lossy().into_owned()
}

fn json_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| internal_error())
}

fn text_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap_or_else(|_| internal_error())
}

fn internal_error() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateConfig;
    use crate::store::InMemoryObjectStore;
    use http_body_util::BodyExt;
    use std::sync::Arc;

    async fn create_negotiator() -> Negotiator {
        let store = Arc::new(InMemoryObjectStore::new());
        store.put("world/settings.json.gz", "x").await;
        store.put("world/textures.json.gz", "x").await;
        store.put("nether/settings.json.gz", "x").await;
        Negotiator::new(Arc::new(GateConfig::default()), store).unwrap()
    }

    async fn body_string(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(uri: &str) -> Request<()> {
        Request::builder().uri(uri).body(()).unwrap()
    }

    #[test]
    fn test_parse_query() {
        assert_eq!(
            parse_query("prefix=world%2Ftiles&limit=5&flag"),
            vec![
                ("prefix".to_string(), "world/tiles".to_string()),
                ("limit".to_string(), "5".to_string()),
                ("flag".to_string(), String::new()),
            ]
        );
        assert!(parse_query("").is_empty());
    }

    #[tokio::test]
    async fn test_keys_listing() {
        let negotiator = create_negotiator().await;
        let response = handle_request(get("/keys?prefix=world/&limit=1"), &negotiator).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#"["world/settings.json.gz"]"#);
    }

    #[tokio::test]
    async fn test_keys_invalid_limit() {
        let negotiator = create_negotiator().await;
        let response = handle_request(get("/keys?limit=many"), &negotiator).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_metrics_and_health() {
        let negotiator = create_negotiator().await;
        negotiator
            .handle(&crate::models::Request::get("/world/tiles/0/x0/z0.prbm"))
            .await;

        let response = handle_request(get("/metrics"), &negotiator).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("tilegate_requests_total{kind=\"tile\",outcome=\"soft_absent\"} 1"));

        let response = handle_request(get("/health"), &negotiator).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = handle_request(get("/nope"), &negotiator).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
