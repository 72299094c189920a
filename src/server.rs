//! Public HTTP transport
//!
//! Accepts connections, decodes the request path once and hands the request
//! to the [`Negotiator`]. All negotiation semantics live behind that call.

use crate::models::Request as GateRequest;
use crate::negotiator::Negotiator;
use crate::response_builder::insert_cors;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use percent_encoding::percent_decode_str;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// Gateway server bound to the public listen address
pub struct GateServer {
    negotiator: Negotiator,
    addr: SocketAddr,
}

impl GateServer {
    pub fn new(negotiator: Negotiator, addr: SocketAddr) -> Self {
        Self { negotiator, addr }
    }

    /// Bind the listen address and serve until the listener fails
    pub async fn start(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(self.addr).await?;
        info!("Tile gateway listening on http://{}", self.addr);
        serve(listener, self.negotiator).await
    }
}

/// Serve connections from an already bound listener
///
/// Each connection runs on its own task; requests never wait on one another.
pub async fn serve(
    listener: TcpListener,
    negotiator: Negotiator,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    loop {
        let (stream, peer) = listener.accept().await?;
        debug!("Accepted connection from {}", peer);
        let io = TokioIo::new(stream);
        let negotiator = negotiator.clone();

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

/// Translate a hyper request, negotiate it and translate the outcome back
///
/// The request body is never read: only GET, HEAD and OPTIONS are served.
pub async fn handle_request<B>(req: Request<B>, negotiator: &Negotiator) -> Response<Full<Bytes>> {
    let (parts, _body) = req.into_parts();

    let path = match percent_decode_str(parts.uri.path()).decode_utf8() {
        Ok(path) => path.into_owned(),
        Err(_) => {
            debug!("Rejected undecodable path={}", parts.uri.path());
            return bad_request();
        }
    };

    let request = GateRequest {
        method: parts.method,
        path,
        query: parts.uri.query().map(str::to_string),
        headers: parts.headers,
    };

    negotiator.handle(&request).await.into_response()
}

fn bad_request() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::BAD_REQUEST;
    insert_cors(response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateConfig;
    use crate::store::InMemoryObjectStore;
    use std::sync::Arc;

    async fn create_negotiator() -> (Negotiator, Arc<InMemoryObjectStore>) {
        let store = Arc::new(InMemoryObjectStore::new());
        store.put("my world/index.html", "<html></html>").await;
        let negotiator =
            Negotiator::new(Arc::new(GateConfig::default()), store.clone()).unwrap();
        (negotiator, store)
    }

    #[tokio::test]
    async fn test_path_is_decoded_once() {
        let (negotiator, _) = create_negotiator().await;
        let req = Request::builder()
            .uri("/maps/my%20world/index.html")
            .body(())
            .unwrap();
        let response = handle_request(req, &negotiator).await;
        assert_eq!(response.status(), StatusCode::OK);

        // %2520 decodes to a literal "%20", which is a different key
        let req = Request::builder()
            .uri("/maps/my%2520world/index.html")
            .body(())
            .unwrap();
        let response = handle_request(req, &negotiator).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_bad_request() {
        let (negotiator, store) = create_negotiator().await;
        let req = Request::builder().uri("/maps/%FF.json").body(()).unwrap();
        let response = handle_request(req, &negotiator).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
        assert_eq!(store.get_calls(), 0);
    }
}
