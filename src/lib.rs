//! Tile Gateway
//!
//! An object-key resolution and content-negotiation engine for a rendered
//! map-tile asset tree. Given a request path it decides which storage keys to
//! probe, in what order, how to represent stored gzip variants to the client,
//! how to report a miss, and when to forward to a live origin instead.
//!
//! # Overview
//!
//! Every request flows through one entry point, [`Negotiator::handle`]:
//!
//! 1. [`PathClassifier`] strips the maps root and tags the path as tile, live
//!    or generic
//! 2. Live paths go to [`LiveProxy`], which relays the origin's answer with a
//!    short cache lifetime
//! 3. Other paths are expanded by [`KeyResolver`] into an ordered pair of
//!    candidate keys (plain and `.gz`)
//! 4. [`ObjectFetcher`] probes the candidates in order against an
//!    [`ObjectStore`], stopping at the first hit
//! 5. [`ResponseBuilder`] turns the hit, or the miss, into the final response
//!
//! A tile that exists under neither candidate is answered with `204 No Content`
//! since unrendered regions are expected to be sparse. Anything else that is
//! missing gets `404`.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tilegate::{GateConfig, InMemoryObjectStore, Negotiator, Request};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryObjectStore::new());
//! store.put("world/tiles/0/x0/z0.prbm.gz", vec![0x1f_u8, 0x8b]).await;
//!
//! let negotiator = Negotiator::new(Arc::new(GateConfig::default()), store)?;
//! let outcome = negotiator.handle(&Request::get("/maps/world/tiles/0/x0/z0.prbm")).await;
//! assert_eq!(outcome.header("content-encoding"), Some("gzip"));
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded from a YAML file:
//!
//! ```yaml
//! listen_address: "0.0.0.0:8080"
//! maps_root: "maps"
//! entry_document: "index.html"
//! cache_max_age: 3600
//! live_origin: "http://127.0.0.1:8100"
//! live_cache_max_age: 5
//! store:
//!   backend: filesystem
//!   root: "/srv/bluemap/web"
//! ```
//!
//! See [`GateConfig`] for every option and its default.
//!
//! # Error Handling
//!
//! All failures are expressed as [`GateError`]. Each variant maps to exactly
//! one HTTP status, and the orchestrator turns errors into responses so the
//! transport always receives a complete answer.

pub mod config;
pub mod content_type;
pub mod error;
pub mod key_resolver;
pub mod live_proxy;
pub mod metrics;
pub mod metrics_endpoint;
pub mod models;
pub mod negotiator;
pub mod object_fetcher;
pub mod path_classifier;
pub mod response_builder;
pub mod server;
pub mod store;

// Re-export commonly used types
pub use config::{GateConfig, MetricsEndpointConfig, StoreBackend, StoreConfig};
pub use error::{GateError, Result};
pub use key_resolver::KeyResolver;
pub use live_proxy::LiveProxy;
pub use metrics::GateMetrics;
pub use metrics_endpoint::MetricsEndpoint;
pub use models::{
    CandidateKey, ClassifiedPath, ContentEncoding, ObjectRecord, PathKind, Request,
    ResponseOutcome,
};
pub use negotiator::Negotiator;
pub use object_fetcher::ObjectFetcher;
pub use path_classifier::PathClassifier;
pub use response_builder::ResponseBuilder;
pub use server::GateServer;
pub use store::{FsObjectStore, InMemoryObjectStore, ObjectStore, StoreError, StoredObject};
