//! Negotiation orchestrator
//!
//! [`Negotiator`] is the single entry point the transport calls for every
//! request. It sequences classification, live proxying, candidate resolution,
//! store probing and response building, and produces exactly one
//! [`ResponseOutcome`] per request.

use crate::config::GateConfig;
use crate::error::{GateError, Result};
use crate::key_resolver::KeyResolver;
use crate::live_proxy::LiveProxy;
use crate::metrics::GateMetrics;
use crate::models::{ClassifiedPath, PathKind, Request, ResponseOutcome};
use crate::object_fetcher::ObjectFetcher;
use crate::path_classifier::PathClassifier;
use crate::response_builder::ResponseBuilder;
use crate::store::ObjectStore;
use http::{Method, StatusCode};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Default number of keys returned by [`Negotiator::list_keys`]
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Upper bound on keys returned by [`Negotiator::list_keys`]
pub const MAX_LIST_LIMIT: usize = 1000;

/// Label used for requests rejected before classification
const UNCLASSIFIED: &str = "none";

/// Main negotiation structure that integrates all gateway components
///
/// Holds no per-request mutable state: configuration, store handle and origin
/// client are provided at construction and only read afterwards.
#[derive(Clone)]
pub struct Negotiator {
    config: Arc<GateConfig>,
    classifier: Arc<PathClassifier>,
    resolver: KeyResolver,
    fetcher: ObjectFetcher,
    builder: ResponseBuilder,
    live_proxy: Option<Arc<LiveProxy>>,
    metrics: Arc<GateMetrics>,
}

impl Negotiator {
    /// Create a new Negotiator
    ///
    /// The live proxy is enabled when `config.live_origin` is set.
    ///
    /// # Example
    /// ```
    /// use tilegate::{GateConfig, InMemoryObjectStore, Negotiator};
    /// use std::sync::Arc;
    ///
    /// let store = Arc::new(InMemoryObjectStore::new());
    /// let negotiator = Negotiator::new(Arc::new(GateConfig::default()), store).unwrap();
    /// assert!(!negotiator.live_enabled());
    /// ```
    pub fn new(config: Arc<GateConfig>, store: Arc<dyn ObjectStore>) -> Result<Self> {
        let live_proxy = LiveProxy::from_config(&config)?.map(Arc::new);
        let metrics = Arc::new(GateMetrics::new()?);

        Ok(Negotiator {
            classifier: Arc::new(PathClassifier::new(Arc::clone(&config))),
            resolver: KeyResolver::new(),
            fetcher: ObjectFetcher::new(store),
            builder: ResponseBuilder::new(config.cache_max_age),
            live_proxy,
            metrics,
            config,
        })
    }

    /// Replace the metrics collector, e.g. to share one with an endpoint
    pub fn with_metrics(mut self, metrics: Arc<GateMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Get a reference to the metrics collector
    pub fn metrics(&self) -> &GateMetrics {
        &self.metrics
    }

    /// Get a cloned Arc to the metrics collector
    pub fn metrics_arc(&self) -> Arc<GateMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Whether live paths are proxied to an origin
    pub fn live_enabled(&self) -> bool {
        self.live_proxy.is_some()
    }

    /// Handle one request
    ///
    /// # Flow
    /// 1. OPTIONS gets the fixed preflight answer, without store access
    /// 2. Methods other than GET and HEAD get 405
    /// 3. The path is classified
    /// 4. Live paths go to the live proxy (404 when no origin is configured)
    /// 5. Other paths probe their candidate keys in priority order, stopping
    ///    at the first hit
    pub async fn handle(&self, request: &Request) -> ResponseOutcome {
        let start_time = Instant::now();

        if request.method == Method::OPTIONS {
            debug!("Preflight for path={}", request.path);
            self.metrics
                .record_outcome(UNCLASSIFIED, "preflight", start_time.elapsed());
            return self.builder.preflight();
        }

        if request.method != Method::GET && request.method != Method::HEAD {
            let error = GateError::MethodNotAllowed(request.method.to_string());
            info!("Rejected method={} path={}", request.method, request.path);
            self.metrics
                .record_outcome(UNCLASSIFIED, error.outcome_label(), start_time.elapsed());
            return self.builder.error(&error);
        }

        let classified = self.classifier.classify(&request.path);
        let kind = classified.kind.as_str();

        let result = match classified.kind {
            PathKind::Live => self.handle_live(request, &classified).await,
            PathKind::Tile | PathKind::Generic => self.negotiate(request, &classified).await,
        };

        let (outcome, label) = match result {
            Ok(outcome) => {
                let label = success_label(classified.kind, outcome.status);
                (outcome, label)
            }
            Err(error) => {
                if error.is_absence() {
                    debug!("{} for path={}", error, request.path);
                } else {
                    warn!("{} for path={}", error, request.path);
                }
                (self.builder.error(&error), error.outcome_label())
            }
        };

        info!(
            "{} {} kind={} key={} status={} outcome={} duration_ms={}",
            request.method,
            request.path,
            kind,
            classified.normalized_key,
            outcome.status.as_u16(),
            label,
            start_time.elapsed().as_millis()
        );
        self.metrics.record_outcome(kind, label, start_time.elapsed());

        outcome
    }

    /// Probe candidates in priority order and build the response for the first hit
    async fn negotiate(
        &self,
        request: &Request,
        classified: &ClassifiedPath,
    ) -> Result<ResponseOutcome> {
        let candidates = self.resolver.resolve(classified);

        for candidate in &candidates {
            match self.fetcher.fetch(candidate).await {
                Ok(Some(record)) => {
                    self.metrics.record_probe("hit");
                    return Ok(self
                        .builder
                        .found(record, &request.method, request.if_none_match()));
                }
                Ok(None) => self.metrics.record_probe("miss"),
                Err(error) => {
                    self.metrics.record_probe("error");
                    return Err(error);
                }
            }
        }

        let key = classified.normalized_key.clone();
        match classified.kind {
            PathKind::Tile => Err(GateError::SoftAbsent(key)),
            PathKind::Live | PathKind::Generic => Err(GateError::HardAbsent(key)),
        }
    }

    /// Forward a live request, or report it absent when no origin is configured
    async fn handle_live(
        &self,
        request: &Request,
        classified: &ClassifiedPath,
    ) -> Result<ResponseOutcome> {
        match &self.live_proxy {
            Some(proxy) => proxy.forward(request, &classified.normalized_key).await,
            None => Err(GateError::HardAbsent(classified.normalized_key.clone())),
        }
    }

    /// List stored keys under a prefix
    ///
    /// Operational aid only; it shares the store handle but never takes part
    /// in negotiation. `limit` defaults to [`DEFAULT_LIST_LIMIT`] and is capped
    /// at [`MAX_LIST_LIMIT`].
    pub async fn list_keys(&self, prefix: &str, limit: Option<usize>) -> Result<Vec<String>> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT);
        self.fetcher
            .store()
            .list(prefix, limit)
            .await
            .map_err(|e| GateError::StoreUnavailable(e.to_string()))
    }
}

/// Outcome label for a successful result
fn success_label(kind: PathKind, status: StatusCode) -> &'static str {
    match (kind, status) {
        (PathKind::Live, _) => "proxied",
        (_, StatusCode::NOT_MODIFIED) => "not_modified",
        _ => "found",
    }
}
