//! Error types for the tile gateway

use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GateError>;

/// Error types that can occur while negotiating a request
///
/// The first five variants are terminal request outcomes: each maps to exactly
/// one HTTP status through [`GateError::to_http_status`]. The remaining
/// variants only occur while the gateway is being set up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Tile not rendered: {0}")]
    SoftAbsent(String),

    #[error("Resource not found: {0}")]
    HardAbsent(String),

    #[error("Live origin unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Object store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),
}

impl GateError {
    /// Convert error to HTTP status code
    ///
    /// - Unsupported verbs return 405
    /// - Missing tiles return 204 so sparse pyramids do not produce client errors
    /// - Missing non-tile resources return 404
    /// - Live origin transport failures return 502
    /// - Object store failures return 503
    /// - Setup errors return 500
    pub fn to_http_status(&self) -> u16 {
        match self {
            GateError::MethodNotAllowed(_) => 405,
            GateError::SoftAbsent(_) => 204,
            GateError::HardAbsent(_) => 404,
            GateError::UpstreamUnavailable(_) => 502,
            GateError::StoreUnavailable(_) => 503,
            GateError::ConfigError(_) => 500,
            GateError::HttpError(_) => 500,
        }
    }

    /// Whether this error describes a missing resource rather than a failure
    pub fn is_absence(&self) -> bool {
        matches!(self, GateError::SoftAbsent(_) | GateError::HardAbsent(_))
    }

    /// Short label used for logs and the outcome metric
    pub fn outcome_label(&self) -> &'static str {
        match self {
            GateError::MethodNotAllowed(_) => "method_not_allowed",
            GateError::SoftAbsent(_) => "soft_absent",
            GateError::HardAbsent(_) => "hard_absent",
            GateError::UpstreamUnavailable(_) => "upstream_unavailable",
            GateError::StoreUnavailable(_) => "store_unavailable",
            GateError::ConfigError(_) | GateError::HttpError(_) => "internal_error",
        }
    }

    /// Create a ConfigError from any message
    pub fn config(message: impl Into<String>) -> Self {
        GateError::ConfigError(message.into())
    }
}
