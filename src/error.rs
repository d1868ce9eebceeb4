//! Error types for mesos-collector
//!
//! This module defines the error types used throughout the application.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::catalog::Service;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Discovery or collection error
    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),
}

/// Transport and decode errors raised while talking to a Mesos endpoint
#[derive(Error, Debug)]
pub enum CollectorError {
    /// HTTP client initialization failed
    #[error("Failed to initialize HTTP client: {0}")]
    HttpClientInit(#[source] reqwest::Error),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[source] reqwest::Error),

    /// Reading the HTTP response failed
    #[error("Failed to read HTTP response: {0}")]
    HttpResponse(#[source] reqwest::Error),

    /// Non-200 status from a fetch endpoint
    #[error("HTTP error status: {0}")]
    HttpStatus(u16),

    /// Malformed JSON body
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// Request timed out
    /// The value is the configured timeout in milliseconds, if known.
    #[error("Request timed out{}", .0.map(|ms| format!(" after {}ms", ms)).unwrap_or_default())]
    Timeout(Option<u64>),

    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The redirect probe answered with something other than 307
    #[error("Expected HTTP 307 from redirect endpoint, got {0}")]
    UnexpectedStatus(u16),

    /// The redirect probe answered 307 without a Location header
    #[error("Redirect response has no Location header")]
    MissingLocation,

    /// The Location header could not be parsed into a host
    #[error("Invalid redirect location '{0}'")]
    InvalidLocation(String),
}

impl CollectorError {
    /// Extract the HTTP status code, if any
    pub fn http_status(&self) -> Option<u16> {
        match self {
            CollectorError::HttpStatus(code) | CollectorError::UnexpectedStatus(code) => {
                Some(*code)
            }
            _ => None,
        }
    }

    /// Create a Timeout error with known duration
    pub fn timeout_with_duration(ms: u64) -> Self {
        CollectorError::Timeout(Some(ms))
    }
}

impl From<reqwest::Error> for CollectorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest does not expose the configured duration here; callers that
            // know it use CollectorError::timeout_with_duration().
            CollectorError::Timeout(None)
        } else if err.is_connect() {
            CollectorError::ConnectionFailed(err.to_string())
        } else if err.is_request() {
            CollectorError::HttpRequest(err)
        } else {
            CollectorError::HttpResponse(err)
        }
    }
}

/// Malformed namespace strings or a dynamic-element layout that does not
/// match the service hierarchy
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NamespaceError {
    /// Empty namespace or empty segment
    #[error("Empty segment in namespace '{0}'")]
    EmptySegment(String),

    /// First element is not a known service
    #[error("Unknown service '{0}' (expected 'master' or 'agent')")]
    UnknownService(String),

    /// Dynamic elements present but not at the positions the service expects
    #[error("Namespace '{namespace}' has an invalid layout: {reason}")]
    InvalidLayout { namespace: String, reason: String },
}

/// Errors surfaced by the discovery and collection calls
#[derive(Error, Debug)]
pub enum PluginError {
    /// Upstream fetch or decode failure
    #[error(transparent)]
    Collector(#[from] CollectorError),

    /// Bad namespace in a request
    #[error(transparent)]
    Namespace(#[from] NamespaceError),

    /// A specifically requested flat snapshot metric does not exist
    #[error("Requested metric '{namespace}' is not present in the snapshot")]
    MissingMetric { namespace: String },

    /// A request targets a service with no configured endpoint
    #[error("No endpoint configured for service '{0}'")]
    ServiceNotConfigured(Service),

    /// Neither master nor agent configured
    #[error("At least one of 'master' or 'agent' must be configured")]
    NoEndpoints,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, public_message, log_message) = match self {
            AppError::Config(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Configuration error".to_string(),
                e.to_string(),
            ),
            AppError::Plugin(e) => {
                let status = match &e {
                    PluginError::Collector(_) => StatusCode::BAD_GATEWAY,
                    PluginError::Namespace(_) | PluginError::ServiceNotConfigured(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    PluginError::MissingMetric { .. } => StatusCode::NOT_FOUND,
                    PluginError::NoEndpoints => StatusCode::INTERNAL_SERVER_ERROR,
                };
                // Namespace and missing-metric messages are safe to echo back.
                let public = match status {
                    StatusCode::BAD_GATEWAY => "Upstream error".to_string(),
                    _ => e.to_string(),
                };
                (status, public, e.to_string())
            }
        };

        tracing::error!(status = %status, error = %log_message, "Request failed");

        (status, public_message).into_response()
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message() {
        assert_eq!(
            CollectorError::timeout_with_duration(5000).to_string(),
            "Request timed out after 5000ms"
        );
        assert_eq!(CollectorError::Timeout(None).to_string(), "Request timed out");
    }

    #[test]
    fn test_http_status_extraction() {
        assert_eq!(CollectorError::HttpStatus(503).http_status(), Some(503));
        assert_eq!(CollectorError::UnexpectedStatus(200).http_status(), Some(200));
        assert_eq!(CollectorError::MissingLocation.http_status(), None);
    }

    #[test]
    fn test_missing_metric_maps_to_not_found() {
        let err = AppError::Plugin(PluginError::MissingMetric {
            namespace: "agent/system/cpus_total".to_string(),
        });
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_upstream_error_maps_to_bad_gateway() {
        let err = AppError::Plugin(PluginError::Collector(CollectorError::HttpStatus(500)));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
