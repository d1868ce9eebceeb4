//! HTTP request handlers

use axum::{
    extract::{Query, State},
    response::Html,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::AppState;
use crate::catalog::{Namespace, Service};
use crate::error::{AppResult, PluginError};
use crate::metrics::PluginStats;
use crate::plugin::{ConfigPolicy, Metric};

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

/// `GET /catalog` query
#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub service: Option<Service>,
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub namespaces: Vec<String>,
}

/// `POST /collect` body
#[derive(Debug, Deserialize)]
pub struct CollectRequest {
    pub namespaces: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CollectResponse {
    pub metrics: Vec<MetricRecord>,
}

/// Wire form of a collected metric: namespace flattened to its string
#[derive(Debug, Serialize)]
pub struct MetricRecord {
    pub namespace: String,
    pub value: f64,
    pub timestamp: u64,
    pub tags: std::collections::HashMap<String, String>,
}

impl From<Metric> for MetricRecord {
    fn from(metric: Metric) -> Self {
        Self {
            namespace: metric.namespace.to_string(),
            value: metric.value,
            timestamp: metric.timestamp,
            tags: metric.tags,
        }
    }
}

/// Root endpoint - displays basic info
pub async fn root(State(state): State<AppState>) -> Html<String> {
    let services: Vec<String> = state
        .collector
        .services()
        .iter()
        .map(|s| s.to_string())
        .collect();

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>mesos-collector</title>
</head>
<body>
    <h1>mesos-collector</h1>
    <p>Version: {}</p>
    <p>Services: {}</p>
    <ul>
        <li><a href="/health">Health Check</a></li>
        <li><a href="/catalog">Catalog</a></li>
        <li><a href="/policy">Config Policy</a></li>
        <li><a href="/stats">Stats</a></li>
    </ul>
</body>
</html>"#,
        env!("CARGO_PKG_VERSION"),
        services.join(", ")
    ))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Discovery
#[instrument(skip(state), name = "catalog_handler")]
pub async fn catalog(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> AppResult<Json<CatalogResponse>> {
    let namespaces = state.collector.metric_types(query.service).await?;
    Ok(Json(CatalogResponse {
        namespaces: namespaces.iter().map(Namespace::to_string).collect(),
    }))
}

/// Collection
///
/// Malformed namespace strings are rejected with 400 before any upstream
/// request is made.
#[instrument(skip(state, request), name = "collect_handler", fields(count = request.namespaces.len()))]
pub async fn collect(
    State(state): State<AppState>,
    Json(request): Json<CollectRequest>,
) -> AppResult<Json<CollectResponse>> {
    let requested = request
        .namespaces
        .iter()
        .map(|s| s.parse::<Namespace>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(PluginError::from)?;

    let metrics = state.collector.collect_metrics(&requested).await?;
    debug!(records = metrics.len(), "Collected");

    Ok(Json(CollectResponse {
        metrics: metrics.into_iter().map(MetricRecord::from).collect(),
    }))
}

pub async fn policy(State(state): State<AppState>) -> Json<ConfigPolicy> {
    Json(state.collector.config_policy())
}

pub async fn stats(State(state): State<AppState>) -> Json<PluginStats> {
    Json(state.collector.metrics().snapshot())
}
