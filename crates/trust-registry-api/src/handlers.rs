//! API request handlers
//!
//! This module implements HTTP request handlers for all API endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    Json,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use trust_registry_core::{
    Artifact, ArtifactId, ArtifactMetadata, ArtifactQuery, ArtifactType, CostReport,
    LicenseCheckResult, LineageGraph, Rating,
};
use trust_registry_service::{
    ArtifactSourceRequest, LicenseCheckRequest, RegexSearchRequest, ServiceRegistry,
};

use crate::{
    auth::AuthState,
    error::{ApiError, ApiResult},
    metrics::render_metrics,
    responses::{created, deleted, ComponentHealth, HealthResponse, VersionInfo},
};

/// Request and response header carrying the listing offset
pub static OFFSET_HEADER: HeaderName = HeaderName::from_static("offset");

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Service registry
    pub services: Arc<ServiceRegistry>,

    /// Token issuance and validation
    pub auth: AuthState,
}

impl AppState {
    /// Create new application state
    pub fn new(services: ServiceRegistry, auth: AuthState) -> Self {
        Self {
            services: Arc::new(services),
            auth,
        }
    }
}

fn parse_type(raw: &str) -> ApiResult<ArtifactType> {
    Ok(raw.parse::<ArtifactType>()?)
}

fn parse_target(raw_type: &str, raw_id: &str) -> ApiResult<(ArtifactType, ArtifactId)> {
    Ok((parse_type(raw_type)?, raw_id.parse::<ArtifactId>()?))
}

// ============================================================================
// Artifact Management Handlers
// ============================================================================

/// Register a new artifact
#[instrument(skip(state, payload))]
pub async fn create_artifact(
    State(state): State<AppState>,
    Path(artifact_type): Path<String>,
    payload: Result<Json<ArtifactSourceRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Artifact>)> {
    let artifact_type = parse_type(&artifact_type)?;
    let Json(request) = payload?;

    let artifact = state
        .services
        .catalogue()
        .create_artifact(artifact_type, request)
        .await?;

    info!(id = %artifact.id, name = %artifact.name, "Artifact registered");
    Ok(created(artifact))
}

/// Get artifact by type and ID
#[instrument(skip(state))]
pub async fn get_artifact(
    State(state): State<AppState>,
    Path((artifact_type, id)): Path<(String, String)>,
) -> ApiResult<Json<Artifact>> {
    let (artifact_type, id) = parse_target(&artifact_type, &id)?;
    let artifact = state.services.catalogue().get_artifact(artifact_type, &id).await?;
    Ok(Json(artifact))
}

/// Replace an artifact's source URL
#[instrument(skip(state, payload))]
pub async fn update_artifact(
    State(state): State<AppState>,
    Path((artifact_type, id)): Path<(String, String)>,
    payload: Result<Json<ArtifactSourceRequest>, JsonRejection>,
) -> ApiResult<Json<Artifact>> {
    let (artifact_type, id) = parse_target(&artifact_type, &id)?;
    let Json(request) = payload?;

    let artifact = state
        .services
        .catalogue()
        .update_artifact(artifact_type, &id, request)
        .await?;

    info!(id = %artifact.id, "Artifact updated");
    Ok(Json(artifact))
}

/// Delete artifact
#[instrument(skip(state))]
pub async fn delete_artifact(
    State(state): State<AppState>,
    Path((artifact_type, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let (artifact_type, id) = parse_target(&artifact_type, &id)?;
    state.services.catalogue().delete_artifact(artifact_type, &id).await?;

    info!(%id, "Artifact deleted");
    Ok(deleted())
}

/// List artifacts matching any of the posted queries
///
/// The page starts at the `offset` request header; the `offset` response
/// header names the next page when there is one.
#[instrument(skip(state, headers, payload))]
pub async fn list_artifacts(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<Vec<ArtifactQuery>>, JsonRejection>,
) -> ApiResult<(HeaderMap, Json<Vec<ArtifactMetadata>>)> {
    let Json(queries) = payload?;
    let offset = match headers.get(&OFFSET_HEADER) {
        None => 0,
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .ok_or_else(|| ApiError::bad_request("offset header must be a non-negative integer"))?,
    };

    let page = state.services.catalogue().list_artifacts(queries, offset).await?;
    debug!(returned = page.artifacts.len(), total = page.total, "Artifacts listed");

    let mut response_headers = HeaderMap::new();
    if let Some(next) = page.next_offset {
        response_headers.insert(OFFSET_HEADER.clone(), HeaderValue::from(next));
    }
    Ok((response_headers, Json(page.artifacts)))
}

/// Artifacts with an exact name
#[instrument(skip(state))]
pub async fn find_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<ArtifactMetadata>>> {
    let artifacts = state.services.catalogue().find_by_name(&name).await?;
    Ok(Json(artifacts))
}

/// Artifacts whose name matches a regular expression
#[instrument(skip(state, payload))]
pub async fn find_by_regex(
    State(state): State<AppState>,
    payload: Result<Json<RegexSearchRequest>, JsonRejection>,
) -> ApiResult<Json<Vec<ArtifactMetadata>>> {
    let Json(request) = payload?;
    let artifacts = state.services.catalogue().find_by_regex(request).await?;
    Ok(Json(artifacts))
}

// ============================================================================
// Assessment Handlers
// ============================================================================

/// Rate a model
#[instrument(skip(state))]
pub async fn rate_artifact(
    State(state): State<AppState>,
    Path((artifact_type, id)): Path<(String, String)>,
) -> ApiResult<Json<Rating>> {
    let (artifact_type, id) = parse_target(&artifact_type, &id)?;
    let rating = state.services.rating().rate(artifact_type, &id).await?;
    Ok(Json(rating))
}

/// Query parameters of the cost endpoint
#[derive(Debug, Default, Deserialize)]
pub struct CostParams {
    /// Include transitive dependencies
    #[serde(default)]
    pub dependency: bool,
}

/// Storage cost of an artifact
#[instrument(skip(state))]
pub async fn artifact_cost(
    State(state): State<AppState>,
    Path((artifact_type, id)): Path<(String, String)>,
    params: Result<Query<CostParams>, QueryRejection>,
) -> ApiResult<Json<CostReport>> {
    let (artifact_type, id) = parse_target(&artifact_type, &id)?;
    let Query(params) =
        params.map_err(|_| ApiError::bad_request("dependency must be true or false"))?;

    let report = state
        .services
        .cost()
        .cost(artifact_type, &id, params.dependency)
        .await?;
    Ok(Json(report))
}

/// Lineage graph of a model
#[instrument(skip(state))]
pub async fn artifact_lineage(
    State(state): State<AppState>,
    Path((artifact_type, id)): Path<(String, String)>,
) -> ApiResult<Json<LineageGraph>> {
    let (artifact_type, id) = parse_target(&artifact_type, &id)?;
    if artifact_type != ArtifactType::Model {
        return Err(ApiError::bad_request("Lineage is only available for models"));
    }

    let graph = state.services.lineage().lineage(artifact_type, &id).await?;
    Ok(Json(graph))
}

/// License compatibility of a model with a GitHub repository
#[instrument(skip(state, payload))]
pub async fn license_check(
    State(state): State<AppState>,
    Path((artifact_type, id)): Path<(String, String)>,
    payload: Result<Json<LicenseCheckRequest>, JsonRejection>,
) -> ApiResult<Json<LicenseCheckResult>> {
    let (artifact_type, id) = parse_target(&artifact_type, &id)?;
    let Json(request) = payload?;

    let result = state
        .services
        .license()
        .check(artifact_type, &id, request)
        .await?;
    Ok(Json(result))
}

// ============================================================================
// Administration Handlers
// ============================================================================

/// Clear every artifact and non-default user
#[instrument(skip(state))]
pub async fn reset_registry(State(state): State<AppState>) -> ApiResult<StatusCode> {
    let removed = state.services.reset().await?;
    info!(removed, "Registry reset by admin");
    Ok(StatusCode::OK)
}

// ============================================================================
// Health & Metrics Handlers
// ============================================================================

/// Liveness check
pub async fn health_check() -> HealthResponse {
    HealthResponse::healthy().with_version(env!("CARGO_PKG_VERSION"))
}

/// Health of the registry's components
#[instrument(skip(state))]
pub async fn component_health(State(state): State<AppState>) -> HealthResponse {
    let catalogue = state.services.catalogue();

    let store = match (catalogue.health_check().await, catalogue.count().await) {
        (Ok(()), Ok(count)) => ComponentHealth::healthy().with_metrics(BTreeMap::from([(
            "artifacts".to_string(),
            serde_json::json!(count),
        )])),
        (Err(e), _) | (_, Err(e)) => ComponentHealth::unhealthy(format!("Store error: {}", e)),
    };

    HealthResponse::healthy()
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_check("store", store)
        .with_check("service", ComponentHealth::healthy())
        .compute_status()
}

/// Metrics endpoint (Prometheus format)
pub async fn metrics() -> ApiResult<String> {
    render_metrics().map_err(ApiError::internal_server_error)
}

/// Get API version information
pub async fn version_info() -> Json<VersionInfo> {
    Json(VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        build_timestamp: option_env!("BUILD_TIMESTAMP")
            .unwrap_or("unknown")
            .to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target() {
        let id = ArtifactId::new();
        let (artifact_type, parsed) = parse_target("model", &id.to_string()).unwrap();
        assert_eq!(artifact_type, ArtifactType::Model);
        assert_eq!(parsed, id);

        assert_eq!(
            parse_target("weights", &id.to_string()).unwrap_err().status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            parse_target("model", "nope").unwrap_err().status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_cost_params_default() {
        let params: CostParams = serde_json::from_str("{}").unwrap();
        assert!(!params.dependency);
    }
}
