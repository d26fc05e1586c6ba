//! API route definitions
//!
//! This module defines all API routes and builds the router.

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{
    auth::{require_admin, require_auth},
    auth_handlers::{authenticate, register_user},
    handlers::{
        artifact_cost, artifact_lineage, component_health, create_artifact, delete_artifact,
        find_by_name, find_by_regex, get_artifact, health_check, license_check, list_artifacts,
        metrics, rate_artifact, reset_registry, update_artifact, version_info, AppState,
    },
    metrics_middleware::metrics_middleware,
};

/// Build the API router with all routes
///
/// Reads are public. Creating, updating and deleting artifacts needs a
/// valid token; resetting the registry and adding users needs an admin.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/health/components", get(component_health))
        .route("/metrics", get(metrics))
        .route("/version", get(version_info))
        .route("/authenticate", put(authenticate))
        .route("/artifacts", post(list_artifacts))
        .route("/artifacts/{artifact_type}/{id}", get(get_artifact))
        .route("/artifact/byName/{name}", get(find_by_name))
        .route("/artifact/byRegEx", post(find_by_regex))
        .route("/artifact/{artifact_type}/{id}/rate", get(rate_artifact))
        .route("/artifact/{artifact_type}/{id}/cost", get(artifact_cost))
        .route("/artifact/{artifact_type}/{id}/lineage", get(artifact_lineage))
        .route("/artifact/{artifact_type}/{id}/license-check", post(license_check));

    let authenticated_routes = Router::new()
        .route("/artifact/{artifact_type}", post(create_artifact))
        .route(
            "/artifacts/{artifact_type}/{id}",
            put(update_artifact).delete(delete_artifact),
        )
        .route_layer(middleware::from_fn_with_state(state.auth.clone(), require_auth));

    let admin_routes = Router::new()
        .route("/reset", axum::routing::delete(reset_registry))
        .route("/users", post(register_user))
        .route_layer(middleware::from_fn_with_state(state.auth.clone(), require_admin));

    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .merge(admin_routes)
        .route_layer(middleware::from_fn(metrics_middleware))
        .with_state(state)
}
