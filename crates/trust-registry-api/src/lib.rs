//! Trust Registry API Layer
//!
//! This crate provides the REST API layer for the trust registry using Axum.
//! It includes request handlers, token authentication, middleware, error
//! handling, and response types.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for all API endpoints
//! - **Routes**: Route definitions and access rules
//! - **Auth**: Token issuance and the `X-Authorization` middleware
//! - **Middleware**: Tower middleware for tracing, CORS, compression and request ids
//! - **Error Handling**: Conversion of service errors to HTTP responses
//!
//! # Example
//!
//! ```rust,no_run
//! use trust_registry_api::{build_api_server, JwtConfig, JwtManager};
//! use trust_registry_service::ServiceRegistry;
//!
//! # async fn example(services: ServiceRegistry) {
//! let jwt = JwtManager::new(JwtConfig::new("a-long-random-secret")).unwrap();
//! let app = build_api_server(services, jwt);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//! axum::serve(listener, app).await.unwrap();
//! # }
//! ```

pub mod auth;
pub mod auth_handlers;
pub mod error;
pub mod handlers;
pub mod jwt;
pub mod metrics;
pub mod metrics_middleware;
pub mod middleware;
pub mod responses;
pub mod routes;

// Re-export main types for convenience
pub use auth::{require_admin, require_auth, AuthError, AuthState, AuthUser, X_AUTHORIZATION};
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use handlers::{AppState, CostParams, OFFSET_HEADER};
pub use jwt::{Claims, JwtConfig, JwtConfigError, JwtManager, TokenError};
pub use metrics::{init_metrics, render_metrics};
pub use middleware::{CorsConfig, MiddlewareConfig, UuidRequestIdGenerator};
pub use responses::{ComponentHealth, HealthResponse, HealthStatus, VersionInfo};
pub use routes::build_router;

use axum::Router;
use tower_http::{
    compression::CompressionLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
};
use trust_registry_service::ServiceRegistry;

/// Build a complete API server with default middleware
pub fn build_api_server(services: ServiceRegistry, jwt_manager: JwtManager) -> Router {
    build_api_server_with_config(services, jwt_manager, MiddlewareConfig::default())
}

/// Build API server with custom middleware configuration
///
/// # Example
///
/// ```rust,no_run
/// use trust_registry_api::{build_api_server_with_config, CorsConfig, JwtConfig, JwtManager, MiddlewareConfig};
/// use trust_registry_service::ServiceRegistry;
///
/// # fn example(services: ServiceRegistry) {
/// let middleware_config = MiddlewareConfig::new()
///     .with_cors(CorsConfig::default())
///     .with_compression(false);
///
/// let jwt = JwtManager::new(JwtConfig::new("a-long-random-secret")).unwrap();
/// let app = build_api_server_with_config(services, jwt, middleware_config);
/// # }
/// ```
pub fn build_api_server_with_config(
    services: ServiceRegistry,
    jwt_manager: JwtManager,
    middleware_config: MiddlewareConfig,
) -> Router {
    init_metrics();

    let directory = services.auth().clone();
    let state = AppState::new(services, AuthState::new(jwt_manager, directory));
    let mut router = build_router(state);

    router = router.layer(middleware_config.cors.into_layer());

    if middleware_config.enable_compression {
        router = router.layer(CompressionLayer::new());
    }

    if middleware_config.enable_tracing {
        router = router.layer(middleware::trace_layer());
    }

    // Request id is set outermost so the trace span and the response both carry it
    router
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(UuidRequestIdGenerator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use std::sync::Arc;
    use tower::ServiceExt;
    use trust_registry_db::InMemoryArtifactRepository;
    use trust_registry_service::{ServiceConfig, StaticSourceResolver};

    fn server() -> Router {
        let services = ServiceRegistry::new(
            Arc::new(InMemoryArtifactRepository::new()),
            Arc::new(StaticSourceResolver::new()),
            ServiceConfig::default(),
        );
        build_api_server(services, JwtManager::new(JwtConfig::new("lib-test-secret")).unwrap())
    }

    #[tokio::test]
    async fn test_responses_carry_request_id() {
        let response = server()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let request_id = response.headers().get("x-request-id").unwrap();
        assert!(uuid::Uuid::parse_str(request_id.to_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let response = server()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("x-request-id", "caller-chosen")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers().get("x-request-id").unwrap(), "caller-chosen");
    }
}
