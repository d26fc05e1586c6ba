//! Metrics middleware for HTTP request tracking

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{Request, Response},
    middleware::Next,
};
use std::time::Instant;
use tracing::debug;

use crate::metrics::record_http_request;

/// Middleware for collecting HTTP request metrics
///
/// Requests are labelled by route template (`/artifacts/{artifact_type}/{id}`)
/// so that ids do not explode label cardinality.
pub async fn metrics_middleware(req: Request<Body>, next: Next) -> Response<Body> {
    let start = Instant::now();
    let method = req.method().to_string();

    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status().as_u16();
    record_http_request(&method, &path, status, duration.as_secs_f64());

    debug!(
        method = %method,
        path = %path,
        status = status,
        duration_ms = duration.as_millis() as u64,
        "http_request_completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::render_metrics;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    async fn test_handler() -> &'static str {
        "OK"
    }

    #[tokio::test]
    async fn test_metrics_middleware_records_route_template() {
        let app = Router::new()
            .route("/artifacts/{id}", get(test_handler))
            .route_layer(middleware::from_fn(metrics_middleware));

        let request = Request::builder()
            .uri("/artifacts/42")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let metrics = render_metrics().unwrap();
        assert!(metrics.contains("path=\"/artifacts/{id}\""));
    }
}
