//! Tower layers wrapped around the registry router
//!
//! Every request gets an `x-request-id` (generated here unless the caller
//! sent one) and an INFO span that records the method, path and latency.
//! Browser clients read the `offset` pagination cursor from
//! `/artifacts` responses, so CORS exposes it alongside the request id.

use axum::http::{header, HeaderName, HeaderValue, Method, Request};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestId, RequestId},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use tracing::Level;
use uuid::Uuid;

use crate::handlers::OFFSET_HEADER;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Assigns a v4 UUID to requests that arrive without `x-request-id`
#[derive(Clone, Default)]
pub struct UuidRequestIdGenerator;

impl MakeRequestId for UuidRequestIdGenerator {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

pub fn trace_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .latency_unit(LatencyUnit::Millis)
                .level(Level::INFO),
        )
}

/// Origins allowed to call the registry from a browser
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Empty admits every origin
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
    /// Preflight cache lifetime; `None` leaves it to the browser
    pub max_age_seconds: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allow_credentials: false,
            max_age_seconds: Some(3600),
        }
    }
}

impl CorsConfig {
    /// Origins that fail to parse as header values are skipped
    fn allow_origin(&self) -> AllowOrigin {
        if self.allowed_origins.is_empty() {
            return Any.into();
        }
        let origins: Vec<HeaderValue> = self
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        origins.into()
    }

    pub fn into_layer(self) -> CorsLayer {
        let layer = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any)
            .expose_headers([header::CONTENT_TYPE, OFFSET_HEADER.clone(), REQUEST_ID_HEADER])
            .allow_origin(self.allow_origin())
            .allow_credentials(self.allow_credentials);

        match self.max_age_seconds {
            Some(seconds) => layer.max_age(Duration::from_secs(seconds)),
            None => layer,
        }
    }
}

/// Which optional layers `build_api_server_with_config` installs
#[derive(Debug, Clone)]
pub struct MiddlewareConfig {
    pub cors: CorsConfig,
    /// gzip/br response bodies; large artifact listings benefit most
    pub enable_compression: bool,
    pub enable_tracing: bool,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            cors: CorsConfig::default(),
            enable_compression: true,
            enable_tracing: true,
        }
    }
}

impl MiddlewareConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cors(mut self, cors: CorsConfig) -> Self {
        self.cors = cors;
        self
    }

    pub fn with_compression(mut self, enable: bool) -> Self {
        self.enable_compression = enable;
        self
    }

    pub fn with_tracing(mut self, enable: bool) -> Self {
        self.enable_tracing = enable;
        self
    }
}
