//! Registry HTTP client

use reqwest::{header::HeaderMap, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};
use trust_registry_core::{
    Artifact, ArtifactId, ArtifactMetadata, ArtifactQuery, ArtifactType, CostReport,
    LicenseCheckResult, LineageGraph, Rating,
};
use trust_registry_service::{
    ArtifactSourceRequest, AuthenticateRequest, AuthenticatedUser, LicenseCheckRequest,
    RegexSearchRequest, RegisterUserRequest,
};

use crate::error::{ClientError, ClientResult};

const AUTH_HEADER: &str = "X-Authorization";
const OFFSET_HEADER: &str = "offset";

/// One page of an artifact listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactListing {
    pub artifacts: Vec<ArtifactMetadata>,

    /// Offset of the next page, when the listing continues
    pub next_offset: Option<usize>,
}

/// Liveness report of the service
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceHealth {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the registry, e.g. `http://localhost:3000`
    pub base_url: String,

    /// Per-request timeout
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Typed client for every registry endpoint
///
/// Operations that need a token use the one set with [`RegistryClient::with_token`]
/// or obtained through [`RegistryClient::login`].
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl RegistryClient {
    /// Create a client with default settings
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        Self::with_config(ClientConfig::new(base_url))
    }

    pub fn with_config(config: ClientConfig) -> ClientResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Use `token` for authenticated requests
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Token currently attached to requests
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn artifact_path(artifact_type: ArtifactType, id: &ArtifactId, suffix: &str) -> String {
        format!("/artifact/{}/{}{}", artifact_type, id, suffix)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header(AUTH_HEADER, token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> ClientResult<Response> {
        let response = self.authorized(request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(%status, "Registry returned an error");
        Err(ClientError::from_status(status, &body))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    // ========================================================================
    // Authentication
    // ========================================================================

    /// Exchange credentials for a token (`"bearer <jwt>"`)
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, name: &str, password: &str, is_admin: bool) -> ClientResult<String> {
        let request = AuthenticateRequest::new(name, password, is_admin);
        self.send_json(self.http.put(self.url("/authenticate")).json(&request))
            .await
    }

    /// Authenticate and keep the token for later requests
    pub async fn login(&mut self, name: &str, password: &str, is_admin: bool) -> ClientResult<()> {
        let token = self.authenticate(name, password, is_admin).await?;
        self.token = Some(token);
        Ok(())
    }

    /// Add a user (admin token required)
    #[instrument(skip(self, password))]
    pub async fn register_user(&self, name: &str, password: &str, is_admin: bool) -> ClientResult<AuthenticatedUser> {
        let request = RegisterUserRequest::new(name, password, is_admin);
        self.send_json(self.http.post(self.url("/users")).json(&request))
            .await
    }

    // ========================================================================
    // Catalogue
    // ========================================================================

    #[instrument(skip(self))]
    pub async fn create_artifact(&self, artifact_type: ArtifactType, url: &str) -> ClientResult<Artifact> {
        let path = format!("/artifact/{}", artifact_type);
        self.send_json(self.http.post(self.url(&path)).json(&ArtifactSourceRequest::new(url)))
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_artifact(&self, artifact_type: ArtifactType, id: &ArtifactId) -> ClientResult<Artifact> {
        let path = format!("/artifacts/{}/{}", artifact_type, id);
        self.send_json(self.http.get(self.url(&path))).await
    }

    #[instrument(skip(self))]
    pub async fn update_artifact(
        &self,
        artifact_type: ArtifactType,
        id: &ArtifactId,
        url: &str,
    ) -> ClientResult<Artifact> {
        let path = format!("/artifacts/{}/{}", artifact_type, id);
        self.send_json(self.http.put(self.url(&path)).json(&ArtifactSourceRequest::new(url)))
            .await
    }

    #[instrument(skip(self))]
    pub async fn delete_artifact(&self, artifact_type: ArtifactType, id: &ArtifactId) -> ClientResult<()> {
        let path = format!("/artifacts/{}/{}", artifact_type, id);
        self.send(self.http.delete(self.url(&path))).await?;
        Ok(())
    }

    /// One page of artifacts matching any of `queries`
    #[instrument(skip(self, queries), fields(queries = queries.len()))]
    pub async fn list_artifacts(
        &self,
        queries: &[ArtifactQuery],
        offset: Option<usize>,
    ) -> ClientResult<ArtifactListing> {
        let mut request = self.http.post(self.url("/artifacts")).json(queries);
        if let Some(offset) = offset {
            request = request.header(OFFSET_HEADER, offset.to_string());
        }

        let response = self.send(request).await?;
        let next_offset = next_offset(response.headers())?;
        let artifacts = response
            .json::<Vec<ArtifactMetadata>>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        Ok(ArtifactListing {
            artifacts,
            next_offset,
        })
    }

    #[instrument(skip(self))]
    pub async fn find_by_name(&self, name: &str) -> ClientResult<Vec<ArtifactMetadata>> {
        let mut url = reqwest::Url::parse(&self.url("/artifact/byName/"))
            .map_err(|e| ClientError::Decode(format!("invalid base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Decode("base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .push(name);
        self.send_json(self.http.get(url)).await
    }

    #[instrument(skip(self))]
    pub async fn find_by_regex(&self, regex: &str) -> ClientResult<Vec<ArtifactMetadata>> {
        let request = RegexSearchRequest {
            regex: regex.to_string(),
        };
        self.send_json(self.http.post(self.url("/artifact/byRegEx")).json(&request))
            .await
    }

    // ========================================================================
    // Assessment
    // ========================================================================

    #[instrument(skip(self))]
    pub async fn rate(&self, artifact_type: ArtifactType, id: &ArtifactId) -> ClientResult<Rating> {
        let path = Self::artifact_path(artifact_type, id, "/rate");
        self.send_json(self.http.get(self.url(&path))).await
    }

    /// Storage cost, optionally including transitive dependencies
    #[instrument(skip(self))]
    pub async fn cost(
        &self,
        artifact_type: ArtifactType,
        id: &ArtifactId,
        include_dependencies: bool,
    ) -> ClientResult<CostReport> {
        let path = Self::artifact_path(artifact_type, id, "/cost");
        let request = self
            .http
            .get(self.url(&path))
            .query(&[("dependency", include_dependencies)]);
        self.send_json(request).await
    }

    #[instrument(skip(self))]
    pub async fn lineage(&self, artifact_type: ArtifactType, id: &ArtifactId) -> ClientResult<LineageGraph> {
        let path = Self::artifact_path(artifact_type, id, "/lineage");
        self.send_json(self.http.get(self.url(&path))).await
    }

    /// Whether the artifact's license allows use with a GitHub repository
    #[instrument(skip(self))]
    pub async fn license_check(
        &self,
        artifact_type: ArtifactType,
        id: &ArtifactId,
        github_url: &str,
    ) -> ClientResult<bool> {
        let path = Self::artifact_path(artifact_type, id, "/license-check");
        let request = LicenseCheckRequest {
            github_url: github_url.to_string(),
        };
        let result: LicenseCheckResult = self
            .send_json(self.http.post(self.url(&path)).json(&request))
            .await?;
        Ok(result.compatible)
    }

    // ========================================================================
    // Administration
    // ========================================================================

    /// Clear the registry (admin token required)
    #[instrument(skip(self))]
    pub async fn reset(&self) -> ClientResult<()> {
        self.send(self.http.delete(self.url("/reset"))).await?;
        Ok(())
    }

    pub async fn health(&self) -> ClientResult<ServiceHealth> {
        self.send_json(self.http.get(self.url("/health"))).await
    }
}

fn next_offset(headers: &HeaderMap) -> ClientResult<Option<usize>> {
    headers
        .get(OFFSET_HEADER)
        .map(|value| {
            value
                .to_str()
                .ok()
                .and_then(|v| v.trim().parse::<usize>().ok())
                .ok_or_else(|| ClientError::Decode("offset header is not a number".to_string()))
        })
        .transpose()
}
