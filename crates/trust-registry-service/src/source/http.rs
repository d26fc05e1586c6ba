//! HTTP resolver for the HuggingFace hub and the GitHub REST API

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{header, Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, instrument};
use trust_registry_core::{DeclaredLink, LinkOrigin, Relationship, SourceLocator};

use super::{Contribution, SourceError, SourceProfile, SourceResolver, SourceResult};

static GITHUB_REPOSITORY_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://(?:www\.)?github\.com/[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+")
        .expect("Failed to compile GitHub URL pattern")
});

/// Upstream endpoints and credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// HuggingFace hub base URL
    pub hugging_face_url: String,

    /// GitHub REST API base URL
    pub github_api_url: String,

    /// Optional HuggingFace access token
    pub hugging_face_token: Option<String>,

    /// Optional GitHub token, raises the API rate limit
    pub github_token: Option<String>,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            hugging_face_url: "https://huggingface.co".to_string(),
            github_api_url: "https://api.github.com".to_string(),
            hugging_face_token: None,
            github_token: None,
            request_timeout_secs: 10,
            user_agent: concat!("trust-registry/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum HubKind {
    Model,
    Dataset,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HubRepoInfo {
    #[serde(default)]
    card_data: Option<Value>,
    #[serde(default)]
    siblings: Vec<HubSibling>,
    #[serde(default)]
    downloads: Option<u64>,
    #[serde(default)]
    likes: Option<u64>,
    #[serde(default)]
    last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default, rename = "model-index")]
    model_index: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct HubSibling {
    rfilename: String,
    #[serde(default)]
    size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct HubCommit {
    #[serde(default)]
    authors: Vec<HubAuthor>,
}

#[derive(Debug, Deserialize)]
struct HubAuthor {
    #[serde(default)]
    user: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HubModelConfig {
    #[serde(default, rename = "_name_or_path")]
    name_or_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubRepo {
    #[serde(default)]
    license: Option<GitHubLicense>,
    /// Repository size in kilobytes
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    stargazers_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GitHubLicense {
    #[serde(default)]
    spdx_id: Option<String>,
    #[serde(default)]
    key: Option<String>,
}

impl GitHubLicense {
    fn identifier(self) -> Option<String> {
        match self.spdx_id {
            Some(id) if !id.eq_ignore_ascii_case("noassertion") => Some(id),
            _ => self.key,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GitHubSearch {
    total_count: u64,
}

#[derive(Debug, Deserialize)]
struct GitHubContributor {
    #[serde(default)]
    login: Option<String>,
    contributions: u64,
}

/// [`SourceResolver`] talking to the public HuggingFace and GitHub APIs
pub struct HttpSourceResolver {
    client: Client,
    config: UpstreamConfig,
}

impl HttpSourceResolver {
    pub fn new(config: UpstreamConfig) -> SourceResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| SourceError::Unreachable(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn hub_request(&self, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.config.hugging_face_url.trim_end_matches('/'), path);
        let request = self.client.get(url);
        match &self.config.hugging_face_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn github_request(&self, path: &str, accept: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.config.github_api_url.trim_end_matches('/'), path);
        let request = self.client.get(url).header(header::ACCEPT, accept);
        match &self.config.github_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> SourceResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Unreachable(format!("{}: {}", what, e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(SourceError::NotFound(what.to_string())),
            status if !status.is_success() => Err(SourceError::Unreachable(format!(
                "{} returned {}",
                what, status
            ))),
            _ => response
                .json::<T>()
                .await
                .map_err(|e| SourceError::Malformed(format!("{}: {}", what, e))),
        }
    }

    /// Fetch an optional document; absence is not an error
    async fn get_text(&self, request: RequestBuilder, what: &str) -> Option<String> {
        let response = match request.send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!(what, status = %response.status(), "Optional document unavailable");
                return None;
            }
            Err(e) => {
                debug!(what, error = %e, "Optional document unavailable");
                return None;
            }
        };
        response.text().await.ok()
    }

    async fn hub_info(&self, kind: HubKind, repo_id: &str) -> SourceResult<HubRepoInfo> {
        let api_path = hub_api_path(kind, repo_id);
        self.get_json(self.hub_request(&format!("{}?blobs=true", api_path)), &api_path)
            .await
    }

    #[instrument(skip(self))]
    async fn resolve_hub(&self, kind: HubKind, repo_id: &str) -> SourceResult<SourceProfile> {
        let api_path = hub_api_path(kind, repo_id);
        let raw_prefix = match kind {
            HubKind::Model => repo_id.to_string(),
            HubKind::Dataset => format!("datasets/{}", repo_id),
        };

        let commits_path = format!("{}/commits/main", api_path);
        let readme_path = format!("{}/raw/main/README.md", raw_prefix);
        let (info, readme, commits) = tokio::join!(
            self.hub_info(kind, repo_id),
            self.get_text(self.hub_request(&readme_path), &readme_path),
            self.get_json::<Vec<HubCommit>>(self.hub_request(&commits_path), &commits_path),
        );
        let info = info?;

        let commits = commits.unwrap_or_else(|e| {
            debug!(error = %e, "Commit history unavailable");
            Vec::new()
        });

        let config_base_model = match kind {
            HubKind::Model => {
                let config_path = format!("{}/raw/main/config.json", repo_id);
                self.get_json::<HubModelConfig>(self.hub_request(&config_path), &config_path)
                    .await
                    .ok()
                    .and_then(|config| config.name_or_path)
            }
            HubKind::Dataset => None,
        };

        let card = info.card_data.as_ref();
        let files: Vec<String> = info.siblings.iter().map(|s| s.rfilename.clone()).collect();
        let size_bytes: Option<u64> = info
            .siblings
            .iter()
            .any(|s| s.size.is_some())
            .then(|| info.siblings.iter().filter_map(|s| s.size).sum());

        let has_structured_evaluation = info.model_index.is_some()
            || card.is_some_and(|c| c.get("model-index").is_some() || c.get("eval_results").is_some())
            || files.iter().any(|f| f.contains("eval_results"));

        let mut links = Vec::new();
        if let Some(card) = card {
            if matches!(kind, HubKind::Model) {
                for base in card.get("base_model").map(string_values).unwrap_or_default() {
                    push_link(&mut links, base, Relationship::BaseModel, LinkOrigin::CardData);
                }
            }
            for dataset in card.get("datasets").map(string_values).unwrap_or_default() {
                push_link(&mut links, dataset, Relationship::TrainingDataset, LinkOrigin::CardData);
            }
        }
        if let Some(base) = config_base_model.filter(|b| is_hub_reference(b, repo_id)) {
            push_link(&mut links, base, Relationship::BaseModel, LinkOrigin::ModelConfig);
        }
        if let Some(code) = readme.as_deref().and_then(first_github_url) {
            push_link(&mut links, code, Relationship::CodeRepository, LinkOrigin::ModelCard);
        }

        Ok(SourceProfile {
            license: hub_license(card, &info.tags),
            size_bytes,
            downloads: info.downloads,
            likes: info.likes,
            last_modified: info.last_modified,
            readme,
            files,
            has_structured_evaluation,
            contributions: hub_contributions(&commits),
            links,
            merged_pull_requests: None,
        })
    }

    #[instrument(skip(self))]
    async fn resolve_github(&self, owner: &str, repo: &str) -> SourceResult<SourceProfile> {
        let repo_path = format!("repos/{}/{}", owner, repo);
        let contributors_path = format!("{}/contributors?per_page=100", repo_path);
        let readme_path = format!("{}/readme", repo_path);
        let merged_path = format!("search/issues?q=repo:{}/{}+is:pr+is:merged&per_page=1", owner, repo);

        let (info, contributors, readme, merged) = tokio::join!(
            self.get_json::<GitHubRepo>(
                self.github_request(&repo_path, "application/vnd.github+json"),
                &repo_path
            ),
            self.get_json::<Vec<GitHubContributor>>(
                self.github_request(&contributors_path, "application/vnd.github+json"),
                &contributors_path
            ),
            self.get_text(
                self.github_request(&readme_path, "application/vnd.github.raw"),
                &readme_path
            ),
            self.get_json::<GitHubSearch>(
                self.github_request(&merged_path, "application/vnd.github+json"),
                &merged_path
            ),
        );
        let info = info?;

        let merged_pull_requests = match merged {
            Ok(search) => Some(search.total_count),
            Err(e) => {
                debug!(error = %e, "Merged pull request count unavailable");
                None
            }
        };

        let contributions = contributors
            .unwrap_or_else(|e| {
                debug!(error = %e, "Contributor list unavailable");
                Vec::new()
            })
            .into_iter()
            .filter_map(|c| {
                c.login.map(|author| Contribution {
                    author,
                    commits: c.contributions,
                })
            })
            .collect();

        Ok(SourceProfile {
            license: info.license.and_then(GitHubLicense::identifier),
            size_bytes: info.size.map(|kb| kb * 1024),
            downloads: None,
            likes: info.stargazers_count,
            last_modified: info.pushed_at,
            readme,
            files: Vec::new(),
            has_structured_evaluation: false,
            contributions,
            links: Vec::new(),
            merged_pull_requests,
        })
    }
}

#[async_trait]
impl SourceResolver for HttpSourceResolver {
    async fn resolve(&self, locator: &SourceLocator) -> SourceResult<SourceProfile> {
        match locator {
            SourceLocator::HuggingFaceModel { repo_id } => self.resolve_hub(HubKind::Model, repo_id).await,
            SourceLocator::HuggingFaceDataset { repo_id } => {
                self.resolve_hub(HubKind::Dataset, repo_id).await
            }
            SourceLocator::GitHub { owner, repo } => self.resolve_github(owner, repo).await,
        }
    }

    #[instrument(skip(self))]
    async fn repository_license(&self, locator: &SourceLocator) -> SourceResult<Option<String>> {
        match locator {
            SourceLocator::GitHub { owner, repo } => {
                let repo_path = format!("repos/{}/{}", owner, repo);
                let info: GitHubRepo = self
                    .get_json(
                        self.github_request(&repo_path, "application/vnd.github+json"),
                        &repo_path,
                    )
                    .await?;
                Ok(info.license.and_then(GitHubLicense::identifier))
            }
            SourceLocator::HuggingFaceModel { repo_id } => {
                let info = self.hub_info(HubKind::Model, repo_id).await?;
                Ok(hub_license(info.card_data.as_ref(), &info.tags))
            }
            SourceLocator::HuggingFaceDataset { repo_id } => {
                let info = self.hub_info(HubKind::Dataset, repo_id).await?;
                Ok(hub_license(info.card_data.as_ref(), &info.tags))
            }
        }
    }
}

fn hub_api_path(kind: HubKind, repo_id: &str) -> String {
    match kind {
        HubKind::Model => format!("api/models/{}", repo_id),
        HubKind::Dataset => format!("api/datasets/{}", repo_id),
    }
}

/// Card data fields hold either a single string or a list of strings
fn string_values(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn hub_license(card: Option<&Value>, tags: &[String]) -> Option<String> {
    card.and_then(|c| c.get("license"))
        .and_then(|license| string_values(license).into_iter().next())
        .or_else(|| {
            tags.iter()
                .find_map(|tag| tag.strip_prefix("license:").map(str::to_string))
        })
}

fn hub_contributions(commits: &[HubCommit]) -> Vec<Contribution> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for author in commits.iter().flat_map(|c| c.authors.iter()) {
        if let Some(user) = author.user.as_deref() {
            *counts.entry(user).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .map(|(author, commits)| Contribution {
            author: author.to_string(),
            commits,
        })
        .collect()
}

/// `_name_or_path` is often a local checkpoint directory or the repo itself
fn is_hub_reference(candidate: &str, repo_id: &str) -> bool {
    let candidate = candidate.trim();
    !candidate.is_empty()
        && candidate.contains('/')
        && !candidate.starts_with(['/', '.', '~'])
        && !candidate.eq_ignore_ascii_case(repo_id)
}

fn first_github_url(text: &str) -> Option<String> {
    GITHUB_REPOSITORY_URL
        .find(text)
        .map(|m| m.as_str().trim_end_matches(['.', ')']).to_string())
}

fn push_link(links: &mut Vec<DeclaredLink>, target: String, relationship: Relationship, origin: LinkOrigin) {
    if links
        .iter()
        .any(|l| l.relationship == relationship && l.source_url.eq_ignore_ascii_case(&target))
    {
        return;
    }
    links.push(DeclaredLink::new(target, relationship, origin));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header as header_matcher, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver_for(server: &MockServer) -> HttpSourceResolver {
        HttpSourceResolver::new(UpstreamConfig {
            hugging_face_url: server.uri(),
            github_api_url: server.uri(),
            github_token: Some("gh-token".to_string()),
            request_timeout_secs: 5,
            ..Default::default()
        })
        .unwrap()
    }

    async fn mount_json(server: &MockServer, at: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_resolve_hugging_face_model() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "/api/models/acme/tiny-llm",
            json!({
                "id": "acme/tiny-llm",
                "downloads": 12345,
                "likes": 7,
                "lastModified": "2024-05-01T12:00:00.000Z",
                "tags": ["license:mit"],
                "cardData": {
                    "license": "apache-2.0",
                    "base_model": "acme/base-llm",
                    "datasets": ["acme/corpus", "acme/extra"],
                    "model-index": [{"name": "tiny-llm"}]
                },
                "siblings": [
                    {"rfilename": "config.json", "size": 1024},
                    {"rfilename": "model.safetensors", "size": 4096},
                    {"rfilename": "train.py"}
                ]
            }),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/acme/tiny-llm/raw/main/README.md"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "# Tiny\nTraining code: https://github.com/acme/tiny-train.\n",
            ))
            .mount(&server)
            .await;
        mount_json(
            &server,
            "/api/models/acme/tiny-llm/commits/main",
            json!([
                {"authors": [{"user": "alice"}]},
                {"authors": [{"user": "alice"}, {"user": "bob"}]},
                {"authors": [{"user": "carol"}]}
            ]),
        )
        .await;
        mount_json(
            &server,
            "/acme/tiny-llm/raw/main/config.json",
            json!({"_name_or_path": "acme/base-llm"}),
        )
        .await;

        let resolver = resolver_for(&server);
        let locator = SourceLocator::parse("https://huggingface.co/acme/tiny-llm").unwrap();
        let profile = resolver.resolve(&locator).await.unwrap();

        assert_eq!(profile.license.as_deref(), Some("apache-2.0"));
        assert_eq!(profile.size_bytes, Some(5120));
        assert_eq!(profile.downloads, Some(12345));
        assert!(profile.has_structured_evaluation);
        assert_eq!(profile.files.len(), 3);
        assert!(profile.readme.unwrap().contains("Tiny"));

        let alice = profile.contributions.iter().find(|c| c.author == "alice").unwrap();
        assert_eq!(alice.commits, 2);
        assert_eq!(profile.contributions.len(), 3);

        // base_model from card data and config.json collapse into one link
        let relationships: Vec<_> = profile.links.iter().map(|l| (l.relationship, l.source_url.as_str())).collect();
        assert_eq!(
            relationships,
            vec![
                (Relationship::BaseModel, "acme/base-llm"),
                (Relationship::TrainingDataset, "acme/corpus"),
                (Relationship::TrainingDataset, "acme/extra"),
                (Relationship::CodeRepository, "https://github.com/acme/tiny-train"),
            ]
        );
    }

    #[tokio::test]
    async fn test_resolve_dataset_without_optional_documents() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "/api/datasets/acme/corpus",
            json!({
                "tags": ["license:cc-by-4.0"],
                "siblings": [{"rfilename": "data.parquet", "size": 2048}]
            }),
        )
        .await;

        let resolver = resolver_for(&server);
        let locator = SourceLocator::parse("https://huggingface.co/datasets/acme/corpus").unwrap();
        let profile = resolver.resolve(&locator).await.unwrap();

        assert_eq!(profile.license.as_deref(), Some("cc-by-4.0"));
        assert_eq!(profile.size_bytes, Some(2048));
        assert!(profile.readme.is_none());
        assert!(profile.contributions.is_empty());
        assert!(profile.links.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_github_repository() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/psf/requests"))
            .and(header_matcher("authorization", "Bearer gh-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "license": {"key": "apache-2.0", "spdx_id": "Apache-2.0"},
                "size": 10,
                "pushed_at": "2024-06-01T00:00:00Z",
                "stargazers_count": 50000
            })))
            .mount(&server)
            .await;
        mount_json(
            &server,
            "/repos/psf/requests/contributors",
            json!([
                {"login": "kennethreitz", "contributions": 120},
                {"login": "sigmavirus24", "contributions": 80}
            ]),
        )
        .await;
        mount_json(&server, "/search/issues", json!({"total_count": 150, "items": []})).await;

        let resolver = resolver_for(&server);
        let locator = SourceLocator::parse("https://github.com/psf/requests").unwrap();
        let profile = resolver.resolve(&locator).await.unwrap();

        assert_eq!(profile.license.as_deref(), Some("Apache-2.0"));
        assert_eq!(profile.size_bytes, Some(10 * 1024));
        assert_eq!(profile.contributions.len(), 2);
        assert_eq!(profile.merged_pull_requests, Some(150));

        let license = resolver.repository_license(&locator).await.unwrap();
        assert_eq!(license.as_deref(), Some("Apache-2.0"));
    }

    #[tokio::test]
    async fn test_merged_pull_request_count_is_optional() {
        let server = MockServer::start().await;
        mount_json(&server, "/repos/acme/tool", json!({"size": 1})).await;
        Mock::given(method("GET"))
            .and(path("/search/issues"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let resolver = resolver_for(&server);
        let locator = SourceLocator::parse("https://github.com/acme/tool").unwrap();
        let profile = resolver.resolve(&locator).await.unwrap();
        assert_eq!(profile.merged_pull_requests, None);
    }

    #[tokio::test]
    async fn test_github_license_without_spdx_falls_back_to_key() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "/repos/acme/tool",
            json!({"license": {"key": "other", "spdx_id": "NOASSERTION"}}),
        )
        .await;

        let resolver = resolver_for(&server);
        let locator = SourceLocator::parse("https://github.com/acme/tool").unwrap();
        let license = resolver.repository_license(&locator).await.unwrap();
        assert_eq!(license.as_deref(), Some("other"));
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/garbled"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let resolver = resolver_for(&server);

        let missing = SourceLocator::parse("https://github.com/acme/missing").unwrap();
        assert!(matches!(
            resolver.repository_license(&missing).await,
            Err(SourceError::NotFound(_))
        ));

        let broken = SourceLocator::parse("https://github.com/acme/broken").unwrap();
        assert!(matches!(
            resolver.repository_license(&broken).await,
            Err(SourceError::Unreachable(_))
        ));

        let garbled = SourceLocator::parse("https://github.com/acme/garbled").unwrap();
        assert!(matches!(
            resolver.repository_license(&garbled).await,
            Err(SourceError::Malformed(_))
        ));
    }

    #[test]
    fn test_is_hub_reference() {
        assert!(is_hub_reference("openai-community/gpt2", "acme/tiny"));
        assert!(!is_hub_reference("./checkpoints/final", "acme/tiny"));
        assert!(!is_hub_reference("/data/run-3", "acme/tiny"));
        assert!(!is_hub_reference("gpt2", "acme/tiny"));
        assert!(!is_hub_reference("Acme/Tiny", "acme/tiny"));
    }

    #[test]
    fn test_first_github_url() {
        assert_eq!(
            first_github_url("see [code](https://github.com/acme/repo) for details").as_deref(),
            Some("https://github.com/acme/repo")
        );
        assert!(first_github_url("no links here").is_none());
    }
}
