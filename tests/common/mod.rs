//! Common test utilities and helpers
//!
//! Spawns the full API stack on a random local port, backed by the
//! in-memory store and a static source table, and hands out typed clients.

#![allow(dead_code)]

use std::sync::Arc;
use tokio::net::TcpListener;
use trust_registry_api::{build_api_server, JwtConfig, JwtManager};
use trust_registry_client::RegistryClient;
use trust_registry_core::{DeclaredLink, LinkOrigin, Relationship};
use trust_registry_db::InMemoryArtifactRepository;
use trust_registry_service::{
    Contribution, ServiceConfig, ServiceRegistry, SourceProfile, StaticSourceResolver,
    UserDirectoryConfig,
};

pub const ADMIN_NAME: &str = "ece30861defaultadminuser";
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";

pub const GPT2_URL: &str = "https://huggingface.co/openai-community/gpt2";
pub const REQUESTS_URL: &str = "https://github.com/psf/requests";

const MIB: u64 = 1024 * 1024;

/// Running test server
pub struct TestApp {
    pub address: String,
}

impl TestApp {
    /// Start a server resolving sources from `resolver`
    pub async fn spawn(resolver: StaticSourceResolver) -> Self {
        let services = ServiceRegistry::new(
            Arc::new(InMemoryArtifactRepository::new()),
            Arc::new(resolver),
            ServiceConfig {
                users: UserDirectoryConfig {
                    default_admin_name: ADMIN_NAME.to_string(),
                    default_admin_password: ADMIN_PASSWORD.to_string(),
                },
                ..Default::default()
            },
        );

        let jwt_config = JwtConfig::new("test-secret-key-for-integration-tests").with_lifetime(3600);
        let jwt_manager = JwtManager::new(jwt_config).expect("Failed to create JWT manager");
        let app = build_api_server(services, jwt_manager);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let address = listener.local_addr().expect("Failed to get local address");

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Failed to start test server");
        });

        Self {
            address: format!("http://{}", address),
        }
    }

    /// Start a server knowing the standard fixture sources
    pub async fn spawn_default() -> Self {
        Self::spawn(fixture_resolver()).await
    }

    /// Client without a token
    pub fn anonymous(&self) -> RegistryClient {
        RegistryClient::new(&self.address).expect("Failed to build client")
    }

    /// Client logged in as the default administrator
    pub async fn admin(&self) -> RegistryClient {
        let mut client = self.anonymous();
        client
            .login(ADMIN_NAME, ADMIN_PASSWORD, true)
            .await
            .expect("Failed to log in as admin");
        client
    }
}

/// A profile resembling `openai-community/gpt2`
pub fn gpt2_profile() -> SourceProfile {
    SourceProfile {
        license: Some("mit".to_string()),
        size_bytes: Some(548_105_171),
        downloads: Some(10_000_000),
        likes: Some(2_000),
        last_modified: Some(chrono::Utc::now() - chrono::Duration::days(30)),
        readme: Some(
            "# GPT-2\n\n## How to use\n\n```python\nfrom transformers import pipeline\n```".to_string(),
        ),
        files: vec!["config.json".to_string(), "model.safetensors".to_string()],
        has_structured_evaluation: false,
        contributions: vec![
            Contribution {
                author: "thomwolf".to_string(),
                commits: 12,
            },
            Contribution {
                author: "julien-c".to_string(),
                commits: 9,
            },
        ],
        links: Vec::new(),
        merged_pull_requests: None,
    }
}

pub fn sized(license: &str, size_mib: u64) -> SourceProfile {
    SourceProfile {
        license: Some(license.to_string()),
        size_bytes: Some(size_mib * MIB),
        ..Default::default()
    }
}

pub fn linked(mut profile: SourceProfile, links: Vec<DeclaredLink>) -> SourceProfile {
    profile.links = links;
    profile
}

pub fn base_model(reference: &str) -> DeclaredLink {
    DeclaredLink::new(reference, Relationship::BaseModel, LinkOrigin::CardData)
}

pub fn training_dataset(reference: &str) -> DeclaredLink {
    DeclaredLink::new(reference, Relationship::TrainingDataset, LinkOrigin::CardData)
}

pub fn code_repository(reference: &str) -> DeclaredLink {
    DeclaredLink::new(reference, Relationship::CodeRepository, LinkOrigin::ModelCard)
}

/// Sources shared by most scenarios
pub fn fixture_resolver() -> StaticSourceResolver {
    StaticSourceResolver::new()
        .with_profile(GPT2_URL, gpt2_profile())
        .with_profile(REQUESTS_URL, sized("Apache-2.0", 10))
        .with_profile("https://github.com/gnu/gpl-tool", sized("GPL-3.0", 1))
        .with_profile("https://github.com/acme/unlicensed", SourceProfile::default())
        .with_unreachable("https://github.com/acme/offline")
}
