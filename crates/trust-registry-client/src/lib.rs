//! Trust Registry Client
//!
//! Async client for the trust registry HTTP API. Every endpoint has a typed
//! method, and server errors come back as distinct [`ClientError`] variants.
//!
//! ```rust,no_run
//! use trust_registry_client::RegistryClient;
//! use trust_registry_core::ArtifactType;
//!
//! # async fn example() -> Result<(), trust_registry_client::ClientError> {
//! let mut client = RegistryClient::new("http://localhost:3000")?;
//! client.login("admin", "change-me", true).await?;
//!
//! let model = client
//!     .create_artifact(ArtifactType::Model, "https://huggingface.co/openai-community/gpt2")
//!     .await?;
//! let rating = client.rate(ArtifactType::Model, &model.id).await?;
//! println!("net score {}", rating.net_score);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;

pub use client::{ArtifactListing, ClientConfig, RegistryClient, ServiceHealth};
pub use error::{ClientError, ClientResult};
