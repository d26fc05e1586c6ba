//! Access tokens
//!
//! `/authenticate` issues an HS256 JWT whose subject is the registry user
//! name, handed out as `"bearer <jwt>"`. The `X-Authorization` header takes
//! either that form or the bare JWT. The admin flag inside a token is only a
//! record of what the directory said at issuance; the auth middleware asks
//! the directory again on every request.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::Error as JwtError, errors::ErrorKind, Algorithm, DecodingKey,
    EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Scheme prefix of issued tokens
pub const TOKEN_SCHEME: &str = "bearer";

/// Signing secret used when none is configured
const DEFAULT_SECRET: &str = "change-me-in-production";

/// Signing and lifetime settings for registry tokens
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// Seconds a token stays valid after issuance
    pub lifetime_seconds: i64,
    pub issuer: String,
    pub audience: String,
    pub algorithm: Algorithm,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: DEFAULT_SECRET.to_string(),
            lifetime_seconds: 10 * 60 * 60,
            issuer: "trust-registry".to_string(),
            audience: "trust-registry-api".to_string(),
            algorithm: Algorithm::HS256,
        }
    }
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Default::default()
        }
    }

    pub fn with_lifetime(mut self, seconds: i64) -> Self {
        self.lifetime_seconds = seconds;
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = audience.into();
        self
    }

    /// Reject settings that would issue unusable tokens
    pub fn validate(&self) -> Result<(), JwtConfigError> {
        if self.secret.is_empty() {
            return Err(JwtConfigError::EmptySecret);
        }
        if self.secret == DEFAULT_SECRET {
            tracing::warn!("Token signing secret is the built-in default; set jwt_secret");
        }
        if self.lifetime_seconds <= 0 {
            return Err(JwtConfigError::NonPositiveLifetime(self.lifetime_seconds));
        }
        if self.issuer.is_empty() || self.audience.is_empty() {
            return Err(JwtConfigError::MissingIssuerOrAudience);
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum JwtConfigError {
    #[error("Token signing secret cannot be empty")]
    EmptySecret,

    #[error("Token lifetime must be positive, got {0}s")]
    NonPositiveLifetime(i64),

    #[error("Token issuer and audience must both be set")]
    MissingIssuerOrAudience,
}

/// Registry token payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Registry user name
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub nbf: i64,
    /// Unique per issued token
    pub jti: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub admin: bool,
}

impl Claims {
    /// Claims for a token issued now under `config`
    pub fn issue(user: impl Into<String>, is_admin: bool, config: &JwtConfig) -> Self {
        let now = Utc::now();
        Self {
            sub: user.into(),
            iss: config.issuer.clone(),
            aud: config.audience.clone(),
            exp: (now + Duration::seconds(config.lifetime_seconds)).timestamp(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            admin: is_admin,
        }
    }

    /// Admin flag recorded at issuance
    pub fn is_admin(&self) -> bool {
        self.admin
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Token does not name a user")]
    MissingSubject,

    #[error("Token rejected: {0}")]
    Rejected(JwtError),

    #[error("X-Authorization must hold `bearer <token>` or a bare token")]
    Malformed,
}

impl From<JwtError> for TokenError {
    fn from(err: JwtError) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Rejected(err),
        }
    }
}

/// Issues and verifies registry tokens
pub struct JwtManager {
    pub config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtManager {
    pub fn new(config: JwtConfig) -> Result<Self, JwtConfigError> {
        config.validate()?;

        let mut validation = Validation::new(config.algorithm);
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);
        validation.validate_nbf = true;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            config,
        })
    }

    /// Sign a token for a user the directory has just authenticated
    pub fn generate_token(&self, user: impl Into<String>, is_admin: bool) -> Result<String, TokenError> {
        self.sign(&Claims::issue(user, is_admin, &self.config))
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        Ok(encode(&Header::new(self.config.algorithm), claims, &self.encoding_key)?)
    }

    /// Check signature, issuer, audience and lifetime
    pub fn validate_token(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims;
        if claims.sub.is_empty() {
            return Err(TokenError::MissingSubject);
        }
        Ok(claims)
    }

    /// Token part of an `X-Authorization` value
    ///
    /// The scheme is matched case-insensitively.
    pub fn extract_token_from_header(header_value: &str) -> Result<&str, TokenError> {
        match header_value.split_whitespace().collect::<Vec<_>>().as_slice() {
            [token] => Ok(*token),
            [scheme, token] if scheme.eq_ignore_ascii_case(TOKEN_SCHEME) => Ok(*token),
            _ => Err(TokenError::Malformed),
        }
    }

    /// Token as returned by `/authenticate`
    pub fn format_token(token: &str) -> String {
        format!("{} {}", TOKEN_SCHEME, token)
    }
}

impl fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtManager")
            .field("issuer", &self.config.issuer)
            .field("audience", &self.config.audience)
            .field("lifetime_seconds", &self.config.lifetime_seconds)
            .finish_non_exhaustive()
    }
}
