//! Authentication API handlers
//!
//! `PUT /authenticate` exchanges credentials for a token, returned as a
//! JSON string of the form `"bearer <jwt>"`. Administrators can add users
//! through `POST /users`.

use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};
use trust_registry_service::{AuthenticateRequest, AuthenticatedUser, RegisterUserRequest};

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    handlers::AppState,
    jwt::JwtManager,
    responses::created,
};

/// Issue a token for valid credentials
#[instrument(skip(state, payload))]
pub async fn authenticate(
    State(state): State<AppState>,
    payload: Result<Json<AuthenticateRequest>, JsonRejection>,
) -> ApiResult<Json<String>> {
    let Json(request) = payload?;
    let user = state.services.auth().authenticate(request).await?;

    let token = state
        .auth
        .jwt_manager()
        .generate_token(&user.name, user.is_admin)
        .map_err(|e| ApiError::internal_server_error(format!("Failed to generate token: {}", e)))?;

    info!(user = %user.name, is_admin = user.is_admin, "Token issued");
    Ok(Json(JwtManager::format_token(&token)))
}

/// Add a user (admin only)
#[instrument(skip(state, admin, payload), fields(admin = %admin.user_name()))]
pub async fn register_user(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    payload: Result<Json<RegisterUserRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AuthenticatedUser>)> {
    let Json(request) = payload?;
    let user = state.services.auth().register_user(request).await?;
    Ok(created(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthState;
    use crate::jwt::JwtConfig;
    use std::sync::Arc;
    use trust_registry_db::InMemoryArtifactRepository;
    use trust_registry_service::{
        ServiceConfig, ServiceRegistry, StaticSourceResolver, UserDirectoryConfig,
    };

    fn state() -> AppState {
        let services = ServiceRegistry::new(
            Arc::new(InMemoryArtifactRepository::new()),
            Arc::new(StaticSourceResolver::new()),
            ServiceConfig {
                users: UserDirectoryConfig {
                    default_admin_name: "root".to_string(),
                    default_admin_password: "s3cret".to_string(),
                },
                ..Default::default()
            },
        );
        let jwt = JwtManager::new(JwtConfig::new("test-secret")).unwrap();
        let directory = services.auth().clone();
        AppState::new(services, AuthState::new(jwt, directory))
    }

    #[tokio::test]
    async fn test_authenticate_issues_bearer_token() {
        let state = state();
        let Json(token) = authenticate(
            State(state.clone()),
            Ok(Json(AuthenticateRequest::new("root", "s3cret", true))),
        )
        .await
        .unwrap();

        let raw = token.strip_prefix("bearer ").unwrap();
        let claims = state.auth.jwt_manager().validate_token(raw).unwrap();
        assert_eq!(claims.sub, "root");
        assert!(claims.is_admin());
    }

    #[tokio::test]
    async fn test_authenticate_rejects_bad_password() {
        let err = authenticate(
            State(state()),
            Ok(Json(AuthenticateRequest::new("root", "wrong", true))),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }
}
