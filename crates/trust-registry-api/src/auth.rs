//! Authentication middleware
//!
//! Protected routes read the token from the `X-Authorization` header.
//! A token only proves who the caller was when it was issued, so every
//! request also looks the user up in the directory: users dropped by a
//! reset are refused, and the admin flag is the directory's current one.
//! [`require_auth`] admits any known user; [`require_admin`] additionally
//! demands admin rights.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, warn};
use trust_registry_service::AuthService;

use crate::{
    error::ErrorResponse,
    jwt::{Claims, JwtManager, TokenError},
};

/// Header carrying the access token
pub static X_AUTHORIZATION: HeaderName = HeaderName::from_static("x-authorization");

/// Caller identity attached to authenticated requests
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub claims: Claims,
    is_admin: bool,
}

impl AuthUser {
    pub fn new(claims: Claims, is_admin: bool) -> Self {
        Self { claims, is_admin }
    }

    pub fn user_name(&self) -> &str {
        &self.claims.sub
    }

    /// Admin rights as recorded in the directory when the request arrived
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }
}

/// Token verifier plus the directory it checks callers against
#[derive(Clone)]
pub struct AuthState {
    jwt_manager: Arc<JwtManager>,
    directory: Arc<dyn AuthService>,
}

impl AuthState {
    pub fn new(jwt_manager: JwtManager, directory: Arc<dyn AuthService>) -> Self {
        Self {
            jwt_manager: Arc::new(jwt_manager),
            directory,
        }
    }

    pub fn jwt_manager(&self) -> &JwtManager {
        &self.jwt_manager
    }

    /// Validate the request token and resolve its subject in the directory
    async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthUser, AuthError> {
        let header = headers
            .get(&X_AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::MissingToken)?;

        let token =
            JwtManager::extract_token_from_header(header).map_err(|_| AuthError::InvalidToken)?;

        let claims = self.jwt_manager.validate_token(token).map_err(|e| match e {
            TokenError::Expired => AuthError::ExpiredToken,
            _ => AuthError::InvalidToken,
        })?;

        match self.directory.lookup(&claims.sub).await {
            Some(user) => Ok(AuthUser::new(claims, user.is_admin)),
            None => {
                warn!(user = %claims.sub, "Token subject is not a registered user");
                Err(AuthError::UnknownUser)
            }
        }
    }
}

/// Required authentication middleware
///
/// # Usage
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use axum::{Router, routing::get, middleware};
/// use trust_registry_api::auth::{require_auth, AuthState};
/// use trust_registry_api::jwt::{JwtConfig, JwtManager};
/// use trust_registry_service::{DefaultAuthService, UserDirectoryConfig};
///
/// let jwt_manager = JwtManager::new(JwtConfig::default()).unwrap();
/// let directory = Arc::new(DefaultAuthService::new(UserDirectoryConfig::default()));
/// let auth_state = AuthState::new(jwt_manager, directory);
///
/// let app: Router = Router::new()
///     .route("/protected", get(|| async { "Protected content" }))
///     .layer(middleware::from_fn_with_state(auth_state, require_auth));
/// ```
pub async fn require_auth(
    State(auth_state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = auth_state.authenticate(request.headers()).await?;
    debug!(user = %user.user_name(), "User authenticated");

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Admin-only authentication middleware
pub async fn require_admin(
    State(auth_state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = auth_state.authenticate(request.headers()).await?;
    if !user.is_admin() {
        warn!(user = %user.user_name(), "Admin operation refused");
        return Err(AuthError::InsufficientPermissions);
    }

    debug!(user = %user.user_name(), "Admin authenticated");
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Authentication errors
#[derive(Debug)]
pub enum AuthError {
    /// Missing authentication token
    MissingToken,

    /// Invalid token format or signature
    InvalidToken,

    /// Token has expired
    ExpiredToken,

    /// Token subject no longer exists in the directory
    UnknownUser,

    /// User lacks required permissions
    InsufficientPermissions,
}

impl AuthError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AuthError::InsufficientPermissions => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            _ => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let error_response = ErrorResponse {
            status: status.as_u16(),
            error: self.to_string(),
            code: Some(code.to_string()),
            timestamp: chrono::Utc::now(),
        };

        (status, axum::Json(error_response)).into_response()
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Missing authentication token"),
            AuthError::InvalidToken => write!(f, "Invalid authentication token"),
            AuthError::ExpiredToken => write!(f, "Authentication token has expired"),
            AuthError::UnknownUser => write!(f, "Unknown user"),
            AuthError::InsufficientPermissions => write!(f, "Insufficient permissions"),
        }
    }
}

impl std::error::Error for AuthError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::JwtConfig;
    use axum::{
        body::Body,
        extract::Extension,
        http::Request,
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;
    use trust_registry_service::{DefaultAuthService, RegisterUserRequest, UserDirectoryConfig};

    fn create_test_jwt_manager() -> JwtManager {
        let config = JwtConfig::new("test-secret-key")
            .with_issuer("test")
            .with_audience("test");
        JwtManager::new(config).unwrap()
    }

    fn register(name: &str, is_admin: bool) -> RegisterUserRequest {
        RegisterUserRequest::new(name, "pw", is_admin)
    }

    /// Directory with admin "root" and plain user "alice"
    async fn directory() -> Arc<DefaultAuthService> {
        let directory = Arc::new(DefaultAuthService::new(UserDirectoryConfig {
            default_admin_name: "root".to_string(),
            default_admin_password: "s3cret".to_string(),
        }));
        directory.register_user(register("alice", false)).await.unwrap();
        directory
    }

    async fn protected_handler(Extension(user): Extension<AuthUser>) -> String {
        format!("Hello, {}", user.user_name())
    }

    fn app(auth_state: AuthState) -> Router {
        Router::new()
            .route("/protected", get(protected_handler))
            .route_layer(middleware::from_fn_with_state(auth_state.clone(), require_auth))
            .merge(
                Router::new()
                    .route("/admin", get(protected_handler))
                    .route_layer(middleware::from_fn_with_state(auth_state, require_admin)),
            )
    }

    async fn status(app: Router, uri: &str, header: Option<String>) -> StatusCode {
        let mut request = Request::builder().uri(uri);
        if let Some(value) = header {
            request = request.header("X-Authorization", value);
        }
        app.oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_require_auth() {
        let jwt_manager = create_test_jwt_manager();
        let token = jwt_manager.generate_token("alice", false).unwrap();
        let app = app(AuthState::new(jwt_manager, directory().await));

        assert_eq!(
            status(app.clone(), "/protected", Some(format!("bearer {}", token))).await,
            StatusCode::OK
        );
        assert_eq!(status(app.clone(), "/protected", Some(token)).await, StatusCode::OK);
        assert_eq!(status(app.clone(), "/protected", None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(
            status(app, "/protected", Some("bearer invalid.token.here".to_string())).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_standard_authorization_header_is_not_read() {
        let jwt_manager = create_test_jwt_manager();
        let token = jwt_manager.generate_token("alice", false).unwrap();
        let app = app(AuthState::new(jwt_manager, directory().await));

        let request = Request::builder()
            .uri("/protected")
            .header("Authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_require_admin() {
        let jwt_manager = create_test_jwt_manager();
        let user = jwt_manager.generate_token("alice", false).unwrap();
        let admin = jwt_manager.generate_token("root", true).unwrap();
        let app = app(AuthState::new(jwt_manager, directory().await));

        assert_eq!(status(app.clone(), "/admin", Some(user)).await, StatusCode::FORBIDDEN);
        assert_eq!(status(app.clone(), "/admin", Some(admin)).await, StatusCode::OK);
        assert_eq!(status(app, "/admin", None).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_of_unregistered_user_is_refused() {
        let jwt_manager = create_test_jwt_manager();
        let ghost = jwt_manager.generate_token("ghost", true).unwrap();
        let app = app(AuthState::new(jwt_manager, directory().await));

        assert_eq!(status(app.clone(), "/protected", Some(ghost.clone())).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status(app, "/admin", Some(ghost)).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_rights_follow_the_directory() {
        let jwt_manager = create_test_jwt_manager();
        let directory = directory().await;
        directory.register_user(register("bob", true)).await.unwrap();
        let bob = jwt_manager.generate_token("bob", true).unwrap();
        let promoted = jwt_manager.generate_token("alice", false).unwrap();
        let app = app(AuthState::new(jwt_manager, directory.clone()));

        assert_eq!(status(app.clone(), "/admin", Some(bob.clone())).await, StatusCode::OK);

        // Demoted after the token was issued
        directory.register_user(register("bob", false)).await.unwrap();
        assert_eq!(status(app.clone(), "/admin", Some(bob.clone())).await, StatusCode::FORBIDDEN);
        assert_eq!(status(app.clone(), "/protected", Some(bob)).await, StatusCode::OK);

        // Promoted after the token was issued
        directory.register_user(register("alice", true)).await.unwrap();
        assert_eq!(status(app, "/admin", Some(promoted)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_reset_revokes_outstanding_tokens() {
        let jwt_manager = create_test_jwt_manager();
        let directory = directory().await;
        let alice = jwt_manager.generate_token("alice", false).unwrap();
        let root = jwt_manager.generate_token("root", true).unwrap();
        let app = app(AuthState::new(jwt_manager, directory.clone()));

        assert_eq!(status(app.clone(), "/protected", Some(alice.clone())).await, StatusCode::OK);
        directory.reset().await;
        assert_eq!(status(app.clone(), "/protected", Some(alice)).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status(app, "/admin", Some(root)).await, StatusCode::OK);
    }
}
