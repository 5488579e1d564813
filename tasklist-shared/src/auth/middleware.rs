/// Bearer-token authentication for Axum
///
/// A request moves through three checks: the `Authorization: Bearer <token>`
/// header is present, the token validates, and its subject is an existing
/// user. Each failure answers 401 with its own message. On success an
/// [`AuthContext`] is added to the request extensions.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use axum::{middleware, routing::get, Extension, Router};
/// use tasklist_shared::auth::middleware::{jwt_auth_middleware, AuthContext};
/// use tasklist_shared::store::{MemoryStore, Store};
///
/// async fn whoami(Extension(auth): Extension<AuthContext>) -> String {
///     auth.username
/// }
///
/// let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
/// let secret: Arc<str> = Arc::from("a-secret-of-at-least-thirty-two-bytes");
///
/// let app: Router = Router::new()
///     .route("/whoami", get(whoami))
///     .layer(middleware::from_fn(move |req, next| {
///         jwt_auth_middleware(store.clone(), secret.clone(), req, next)
///     }));
/// ```

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::jwt::{validate_token, JwtError};
use crate::models::user::{User, UserRole};
use crate::store::{Store, StoreError, UserStore};

/// Identity of the authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub role: UserRole,
}

impl From<&User> for AuthContext {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Unauthorized access. Token not provided.")]
    MissingToken,

    #[error("Invalid token.")]
    InvalidToken,

    #[error("Token expired. Please log in again.")]
    Expired,

    #[error("User not found or invalid token.")]
    UnknownUser,

    /// Subject lookup failed
    #[error("User lookup failed: {0}")]
    Store(#[from] StoreError),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::Expired,
            _ => AuthError::InvalidToken,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AuthError::Store(e) => {
                tracing::error!(error = %e, "Store failure during authentication");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            other => (StatusCode::UNAUTHORIZED, "unauthorized", other.to_string()),
        };

        let body = json!({
            "success": false,
            "error": code,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}

/// Extracts the token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolves request headers to the calling user
pub async fn authenticate<S>(store: &S, secret: &str, headers: &HeaderMap) -> Result<AuthContext, AuthError>
where
    S: UserStore + ?Sized,
{
    let token = bearer_token(headers).ok_or(AuthError::MissingToken)?;
    let claims = validate_token(token, secret)?;

    let user = store
        .find_user(claims.sub)
        .await?
        .ok_or(AuthError::UnknownUser)?;

    Ok(AuthContext::from(&user))
}

/// Middleware requiring a valid bearer token
pub async fn jwt_auth_middleware(
    store: Arc<dyn Store>,
    secret: Arc<str>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth = authenticate(store.as_ref(), &secret, req.headers()).await?;

    tracing::debug!(user_id = %auth.user_id, role = %auth.role, "Authenticated request");
    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}
