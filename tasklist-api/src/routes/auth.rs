/// Authentication endpoints
///
/// - `POST /api/register` - Register a user and get a token
/// - `POST /api/login` - Exchange email and password for a token
/// - `GET /api/profile` - Current user (requires a token)
///
/// Passwords are hashed on the blocking pool so Argon2 never stalls the
/// async workers.

use crate::{
    app::AppState,
    error::{ApiError, ApiJson, ApiResult},
};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tasklist_shared::{
    auth::{middleware::AuthContext, password},
    models::user::{CreateUser, User, UserRole},
};
use uuid::Uuid;
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Invalid email or password.";

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: String,

    #[serde(default)]
    #[validate(email(message = "Please include a valid email"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    /// Defaults to `user`
    pub role: Option<UserRole>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(email(message = "Please include a valid email"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Public part of a user returned with tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: UserRole,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Register and login response
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: User,
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/register
/// Content-Type: application/json
///
/// {
///   "username": "ana",
///   "email": "ana@example.com",
///   "password": "secret1"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, or username/email already taken
/// - `500 Internal Server Error`: Server error
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<TokenResponse>)> {
    req.validate()?;

    let taken = state
        .store
        .find_user_by_login(&req.email, &req.username)
        .await?;
    if taken.is_some() {
        return Err(ApiError::Conflict(
            "User or email already registered.".to_string(),
        ));
    }

    let password_hash = password::hash_password_blocking(req.password).await?;

    // The store still rejects a concurrent duplicate with StoreError::Duplicate
    let user = state
        .store
        .insert_user(CreateUser {
            username: req.username,
            email: req.email,
            password_hash,
            role: req.role.unwrap_or_default(),
        })
        .await?;

    tracing::info!(user_id = %user.id, role = %user.role, "User registered");

    let token = state.issue_token(user.id)?;

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            success: true,
            message: "User registered successfully!".to_string(),
            token,
            user: UserSummary::from(&user),
        }),
    ))
}

/// Login endpoint
///
/// Unknown email and wrong password answer the same 401 message.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    req.validate()?;

    let user = state
        .store
        .find_user_by_email(&req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    let valid = password::verify_password_blocking(req.password, user.password_hash.clone()).await?;
    if !valid {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let token = state.issue_token(user.id)?;

    Ok(Json(TokenResponse {
        success: true,
        message: "Login successful!".to_string(),
        token,
        user: UserSummary::from(&user),
    }))
}

/// Returns the authenticated user
pub async fn profile(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<ProfileResponse>> {
    let user = state
        .store
        .find_user(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;

    Ok(Json(ProfileResponse {
        success: true,
        user,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_validation() {
        let req: RegisterRequest = serde_json::from_value(serde_json::json!({
            "username": "an",
            "email": "not-an-email",
            "password": "12345"
        }))
        .unwrap();

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_register_role_is_optional() {
        let req: RegisterRequest = serde_json::from_value(serde_json::json!({
            "username": "ana",
            "email": "ana@example.com",
            "password": "secret1"
        }))
        .unwrap();

        assert!(req.validate().is_ok());
        assert!(req.role.is_none());
    }

    #[test]
    fn test_login_requires_password() {
        let req: LoginRequest = serde_json::from_value(serde_json::json!({
            "email": "ana@example.com"
        }))
        .unwrap();

        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
    }
}
