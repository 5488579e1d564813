/// Role checks
///
/// Roles are ordered: `admin` can do everything `user` can. Checks run after
/// authentication and read the role from the [`AuthContext`].

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::middleware::AuthContext;
use crate::models::user::UserRole;

#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// No identity attached to the request
    #[error("Unauthorized access. Token not provided.")]
    Unauthenticated,

    #[error("{}", denied_message(.required))]
    InsufficientRole { required: UserRole, actual: UserRole },
}

fn denied_message(required: &UserRole) -> String {
    match required {
        UserRole::Admin => "Access denied. Administrator permission required.".to_string(),
        other => format!("Access denied. Role '{}' required.", other),
    }
}

impl IntoResponse for AuthzError {
    fn into_response(self) -> Response {
        let (status, code) = match self {
            AuthzError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AuthzError::InsufficientRole { .. } => (StatusCode::FORBIDDEN, "forbidden"),
        };

        let body = json!({
            "success": false,
            "error": code,
            "message": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

fn rank(role: UserRole) -> u8 {
    match role {
        UserRole::User => 0,
        UserRole::Admin => 1,
    }
}

/// Passes if the caller's role is `required` or higher
pub fn require_role(auth: &AuthContext, required: UserRole) -> Result<(), AuthzError> {
    if rank(auth.role) >= rank(required) {
        Ok(())
    } else {
        Err(AuthzError::InsufficientRole {
            required,
            actual: auth.role,
        })
    }
}

/// Middleware admitting only administrators
///
/// Must run inside the authentication layer.
pub async fn require_admin_middleware(req: Request, next: Next) -> Result<Response, AuthzError> {
    let auth = req
        .extensions()
        .get::<AuthContext>()
        .ok_or(AuthzError::Unauthenticated)?;

    if let Err(e) = require_role(auth, UserRole::Admin) {
        tracing::warn!(user_id = %auth.user_id, role = %auth.role, "Admin route denied");
        return Err(e);
    }

    Ok(next.run(req).await)
}
