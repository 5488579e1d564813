/// JWT issuing and validation
///
/// Tokens are HS256-signed and carry the user id as subject. The lifetime comes
/// from configuration (`JWT_EXPIRES_IN`). Validation checks signature, issuer,
/// `exp` and `nbf`, and tells expired tokens apart from otherwise invalid ones
/// so the middleware can answer with distinct messages.
///
/// # Example
///
/// ```
/// use chrono::Duration;
/// use tasklist_shared::auth::jwt::{issue_token, validate_token};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-secret-of-at-least-thirty-two-bytes";
/// let user_id = Uuid::new_v4();
///
/// let token = issue_token(user_id, Duration::days(1), secret)?;
/// let claims = validate_token(&token, secret)?;
/// assert_eq!(claims.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Value of the `iss` claim
pub const ISSUER: &str = "tasklist";

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Bad signature, wrong issuer, or malformed token
    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Token has expired")]
    Expired,
}

/// Token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,

    pub iss: String,

    /// Issued at (Unix seconds)
    pub iat: i64,

    /// Not before (Unix seconds)
    pub nbf: i64,

    /// Expiration (Unix seconds)
    pub exp: i64,
}

impl Claims {
    /// Claims for `user_id`, valid from now for `lifetime`
    pub fn new(user_id: Uuid, lifetime: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signs claims with HS256
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| JwtError::CreateError(e.to_string()))
}

/// Issues a token for `user_id` that expires after `lifetime`
pub fn issue_token(user_id: Uuid, lifetime: Duration, secret: &str) -> Result<String, JwtError> {
    create_token(&Claims::new(user_id, lifetime), secret)
}

/// Verifies a token and returns its claims
///
/// # Errors
///
/// [`JwtError::Expired`] once `exp` has passed (with the library's default
/// leeway), [`JwtError::Invalid`] for every other failure.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_nbf = true;

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            _ => JwtError::Invalid(e.to_string()),
        })
}
