/// Authentication and authorization
///
/// - [`password`]: Argon2id hashing and verification
/// - [`jwt`]: HS256 token issuing and validation
/// - [`middleware`]: bearer-token authentication layer and [`middleware::AuthContext`]
/// - [`authorization`]: role checks and the admin gate
///
/// # Example
///
/// ```no_run
/// use chrono::Duration;
/// use tasklist_shared::auth::jwt::{issue_token, validate_token};
/// use tasklist_shared::auth::password::{hash_password, verify_password};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("hunter22")?;
/// assert!(verify_password("hunter22", &hash)?);
///
/// let secret = "a-secret-of-at-least-thirty-two-bytes";
/// let token = issue_token(Uuid::new_v4(), Duration::days(1), secret)?;
/// validate_token(&token, secret)?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
