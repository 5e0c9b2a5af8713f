use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};
use crate::models::{Company, User};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Claims carried by every access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub company_id: Uuid,
    pub account_type: String,
    pub role: String,
    #[serde(default)]
    pub platform_admin: bool,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Build claims for a user that just proved their password
    pub fn for_user(user: &User, company: &Company, config: &AuthConfig, now: i64) -> Self {
        Self {
            sub: user.id,
            company_id: company.id,
            account_type: company.account_type.clone(),
            role: user.role.clone(),
            platform_admin: config.is_platform_admin(&user.email),
            iat: now,
            exp: now + config.jwt_ttl_secs,
        }
    }
}

/// Sign claims with HS256
pub fn issue_token(claims: &Claims, secret: &str) -> AppResult<String> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Message(format!("Failed to sign token: {}", e)))
}

/// Verify signature and expiry, returning the claims
pub fn verify_token(token: &str, secret: &str) -> AppResult<Claims> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

/// Pull the token out of an `Authorization: Bearer ...` header value
pub fn bearer_token(header: &str) -> AppResult<&str> {
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .unwrap_or_default();

    if token.is_empty() {
        return Err(AppError::Unauthorized("Missing bearer token".to_string()));
    }
    Ok(token)
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Hash a password into a PHC string
pub fn hash_password(password: &str) -> AppResult<String> {
    // A v4 uuid is 16 random bytes, which is exactly what the salt needs
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|e| AppError::Message(format!("Failed to build salt: {}", e)))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Message(format!("Failed to hash password: {}", e)))
}

/// Check a password against a stored PHC string; malformed hashes never match
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn claims(exp_offset: i64) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            account_type: "provider".to_string(),
            role: "admin".to_string(),
            platform_admin: false,
            iat: now,
            exp: now + exp_offset,
        }
    }

    #[test]
    fn test_token_round_trip() {
        let claims = claims(3600);
        let token = issue_token(&claims, "secret").unwrap();
        assert_eq!(verify_token(&token, "secret").unwrap(), claims);
    }

    #[test]
    fn test_token_rejected_with_wrong_secret() {
        let token = issue_token(&claims(3600), "secret").unwrap();
        let err = verify_token(&token, "other").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_expired_token_rejected() {
        // Past the default 60s leeway
        let token = issue_token(&claims(-600), "secret").unwrap();
        assert!(verify_token(&token, "secret").is_err());
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def").unwrap(), "abc.def");
        assert!(bearer_token("Basic dXNlcjpwYXNz").is_err());
        assert!(bearer_token("Bearer ").is_err());
    }

    #[test]
    fn test_password_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-hash"));
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }
}
