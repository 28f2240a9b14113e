/// Token signing and validation.
///
/// Access and refresh tokens are both HS256 JWTs bound to the same
/// identity payload; they differ only in lifetime. The refresh token is
/// additionally hashed for server-side storage by the session issuer.
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::AppError;

/// Generate a short-lived access token for an account.
pub fn generate_access_token(
    account_id: &Uuid,
    email: &str,
    handle: &str,
    config: &JwtSettings,
    now: DateTime<Utc>,
) -> Result<String, AppError> {
    sign(account_id, email, handle, config.access_token_expiry, config, now)
}

/// Generate a long-lived refresh token for an account.
pub fn generate_refresh_token(
    account_id: &Uuid,
    email: &str,
    handle: &str,
    config: &JwtSettings,
    now: DateTime<Utc>,
) -> Result<String, AppError> {
    sign(account_id, email, handle, config.refresh_token_expiry, config, now)
}

fn sign(
    account_id: &Uuid,
    email: &str,
    handle: &str,
    ttl_seconds: i64,
    config: &JwtSettings,
    now: DateTime<Utc>,
) -> Result<String, AppError> {
    let claims = Claims::new(
        *account_id,
        email.to_string(),
        handle.to_string(),
        ttl_seconds,
        config.issuer.clone(),
        now,
    );

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Validate a token's signature, expiry, and issuer, and extract claims.
pub fn validate_token(token: &str, config: &JwtSettings) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!("JWT validation error: {}", e);
        AppError::Internal("Invalid or expired token".to_string())
    })
}
