/// JWT Claims structure
///
/// Payload shared by access and refresh tokens: the account identity
/// plus standard JWT claims (RFC 7519).
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (account ID as UUID string)
    pub sub: String,
    /// Account email
    pub email: String,
    /// Human-chosen handle
    pub handle: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
    /// Token ID. Makes every minted token unique, so two tokens issued
    /// within the same second never hash to the same session record.
    pub jti: String,
}

impl Claims {
    pub fn new(
        account_id: Uuid,
        email: String,
        handle: String,
        expiry_seconds: i64,
        issuer: String,
        now: DateTime<Utc>,
    ) -> Self {
        let issued_at = now.timestamp();
        Self {
            sub: account_id.to_string(),
            email,
            handle,
            exp: issued_at + expiry_seconds,
            iat: issued_at,
            iss: issuer,
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Extract the account ID from claims.
    ///
    /// # Errors
    /// Returns error if the subject is not a valid UUID.
    pub fn account_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Internal("Invalid account ID in token".to_string()))
    }
}
