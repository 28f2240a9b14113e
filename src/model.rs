/// Persistent entities owned by the credential store, plus the
/// request-scoped values the core receives explicitly from the caller.
use actix_web::HttpRequest;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::secret::StoredSecret;

/// A registered account as the credential store holds it.
#[derive(Clone, Debug)]
pub struct Account {
    pub id: Uuid,
    pub handle: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub birth_date: NaiveDate,
    pub password_hash: String,
    pub failed_login_count: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub is_email_verified: bool,
    pub is_phone_verified: bool,
    pub email_verification: Option<StoredSecret>,
    pub sms_verification: Option<StoredSecret>,
    pub login_step_up: Option<StoredSecret>,
    pub last_login_ip: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub delete_requested_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// The minimal projection of an account that may leave the core.
/// Never carries the password hash or any secret material.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct PublicAccount {
    pub id: Uuid,
    pub handle: String,
    pub email: String,
}

impl From<&Account> for PublicAccount {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            handle: account.handle.clone(),
            email: account.email.clone(),
        }
    }
}

/// A persisted session: the refresh token's hash plus audit metadata.
/// Created once at authentication, never mutated except for revocation.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    pub account_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub ip_address: String,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(
        account_id: Uuid,
        token_hash: String,
        ttl_seconds: i64,
        meta: &RequestMeta,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            token_hash,
            expires_at: meta.now + chrono::Duration::seconds(ttl_seconds),
            ip_address: meta.ip_address.clone(),
            user_agent: meta.user_agent.clone(),
            created_at: meta.now,
            revoked_at: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Append-only password history; at least the 3 most recent entries are
/// checked on reset.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct PasswordHistoryEntry {
    pub id: Uuid,
    pub account_id: Uuid,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl PasswordHistoryEntry {
    pub fn new(account_id: Uuid, password_hash: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            password_hash,
            created_at: now,
        }
    }
}

/// A dual-secret password reset request: link token and SMS code hashes
/// share one expiry and one used marker.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ResetRequest {
    pub id: Uuid,
    pub account_id: Uuid,
    pub reset_hash: String,
    pub sms_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ResetRequest {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Link token + numeric code issued together. Returned to the caller
/// only in relaxed mode, for local experimentation.
#[derive(Clone, Debug, Serialize)]
pub struct IssuedChallenges {
    pub link_token: String,
    pub sms_code: String,
}

/// Request-scoped context the caller supplies to every core operation.
/// The core never reads ambient time or headers itself.
#[derive(Clone, Debug)]
pub struct RequestMeta {
    pub now: DateTime<Utc>,
    pub ip_address: String,
    pub user_agent: String,
}

impl RequestMeta {
    pub fn from_request(req: &HttpRequest) -> Self {
        let ip_address = req
            .headers()
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .map(|h| h.split(',').next().unwrap_or("").trim().to_string())
            .filter(|ip| !ip.is_empty())
            .or_else(|| req.peer_addr().map(|addr| addr.ip().to_string()))
            .unwrap_or_default();

        let user_agent = req
            .headers()
            .get("user-agent")
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default()
            .to_string();

        Self {
            now: Utc::now(),
            ip_address,
            user_agent,
        }
    }
}
