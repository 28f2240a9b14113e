use chrono::{DateTime, Duration, Utc};

use crate::auth::opaque::hash_secret;

/// What a stored secret is allowed to prove.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SecretPurpose {
    EmailVerify,
    SmsVerify,
    LoginStepUp,
    PasswordResetLink,
    PasswordResetSms,
}

impl SecretPurpose {
    /// Lifetime of a secret issued for this purpose.
    pub fn ttl(self) -> Duration {
        match self {
            SecretPurpose::LoginStepUp => Duration::minutes(15),
            SecretPurpose::EmailVerify
            | SecretPurpose::SmsVerify
            | SecretPurpose::PasswordResetLink
            | SecretPurpose::PasswordResetSms => Duration::minutes(30),
        }
    }
}

/// A single-use secret held only as a hash plus its expiry.
///
/// The raw value is never persisted; comparison re-hashes the supplied
/// value. Consumption is modeled by clearing the slot that holds it, so
/// an absent secret and a consumed secret are indistinguishable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredSecret {
    pub hash: String,
    pub expires_at: DateTime<Utc>,
}

impl StoredSecret {
    pub fn issue(raw: &str, purpose: SecretPurpose, now: DateTime<Utc>) -> Self {
        Self {
            hash: hash_secret(raw),
            expires_at: now + purpose.ttl(),
        }
    }

    /// An expiry exactly equal to `now` still counts as valid; only a
    /// strictly-past expiry rejects.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    pub fn matches(&self, supplied: &str) -> bool {
        hash_secret(supplied) == self.hash
    }
}
