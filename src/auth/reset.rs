/// Dual-secret password reset: a link token and an SMS code must both
/// match the same unused, unexpired request record.
///
/// Reuse prevention compares the candidate password against recent
/// history with the bcrypt verification primitive, since the stored
/// hashes are salted and can never be compared directly.
use uuid::Uuid;

use crate::auth::{opaque, password};
use crate::configuration::SecurityMode;
use crate::error::{AppError, AuthFlowError};
use crate::model::{IssuedChallenges, RequestMeta, ResetRequest};
use crate::notify::{self, NotificationDispatcher};
use crate::secret::{SecretPurpose, StoredSecret};
use crate::store::CredentialStore;

/// How many history entries a new password is checked against.
const HISTORY_DEPTH: i64 = 3;

/// Issues a reset request for the account behind `email` and dispatches
/// the two secrets on their channels. Delivery failures are logged, never
/// surfaced; the request record exists either way.
pub async fn request_reset<S, N>(
    store: &S,
    dispatcher: &N,
    base_url: &str,
    mode: SecurityMode,
    email: &str,
    meta: &RequestMeta,
) -> Result<Option<IssuedChallenges>, AppError>
where
    S: CredentialStore,
    N: NotificationDispatcher,
{
    let account = store
        .find_by_identifier(email)
        .await?
        .ok_or(AppError::Flow(AuthFlowError::NotFound))?;

    let link_token = opaque::generate_opaque_token();
    let sms_code = opaque::generate_numeric_code(6);

    let link_secret = StoredSecret::issue(&link_token, SecretPurpose::PasswordResetLink, meta.now);
    let sms_secret = StoredSecret::issue(&sms_code, SecretPurpose::PasswordResetSms, meta.now);

    let request = ResetRequest {
        id: Uuid::new_v4(),
        account_id: account.id,
        reset_hash: link_secret.hash,
        sms_hash: sms_secret.hash,
        expires_at: link_secret.expires_at,
        used_at: None,
        created_at: meta.now,
    };
    store.insert_reset_request(&request).await?;

    let (subject, html) = notify::reset_email(base_url, &link_token);
    notify::send_email_best_effort(dispatcher, &account.email, &subject, &html).await;
    if let Some(phone) = account.phone_number.as_deref() {
        notify::send_sms_best_effort(dispatcher, phone, &notify::reset_sms(&sms_code)).await;
    }

    tracing::info!(account_id = %account.id, "Password reset requested");

    Ok(match mode {
        SecurityMode::Relaxed => Some(IssuedChallenges {
            link_token,
            sms_code,
        }),
        SecurityMode::Hardened => None,
    })
}

/// Rotates the password once both secrets check out and the candidate
/// clears the history window. The update, the history append, and the
/// used marker are applied together as one logical step.
pub async fn reset_password<S: CredentialStore>(
    store: &S,
    link_token: &str,
    sms_code: &str,
    new_password: &str,
    meta: &RequestMeta,
) -> Result<(), AppError> {
    password::validate_password_policy(new_password)?;

    let reset_hash = opaque::hash_secret(link_token);
    let sms_hash = opaque::hash_secret(sms_code);

    // A mismatch on either secret looks identical to the caller.
    let request = store
        .find_reset_request(&reset_hash, &sms_hash)
        .await?
        .ok_or(AppError::Flow(AuthFlowError::SecretMismatch))?;

    if request.used_at.is_some() {
        return Err(AppError::Flow(AuthFlowError::SecretAlreadyUsed));
    }

    if request.is_expired(meta.now) {
        return Err(AppError::Flow(AuthFlowError::SecretExpired));
    }

    let history = store.recent_history(request.account_id, HISTORY_DEPTH).await?;
    for entry in &history {
        if password::verify_password(new_password, &entry.password_hash)? {
            return Err(AppError::Flow(AuthFlowError::PasswordReused));
        }
    }

    let new_hash = password::hash_password(new_password)?;
    store.update_password(request.account_id, &new_hash).await?;
    store
        .insert_history(&crate::model::PasswordHistoryEntry::new(
            request.account_id,
            new_hash,
            meta.now,
        ))
        .await?;
    store.mark_reset_used(request.id, meta.now).await?;

    tracing::info!(account_id = %request.account_id, "Password reset completed");
    Ok(())
}
