/// Account lifecycle operations: deactivation with a grace window and
/// masked-email recovery by phone number and birth date.
use chrono::{Duration, NaiveDate};
use uuid::Uuid;

use crate::auth::password;
use crate::error::{AppError, AuthFlowError};
use crate::model::RequestMeta;
use crate::store::CredentialStore;

/// Days between a deactivation request and the account's deletion.
const DELETION_GRACE_DAYS: i64 = 30;

/// Schedules the account for deletion after the grace window and revokes
/// every session. The caller must re-state the handle and password; a
/// bearer token alone is not enough to destroy an account.
pub async fn request_deactivation<S: CredentialStore>(
    store: &S,
    account_id: Uuid,
    handle: &str,
    password: &str,
    meta: &RequestMeta,
) -> Result<(), AppError> {
    let account = store
        .find_by_id(account_id)
        .await?
        .ok_or(AppError::Flow(AuthFlowError::NotFound))?;

    if account.handle != handle {
        return Err(AppError::Flow(AuthFlowError::InvalidCredential));
    }
    if !password::verify_password(password, &account.password_hash)? {
        return Err(AppError::Flow(AuthFlowError::InvalidCredential));
    }

    let delete_at = meta.now + Duration::days(DELETION_GRACE_DAYS);
    store
        .request_deactivation(account.id, meta.now, delete_at)
        .await?;
    store.revoke_all_sessions(account.id, meta.now).await?;

    tracing::info!(account_id = %account.id, delete_at = %delete_at, "Deactivation requested");
    Ok(())
}

/// Looks up the account registered under `phone` and `birth_date` and
/// returns its email with the local part mostly hidden.
pub async fn recover_email<S: CredentialStore>(
    store: &S,
    phone: &str,
    birth_date: NaiveDate,
) -> Result<String, AppError> {
    let account = store
        .find_by_phone_and_birth_date(phone, birth_date)
        .await?
        .ok_or(AppError::Flow(AuthFlowError::NotFound))?;

    Ok(mask_email(&account.email))
}

/// Keeps the first two characters of the local part (one for very short
/// local parts) and replaces the rest with asterisks.
fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let kept = if local.chars().count() <= 2 { 1 } else { 2 };
            let prefix: String = local.chars().take(kept).collect();
            format!("{}***@{}", prefix, domain)
        }
        None => email.to_string(),
    }
}
