/// Registration and the dual-channel verification lifecycle.
///
/// Signup issues two independent secrets: an opaque token delivered as an
/// email link and a numeric code delivered over SMS, sharing one expiry.
/// Each channel is verified on its own, in either order, and each
/// consumes only its own secret.
use chrono::NaiveDate;
use uuid::Uuid;

use crate::auth::{opaque, password};
use crate::configuration::SecurityMode;
use crate::error::{AccountField, AppError, AuthFlowError};
use crate::model::{Account, IssuedChallenges, PasswordHistoryEntry, PublicAccount, RequestMeta};
use crate::notify::{self, NotificationDispatcher};
use crate::secret::{SecretPurpose, StoredSecret};
use crate::store::CredentialStore;
use crate::validators;

#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub handle: String,
    pub email: String,
    pub phone_number: String,
    pub birth_date: NaiveDate,
    pub password: String,
}

#[derive(Debug)]
pub struct RegistrationOutcome {
    pub account: PublicAccount,
    /// Raw secrets echoed back in relaxed mode only, so local clients can
    /// complete verification without a delivery channel.
    pub issued: Option<IssuedChallenges>,
}

pub async fn register<S, N>(
    store: &S,
    dispatcher: &N,
    base_url: &str,
    mode: SecurityMode,
    registration: &NewRegistration,
    meta: &RequestMeta,
) -> Result<RegistrationOutcome, AppError>
where
    S: CredentialStore,
    N: NotificationDispatcher,
{
    let handle = validators::is_valid_handle(&registration.handle)?;
    let email = validators::is_valid_email(&registration.email)?;
    let phone = validators::is_valid_phone(&registration.phone_number)?;
    validators::is_at_least_minimum_age(registration.birth_date, meta.now.date_naive())?;

    // Three independent existence checks, each with its own signal.
    if store.email_exists(&email).await? {
        return Err(AppError::Flow(AuthFlowError::DuplicateField(AccountField::Email)));
    }
    if store.handle_exists(&handle).await? {
        return Err(AppError::Flow(AuthFlowError::DuplicateField(AccountField::Handle)));
    }
    if store.phone_exists(&phone).await? {
        return Err(AppError::Flow(AuthFlowError::DuplicateField(AccountField::Phone)));
    }

    let password_hash = password::hash_password(&registration.password)?;

    let email_token = opaque::generate_opaque_token();
    let sms_code = opaque::generate_numeric_code(6);

    let account = Account {
        id: Uuid::new_v4(),
        handle,
        email,
        phone_number: Some(phone.clone()),
        birth_date: registration.birth_date,
        password_hash: password_hash.clone(),
        failed_login_count: 0,
        locked_until: None,
        is_email_verified: false,
        is_phone_verified: false,
        email_verification: Some(StoredSecret::issue(
            &email_token,
            SecretPurpose::EmailVerify,
            meta.now,
        )),
        sms_verification: Some(StoredSecret::issue(
            &sms_code,
            SecretPurpose::SmsVerify,
            meta.now,
        )),
        login_step_up: None,
        last_login_ip: None,
        last_login_at: None,
        delete_requested_at: None,
        deleted_at: None,
        created_at: meta.now,
    };

    store.insert_account(&account).await?;
    store
        .insert_history(&PasswordHistoryEntry::new(account.id, password_hash, meta.now))
        .await?;

    let (subject, html) = notify::verification_email(base_url, &email_token);
    notify::send_email_best_effort(dispatcher, &account.email, &subject, &html).await;
    notify::send_sms_best_effort(dispatcher, &phone, &notify::verification_sms(&sms_code)).await;

    tracing::info!(account_id = %account.id, "Account registered, verification pending");

    let issued = match mode {
        SecurityMode::Relaxed => Some(IssuedChallenges {
            link_token: email_token,
            sms_code,
        }),
        SecurityMode::Hardened => None,
    };

    Ok(RegistrationOutcome {
        account: PublicAccount::from(&account),
        issued,
    })
}

/// Confirms the email channel. Consumes only the email secret and sets
/// only the email flag; the SMS channel is untouched.
pub async fn verify_email<S: CredentialStore>(
    store: &S,
    token: &str,
    meta: &RequestMeta,
) -> Result<(), AppError> {
    let hash = opaque::hash_secret(token);
    let account = store
        .find_by_email_verification(&hash)
        .await?
        .ok_or(AppError::Flow(AuthFlowError::SecretMismatch))?;

    let secret = account
        .email_verification
        .as_ref()
        .ok_or(AppError::Flow(AuthFlowError::SecretMismatch))?;

    if secret.is_expired(meta.now) {
        return Err(AppError::Flow(AuthFlowError::SecretExpired));
    }

    store.mark_email_verified(account.id).await?;
    tracing::info!(account_id = %account.id, "Email verified");
    Ok(())
}

/// Confirms the SMS channel for the named handle. A consumed or unknown
/// code is a mismatch; expiry is reported separately.
pub async fn verify_sms<S: CredentialStore>(
    store: &S,
    handle: &str,
    code: &str,
    meta: &RequestMeta,
) -> Result<(), AppError> {
    let account = store
        .find_by_handle(handle)
        .await?
        .ok_or(AppError::Flow(AuthFlowError::SecretMismatch))?;

    let secret = account
        .sms_verification
        .as_ref()
        .ok_or(AppError::Flow(AuthFlowError::SecretMismatch))?;

    if !secret.matches(code) {
        return Err(AppError::Flow(AuthFlowError::SecretMismatch));
    }

    if secret.is_expired(meta.now) {
        return Err(AppError::Flow(AuthFlowError::SecretExpired));
    }

    store.mark_phone_verified(account.id).await?;
    tracing::info!(account_id = %account.id, "Phone verified");
    Ok(())
}
