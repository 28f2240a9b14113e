/// Login orchestration: lockout gate, credential verification, and the
/// step-up MFA engine.
///
/// A login either completes directly or parks in `StepUpRequired`, where
/// the caller must re-submit credentials plus the SMS code through
/// `verify_step_up`. Step-up is a heuristic substitute for device trust:
/// a password success from a network origin that differs from the last
/// successful login demands a second factor.
use crate::auth::{lockout, opaque, password, session};
use crate::auth::session::GrantedSession;
use crate::configuration::{JwtSettings, SecurityMode};
use crate::error::{AppError, AuthFlowError};
use crate::model::{Account, RequestMeta};
use crate::notify::{self, NotificationDispatcher};
use crate::secret::{SecretPurpose, StoredSecret};
use crate::store::CredentialStore;

#[derive(Debug, Clone)]
pub struct Credentials {
    /// Email when it contains `@`, handle otherwise.
    pub identifier: String,
    pub password: String,
}

#[derive(Debug)]
pub enum LoginOutcome {
    Granted(GrantedSession),
    /// Not a hard failure: a code was dispatched and the caller must
    /// come back through `verify_step_up`. Carries no secret material.
    StepUpRequired,
}

pub async fn login<S, N>(
    store: &S,
    dispatcher: &N,
    jwt_config: &JwtSettings,
    mode: SecurityMode,
    credentials: &Credentials,
    meta: &RequestMeta,
) -> Result<LoginOutcome, AppError>
where
    S: CredentialStore,
    N: NotificationDispatcher,
{
    let account = store
        .find_by_identifier(&credentials.identifier)
        .await?
        .ok_or(AppError::Flow(AuthFlowError::NotFound))?;

    check_deactivation(&account, meta)?;
    lockout::check_lock(&account, meta.now)?;

    if !password::verify_password(&credentials.password, &account.password_hash)? {
        let outcome = store.record_login_failure(account.id, meta.now).await?;
        if outcome.locked() {
            tracing::warn!(account_id = %account.id, "Account locked after repeated failures");
        }
        return Err(AppError::Flow(AuthFlowError::InvalidCredential));
    }

    if mode.is_hardened() && !(account.is_email_verified && account.is_phone_verified) {
        return Err(AppError::Flow(AuthFlowError::VerificationRequired));
    }

    if mode.is_hardened() && needs_step_up(&account, &meta.ip_address) {
        begin_step_up(store, dispatcher, &account, meta).await?;
        return Ok(LoginOutcome::StepUpRequired);
    }

    let granted = session::issue(store, jwt_config, &account, meta).await?;
    Ok(LoginOutcome::Granted(granted))
}

/// Completes a parked step-up login. The password is verified again so a
/// stolen login-in-progress cannot be finished by guessing codes alone.
pub async fn verify_step_up<S: CredentialStore>(
    store: &S,
    jwt_config: &JwtSettings,
    credentials: &Credentials,
    sms_code: &str,
    meta: &RequestMeta,
) -> Result<GrantedSession, AppError> {
    let account = store
        .find_by_identifier(&credentials.identifier)
        .await?
        .ok_or(AppError::Flow(AuthFlowError::NotFound))?;

    check_deactivation(&account, meta)?;

    if !password::verify_password(&credentials.password, &account.password_hash)? {
        return Err(AppError::Flow(AuthFlowError::InvalidCredential));
    }

    let pending = account
        .login_step_up
        .as_ref()
        .ok_or(AppError::Flow(AuthFlowError::StepUpRequired))?;

    if pending.is_expired(meta.now) {
        return Err(AppError::Flow(AuthFlowError::StepUpExpired));
    }

    if !pending.matches(sms_code) {
        return Err(AppError::Flow(AuthFlowError::StepUpMismatch));
    }

    // Issuing the session clears the step-up secret and stamps the new
    // origin, so a replay of the same code hits the absent-secret path.
    session::issue(store, jwt_config, &account, meta).await
}

fn needs_step_up(account: &Account, current_ip: &str) -> bool {
    match account.last_login_ip.as_deref() {
        Some(last) => !last.is_empty() && !current_ip.is_empty() && last != current_ip,
        None => false,
    }
}

async fn begin_step_up<S, N>(
    store: &S,
    dispatcher: &N,
    account: &Account,
    meta: &RequestMeta,
) -> Result<(), AppError>
where
    S: CredentialStore,
    N: NotificationDispatcher,
{
    let code = opaque::generate_numeric_code(6);
    let secret = StoredSecret::issue(&code, SecretPurpose::LoginStepUp, meta.now);
    store.store_step_up_secret(account.id, &secret).await?;

    let phone = account
        .phone_number
        .as_deref()
        .ok_or(AppError::Flow(AuthFlowError::StepUpUnavailable))?;

    notify::send_sms_best_effort(dispatcher, phone, &notify::step_up_sms(&code)).await;

    tracing::info!(account_id = %account.id, "Step-up challenge dispatched for new origin");
    Ok(())
}

fn check_deactivation(account: &Account, meta: &RequestMeta) -> Result<(), AppError> {
    if let Some(deleted_at) = account.deleted_at {
        if deleted_at <= meta.now {
            return Err(AppError::Flow(AuthFlowError::AccountDeactivated));
        }
        if account.delete_requested_at.is_some() {
            return Err(AppError::Flow(AuthFlowError::DeactivationPending));
        }
    }
    Ok(())
}
