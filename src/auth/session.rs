/// Session issuance and lifecycle.
///
/// A session is an access/refresh JWT pair bound to the account identity.
/// Only the refresh token's hash is persisted, together with the request
/// origin for audit. Issuing a session is what stamps
/// `last_login_ip`/`last_login_at`, which is exactly what the step-up
/// engine compares against on the next login.
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::{jwt, opaque};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthFlowError};
use crate::model::{Account, PublicAccount, RequestMeta, Session};
use crate::store::CredentialStore;

#[derive(Debug, Clone)]
pub struct GrantedSession {
    pub account: PublicAccount,
    pub access_token: String,
    pub refresh_token: String,
}

/// Mint a token pair, persist the session record, and stamp the
/// last-login origin. Concurrent sessions per account are legal; nothing
/// here invalidates earlier ones.
pub async fn issue<S: CredentialStore>(
    store: &S,
    jwt_config: &JwtSettings,
    account: &Account,
    meta: &RequestMeta,
) -> Result<GrantedSession, AppError> {
    let (access_token, refresh_token, session) = mint(jwt_config, account, meta)?;

    store.insert_session(&session).await?;
    store
        .record_login_success(account.id, &meta.ip_address, meta.now)
        .await?;

    tracing::info!(account_id = %account.id, "Session issued");

    Ok(GrantedSession {
        account: PublicAccount::from(account),
        access_token,
        refresh_token,
    })
}

/// Rotate a refresh token: the old session is revoked, a new pair is
/// issued. Deliberately does not touch the last-login origin, so a
/// refresh from a new network address cannot bypass step-up on the next
/// password login.
pub async fn refresh<S: CredentialStore>(
    store: &S,
    jwt_config: &JwtSettings,
    refresh_token: &str,
    meta: &RequestMeta,
) -> Result<GrantedSession, AppError> {
    let token_hash = opaque::hash_secret(refresh_token);

    let session = store
        .find_session(&token_hash)
        .await?
        .ok_or(AppError::Flow(AuthFlowError::SessionInvalid))?;

    if session.revoked_at.is_some() {
        tracing::warn!(account_id = %session.account_id, "Attempt to use revoked refresh token");
        return Err(AppError::Flow(AuthFlowError::SessionInvalid));
    }

    if session.is_expired(meta.now) {
        return Err(AppError::Flow(AuthFlowError::SessionExpired));
    }

    // The stored hash matching is not enough; the token must still carry
    // a valid signature for this issuer.
    jwt::validate_token(refresh_token, jwt_config)
        .map_err(|_| AppError::Flow(AuthFlowError::SessionInvalid))?;

    let account = store
        .find_by_id(session.account_id)
        .await?
        .ok_or(AppError::Flow(AuthFlowError::SessionInvalid))?;

    store.revoke_session(&token_hash, meta.now).await?;

    let (access_token, new_refresh_token, new_session) = mint(jwt_config, &account, meta)?;
    store.insert_session(&new_session).await?;

    tracing::info!(account_id = %account.id, "Refresh token rotated");

    Ok(GrantedSession {
        account: PublicAccount::from(&account),
        access_token,
        refresh_token: new_refresh_token,
    })
}

/// Revoke a single session by its raw refresh token. Idempotent: an
/// unknown or already-revoked token is not an error.
pub async fn logout<S: CredentialStore>(
    store: &S,
    refresh_token: &str,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let token_hash = opaque::hash_secret(refresh_token);
    store.revoke_session(&token_hash, now).await
}

/// Revoke every active session for an account.
pub async fn logout_all<S: CredentialStore>(
    store: &S,
    account_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    store.revoke_all_sessions(account_id, now).await?;
    tracing::info!(account_id = %account_id, "All sessions revoked");
    Ok(())
}

fn mint(
    jwt_config: &JwtSettings,
    account: &Account,
    meta: &RequestMeta,
) -> Result<(String, String, Session), AppError> {
    let access_token = jwt::generate_access_token(
        &account.id,
        &account.email,
        &account.handle,
        jwt_config,
        meta.now,
    )?;
    let refresh_token = jwt::generate_refresh_token(
        &account.id,
        &account.email,
        &account.handle,
        jwt_config,
        meta.now,
    )?;

    let session = Session::new(
        account.id,
        opaque::hash_secret(&refresh_token),
        jwt_config.refresh_token_expiry,
        meta,
    );

    Ok((access_token, refresh_token, session))
}
