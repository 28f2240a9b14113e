/// Session Routes
///
/// Refresh token rotation and session revocation.
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::auth::{session, Claims};
use crate::configuration::JwtSettings;
use crate::error::{AppError, ErrorContext};
use crate::model::{PublicAccount, RequestMeta};
use crate::store::PgCredentialStore;

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

#[derive(serde::Serialize)]
pub struct RefreshResponse {
    pub account: PublicAccount,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// POST /auth/refresh
///
/// Rotate a refresh token: the presented token's session is revoked and
/// a new pair is issued. A token that has already been rotated is
/// rejected, which surfaces replay of stolen tokens.
///
/// # Errors
/// - 401: Unknown, revoked, expired, or badly signed refresh token
pub async fn refresh(
    req: HttpRequest,
    form: web::Json<RefreshRequest>,
    store: web::Data<PgCredentialStore>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");
    let meta = RequestMeta::from_request(&req);

    let granted = session::refresh(
        store.get_ref(),
        jwt_config.get_ref(),
        &form.refresh_token,
        &meta,
    )
    .await?;

    tracing::info!(
        request_id = %context.request_id,
        account_id = %granted.account.id,
        "Refresh token rotated"
    );

    Ok(HttpResponse::Ok().json(RefreshResponse {
        account: granted.account,
        access_token: granted.access_token,
        refresh_token: granted.refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: jwt_config.access_token_expiry,
    }))
}

/// POST /auth/logout
///
/// Revoke the session behind the presented refresh token. Idempotent:
/// an unknown token still returns 200.
pub async fn logout(
    req: HttpRequest,
    form: web::Json<LogoutRequest>,
    store: web::Data<PgCredentialStore>,
) -> Result<HttpResponse, AppError> {
    let meta = RequestMeta::from_request(&req);
    session::logout(store.get_ref(), &form.refresh_token, meta.now).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Logged out"
    })))
}

/// POST /account/logout-all
///
/// Revoke every session for the authenticated account.
pub async fn logout_all(
    req: HttpRequest,
    claims: web::ReqData<Claims>,
    store: web::Data<PgCredentialStore>,
) -> Result<HttpResponse, AppError> {
    let meta = RequestMeta::from_request(&req);
    let account_id = claims.account_id()?;

    session::logout_all(store.get_ref(), account_id, meta.now).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "All sessions revoked"
    })))
}
