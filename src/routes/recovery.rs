/// Recovery Routes
///
/// Password reset with dual secrets and masked-email lookup.
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::auth::{account, reset};
use crate::configuration::ApplicationSettings;
use crate::error::{AppError, ErrorContext};
use crate::model::RequestMeta;
use crate::notify::HttpNotificationClient;
use crate::security::require_https;
use crate::store::PgCredentialStore;

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub sms_code: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct ForgotEmailRequest {
    pub phone_number: String,
    pub birth_date: NaiveDate,
}

/// POST /auth/forgot-password
///
/// Open a reset request and dispatch the link token by email and the
/// code by SMS. Delivery failures are logged, not surfaced. In relaxed
/// mode the raw secrets are echoed back under `issued`.
///
/// # Errors
/// - 404: No account behind the email
pub async fn forgot_password(
    req: HttpRequest,
    form: web::Json<ForgotPasswordRequest>,
    store: web::Data<PgCredentialStore>,
    dispatcher: web::Data<HttpNotificationClient>,
    app: web::Data<ApplicationSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("password_reset_request");
    require_https(&req, app.security_mode)?;
    let meta = RequestMeta::from_request(&req);

    let issued = reset::request_reset(
        store.get_ref(),
        dispatcher.get_ref(),
        &app.base_url,
        app.security_mode,
        &form.email,
        &meta,
    )
    .await?;

    tracing::info!(request_id = %context.request_id, "Password reset requested");

    let body = match issued {
        Some(issued) => serde_json::json!({
            "message": "Reset instructions sent",
            "issued": issued
        }),
        None => serde_json::json!({
            "message": "Reset instructions sent"
        }),
    };
    Ok(HttpResponse::Ok().json(body))
}

/// POST /auth/reset-password
///
/// Complete a reset: both secrets must match one unused, unexpired
/// request, and the new password must clear the policy and the recent
/// history window.
///
/// # Errors
/// - 400: Secret mismatch, expiry, replay, policy or reuse violation
pub async fn reset_password(
    req: HttpRequest,
    form: web::Json<ResetPasswordRequest>,
    store: web::Data<PgCredentialStore>,
    app: web::Data<ApplicationSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("password_reset");
    require_https(&req, app.security_mode)?;
    let meta = RequestMeta::from_request(&req);

    reset::reset_password(
        store.get_ref(),
        &form.token,
        &form.sms_code,
        &form.new_password,
        &meta,
    )
    .await?;

    tracing::info!(request_id = %context.request_id, "Password reset completed");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Password updated"
    })))
}

/// POST /auth/forgot-email
///
/// Recover a forgotten email by phone number and birth date. Returns
/// the address with its local part mostly masked.
///
/// # Errors
/// - 404: No account matches the pair
pub async fn forgot_email(
    form: web::Json<ForgotEmailRequest>,
    store: web::Data<PgCredentialStore>,
) -> Result<HttpResponse, AppError> {
    let masked =
        account::recover_email(store.get_ref(), &form.phone_number, form.birth_date).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "email": masked
    })))
}
