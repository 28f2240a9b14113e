/// Verification Routes
///
/// Confirmation of the email and SMS channels opened at registration.
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::auth::registration;
use crate::error::AppError;
use crate::model::RequestMeta;
use crate::store::PgCredentialStore;

#[derive(Deserialize)]
pub struct VerifyEmailQuery {
    pub token: String,
}

#[derive(Deserialize)]
pub struct VerifySmsRequest {
    pub handle: String,
    pub code: String,
}

/// GET /auth/verify-email?token=...
///
/// Confirm the email channel with the opaque link token.
///
/// # Errors
/// - 400: Unknown or expired token
pub async fn verify_email(
    req: HttpRequest,
    query: web::Query<VerifyEmailQuery>,
    store: web::Data<PgCredentialStore>,
) -> Result<HttpResponse, AppError> {
    let meta = RequestMeta::from_request(&req);
    registration::verify_email(store.get_ref(), &query.token, &meta).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Email verified"
    })))
}

/// POST /auth/verify-sms
///
/// Confirm the SMS channel with the 6-digit code.
///
/// # Errors
/// - 400: Wrong or expired code
pub async fn verify_sms(
    req: HttpRequest,
    form: web::Json<VerifySmsRequest>,
    store: web::Data<PgCredentialStore>,
) -> Result<HttpResponse, AppError> {
    let meta = RequestMeta::from_request(&req);
    registration::verify_sms(store.get_ref(), &form.handle, &form.code, &meta).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Phone verified"
    })))
}
