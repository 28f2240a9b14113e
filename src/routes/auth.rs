/// Authentication Routes
///
/// Registration, login, step-up completion, current account info, and
/// deactivation. Handlers stay thin: they parse the request, build the
/// request metadata, and delegate to the authentication core.
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::auth::{self, login, registration, Claims, Credentials, LoginOutcome, NewRegistration};
use crate::configuration::{ApplicationSettings, JwtSettings};
use crate::error::{AppError, ErrorContext};
use crate::model::{IssuedChallenges, PublicAccount, RequestMeta};
use crate::notify::HttpNotificationClient;
use crate::security::require_https;
use crate::store::{CredentialStore, PgCredentialStore};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub handle: String,
    pub email: String,
    pub phone_number: String,
    pub birth_date: NaiveDate,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct StepUpRequest {
    pub identifier: String,
    pub password: String,
    pub sms_code: String,
}

#[derive(Deserialize)]
pub struct DeactivateRequest {
    pub handle: String,
    pub password: String,
}

/// Token pair response for a completed authentication.
#[derive(Serialize)]
pub struct SessionResponse {
    pub account: PublicAccount,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Registration response. `issued` carries the raw verification secrets
/// in relaxed mode only.
#[derive(Serialize)]
pub struct RegisterResponse {
    pub account: PublicAccount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued: Option<IssuedChallenges>,
}

impl SessionResponse {
    fn new(granted: auth::GrantedSession, jwt_config: &JwtSettings) -> Self {
        Self {
            account: granted.account,
            access_token: granted.access_token,
            refresh_token: granted.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: jwt_config.access_token_expiry,
        }
    }
}

/// POST /auth/register
///
/// Create an account and dispatch verification secrets on both channels.
///
/// # Errors
/// - 400: Validation errors (handle/email/phone format, age, password policy)
/// - 409: Handle, email, or phone already registered
/// - 500: Internal server error
pub async fn register(
    req: HttpRequest,
    form: web::Json<RegisterRequest>,
    store: web::Data<PgCredentialStore>,
    dispatcher: web::Data<HttpNotificationClient>,
    app: web::Data<ApplicationSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("account_registration");
    require_https(&req, app.security_mode)?;
    let meta = RequestMeta::from_request(&req);

    let outcome = registration::register(
        store.get_ref(),
        dispatcher.get_ref(),
        &app.base_url,
        app.security_mode,
        &NewRegistration {
            handle: form.handle.clone(),
            email: form.email.clone(),
            phone_number: form.phone_number.clone(),
            birth_date: form.birth_date,
            password: form.password.clone(),
        },
        &meta,
    )
    .await?;

    tracing::info!(
        request_id = %context.request_id,
        account_id = %outcome.account.id,
        "Account registered"
    );

    Ok(HttpResponse::Created().json(RegisterResponse {
        account: outcome.account,
        issued: outcome.issued,
    }))
}

/// POST /auth/login
///
/// Authenticate with handle-or-email plus password. Either returns a
/// token pair directly, or parks the login behind step-up when the
/// request comes from an unfamiliar network origin.
///
/// # Errors
/// - 401: Invalid credentials
/// - 403: Unverified channels, deactivation, or step-up unavailable
/// - 404: No such account
/// - 423: Account locked
pub async fn login(
    req: HttpRequest,
    form: web::Json<LoginRequest>,
    store: web::Data<PgCredentialStore>,
    dispatcher: web::Data<HttpNotificationClient>,
    jwt_config: web::Data<JwtSettings>,
    app: web::Data<ApplicationSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("account_login");
    require_https(&req, app.security_mode)?;
    let meta = RequestMeta::from_request(&req);

    let outcome = login::login(
        store.get_ref(),
        dispatcher.get_ref(),
        jwt_config.get_ref(),
        app.security_mode,
        &Credentials {
            identifier: form.identifier.clone(),
            password: form.password.clone(),
        },
        &meta,
    )
    .await?;

    match outcome {
        LoginOutcome::Granted(granted) => {
            tracing::info!(
                request_id = %context.request_id,
                account_id = %granted.account.id,
                "Login succeeded"
            );
            Ok(HttpResponse::Ok().json(SessionResponse::new(granted, jwt_config.get_ref())))
        }
        LoginOutcome::StepUpRequired => {
            tracing::info!(request_id = %context.request_id, "Step-up challenge issued");
            Ok(HttpResponse::Forbidden().json(serde_json::json!({
                "error": "Additional verification required",
                "code": "STEP_UP_REQUIRED",
                "requires_sms": true
            })))
        }
    }
}

/// POST /auth/login/step-up
///
/// Complete a parked login with the SMS code. Credentials must be
/// re-submitted and are verified again.
pub async fn step_up(
    req: HttpRequest,
    form: web::Json<StepUpRequest>,
    store: web::Data<PgCredentialStore>,
    jwt_config: web::Data<JwtSettings>,
    app: web::Data<ApplicationSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("step_up_verification");
    require_https(&req, app.security_mode)?;
    let meta = RequestMeta::from_request(&req);

    let granted = login::verify_step_up(
        store.get_ref(),
        jwt_config.get_ref(),
        &Credentials {
            identifier: form.identifier.clone(),
            password: form.password.clone(),
        },
        &form.sms_code,
        &meta,
    )
    .await?;

    tracing::info!(
        request_id = %context.request_id,
        account_id = %granted.account.id,
        "Step-up login completed"
    );

    Ok(HttpResponse::Ok().json(SessionResponse::new(granted, jwt_config.get_ref())))
}

/// GET /account/me
///
/// Current account information. Claims are injected by the bearer guard.
pub async fn me(
    claims: web::ReqData<Claims>,
    store: web::Data<PgCredentialStore>,
) -> Result<HttpResponse, AppError> {
    let account_id = claims.account_id()?;

    let account = store
        .get_ref()
        .find_by_id(account_id)
        .await?
        .ok_or(AppError::Flow(crate::error::AuthFlowError::NotFound))?;

    Ok(HttpResponse::Ok().json(PublicAccount::from(&account)))
}

/// DELETE /account
///
/// Request deactivation. The handle and password must be re-stated even
/// though the route is behind the bearer guard; every session is revoked
/// and the account is deleted after the grace window.
pub async fn deactivate(
    req: HttpRequest,
    claims: web::ReqData<Claims>,
    form: web::Json<DeactivateRequest>,
    store: web::Data<PgCredentialStore>,
    app: web::Data<ApplicationSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("account_deactivation");
    require_https(&req, app.security_mode)?;
    let meta = RequestMeta::from_request(&req);
    let account_id = claims.account_id()?;

    auth::account::request_deactivation(
        store.get_ref(),
        account_id,
        &form.handle,
        &form.password,
        &meta,
    )
    .await?;

    tracing::info!(
        request_id = %context.request_id,
        account_id = %account_id,
        "Account deactivation scheduled"
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Account scheduled for deletion"
    })))
}
