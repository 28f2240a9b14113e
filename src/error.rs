/// Unified error handling for the authentication service.
///
/// Domain-specific enums are kept separate (validation, auth flow,
/// database, notification) and converge on a single `AppError` used for
/// control flow. `AppError` maps onto HTTP responses via
/// `actix_web::ResponseError` and onto structured logs via `log_error`.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// Input validation failures
#[derive(Debug, Clone)]
pub enum ValidationError {
    EmptyField(String),
    TooShort(String, usize),
    TooLong(String, usize),
    InvalidFormat(String),
    UnderMinimumAge(u8),
    InsecureTransport,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
            ValidationError::UnderMinimumAge(min) => {
                write!(f, "registration requires a minimum age of {}", min)
            }
            ValidationError::InsecureTransport => write!(f, "HTTPS is required"),
        }
    }
}

impl StdError for ValidationError {}

/// Account field that collided on registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountField {
    Email,
    Handle,
    Phone,
}

impl fmt::Display for AccountField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountField::Email => write!(f, "email"),
            AccountField::Handle => write!(f, "handle"),
            AccountField::Phone => write!(f, "phone number"),
        }
    }
}

/// Typed outcomes of the authentication state machines.
///
/// Every failure a caller can act on is a distinct variant; none of them
/// reveal which stored hash a comparison failed against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFlowError {
    /// No account matches the supplied identifier.
    NotFound,
    /// The lockout window is still active.
    AccountLocked { until: chrono::DateTime<chrono::Utc> },
    /// Soft-deleted and past the recovery grace window.
    AccountDeactivated,
    /// Deactivation requested, still within the 30-day grace window.
    DeactivationPending,
    /// Wrong password. Recording the failed attempt is the caller's duty.
    InvalidCredential,
    /// Hardened mode requires both verification flags before login.
    VerificationRequired,
    /// A second factor is pending; credentials must be re-submitted with it.
    StepUpRequired,
    /// Step-up is needed but the account has no phone number on file.
    StepUpUnavailable,
    StepUpExpired,
    StepUpMismatch,
    SecretExpired,
    SecretMismatch,
    SecretAlreadyUsed,
    PasswordPolicyViolation(&'static str),
    /// New password matches one of the recent history entries.
    PasswordReused,
    DuplicateField(AccountField),
    /// Refresh token not recognized or already rotated out.
    SessionInvalid,
    SessionExpired,
}

impl fmt::Display for AuthFlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthFlowError::NotFound => write!(f, "account not found"),
            AuthFlowError::AccountLocked { until } => {
                write!(f, "account is locked until {}", until.to_rfc3339())
            }
            AuthFlowError::AccountDeactivated => write!(f, "account has been deactivated"),
            AuthFlowError::DeactivationPending => {
                write!(f, "account deactivation is pending; recovery is possible for 30 days")
            }
            AuthFlowError::InvalidCredential => write!(f, "invalid credentials"),
            AuthFlowError::VerificationRequired => {
                write!(f, "email and phone verification must be completed")
            }
            AuthFlowError::StepUpRequired => write!(f, "additional SMS verification is required"),
            AuthFlowError::StepUpUnavailable => {
                write!(f, "no phone number is registered for SMS verification")
            }
            AuthFlowError::StepUpExpired => write!(f, "the SMS verification code has expired"),
            AuthFlowError::StepUpMismatch => write!(f, "the SMS verification code is incorrect"),
            AuthFlowError::SecretExpired => write!(f, "the verification secret has expired"),
            AuthFlowError::SecretMismatch => write!(f, "the verification secret is invalid"),
            AuthFlowError::SecretAlreadyUsed => {
                write!(f, "the verification secret has already been used")
            }
            AuthFlowError::PasswordPolicyViolation(reason) => {
                write!(f, "password policy violation: {}", reason)
            }
            AuthFlowError::PasswordReused => {
                write!(f, "the new password matches a recently used password")
            }
            AuthFlowError::DuplicateField(field) => {
                write!(f, "this {} is already registered", field)
            }
            AuthFlowError::SessionInvalid => write!(f, "refresh token is invalid or revoked"),
            AuthFlowError::SessionExpired => write!(f, "refresh token has expired"),
        }
    }
}

impl StdError for AuthFlowError {}

impl AuthFlowError {
    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            AuthFlowError::NotFound => "NOT_FOUND",
            AuthFlowError::AccountLocked { .. } => "ACCOUNT_LOCKED",
            AuthFlowError::AccountDeactivated => "ACCOUNT_DEACTIVATED",
            AuthFlowError::DeactivationPending => "DEACTIVATION_PENDING",
            AuthFlowError::InvalidCredential => "INVALID_CREDENTIAL",
            AuthFlowError::VerificationRequired => "VERIFICATION_REQUIRED",
            AuthFlowError::StepUpRequired => "STEP_UP_REQUIRED",
            AuthFlowError::StepUpUnavailable => "STEP_UP_UNAVAILABLE",
            AuthFlowError::StepUpExpired => "STEP_UP_EXPIRED",
            AuthFlowError::StepUpMismatch => "STEP_UP_MISMATCH",
            AuthFlowError::SecretExpired => "SECRET_EXPIRED",
            AuthFlowError::SecretMismatch => "SECRET_MISMATCH",
            AuthFlowError::SecretAlreadyUsed => "SECRET_ALREADY_USED",
            AuthFlowError::PasswordPolicyViolation(_) => "PASSWORD_POLICY_VIOLATION",
            AuthFlowError::PasswordReused => "PASSWORD_REUSED",
            AuthFlowError::DuplicateField(_) => "DUPLICATE_FIELD",
            AuthFlowError::SessionInvalid => "SESSION_INVALID",
            AuthFlowError::SessionExpired => "SESSION_EXPIRED",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AuthFlowError::NotFound => StatusCode::NOT_FOUND,
            AuthFlowError::AccountLocked { .. } => StatusCode::LOCKED,
            AuthFlowError::AccountDeactivated
            | AuthFlowError::DeactivationPending
            | AuthFlowError::VerificationRequired
            | AuthFlowError::StepUpRequired => StatusCode::FORBIDDEN,
            AuthFlowError::InvalidCredential
            | AuthFlowError::SessionInvalid
            | AuthFlowError::SessionExpired => StatusCode::UNAUTHORIZED,
            AuthFlowError::DuplicateField(_) => StatusCode::CONFLICT,
            AuthFlowError::StepUpUnavailable
            | AuthFlowError::StepUpExpired
            | AuthFlowError::StepUpMismatch
            | AuthFlowError::SecretExpired
            | AuthFlowError::SecretMismatch
            | AuthFlowError::SecretAlreadyUsed
            | AuthFlowError::PasswordPolicyViolation(_)
            | AuthFlowError::PasswordReused => StatusCode::BAD_REQUEST,
        }
    }
}

/// Database operation errors
#[derive(Debug)]
pub enum DatabaseError {
    UniqueConstraintViolation(String),
    NotFound(String),
    QueryExecution(String),
    ConnectionPool(String),
    UnexpectedError(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::UniqueConstraintViolation(msg) => {
                write!(f, "Duplicate entry: {}", msg)
            }
            DatabaseError::NotFound(msg) => write!(f, "Not found: {}", msg),
            DatabaseError::QueryExecution(msg) => write!(f, "Query error: {}", msg),
            DatabaseError::ConnectionPool(msg) => write!(f, "Database connection error: {}", msg),
            DatabaseError::UnexpectedError(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl StdError for DatabaseError {}

/// Email/SMS delivery errors. These are recovered locally (logged) by the
/// flows that dispatch notifications and never convert a successful state
/// change into a failure.
#[derive(Debug, Clone)]
pub enum NotificationError {
    SendFailed(String),
    ServiceUnavailable(String),
}

impl fmt::Display for NotificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationError::SendFailed(msg) => write!(f, "Failed to send notification: {}", msg),
            NotificationError::ServiceUnavailable(msg) => {
                write!(f, "Notification service unavailable: {}", msg)
            }
        }
    }
}

impl StdError for NotificationError {}

/// Central error type that all application errors map to
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Flow(AuthFlowError),
    Database(DatabaseError),
    Notification(NotificationError),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Flow(e) => write!(f, "{}", e),
            AppError::Database(e) => write!(f, "{}", e),
            AppError::Notification(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<AuthFlowError> for AppError {
    fn from(err: AuthFlowError) -> Self {
        AppError::Flow(err)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Database(err)
    }
}

impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        AppError::Notification(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let error_msg = err.to_string();

        if error_msg.contains("duplicate key") || error_msg.contains("unique constraint") {
            AppError::Database(DatabaseError::UniqueConstraintViolation(
                "record already exists".to_string(),
            ))
        } else if error_msg.contains("no rows") {
            AppError::Database(DatabaseError::NotFound("Record not found".to_string()))
        } else if error_msg.contains("pool") || error_msg.contains("connect") {
            AppError::Database(DatabaseError::ConnectionPool(error_msg))
        } else {
            AppError::Database(DatabaseError::UnexpectedError(error_msg))
        }
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Internal(msg)
    }
}

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking (request ID or trace ID)
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl AppError {
    fn response_parts(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code, message) = match self {
            AppError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR".to_string(),
                e.to_string(),
            ),

            AppError::Flow(e) => (e.status(), e.code().to_string(), e.to_string()),

            AppError::Database(e) => match e {
                DatabaseError::UniqueConstraintViolation(_) => (
                    StatusCode::CONFLICT,
                    "DUPLICATE_ENTRY".to_string(),
                    e.to_string(),
                ),
                DatabaseError::NotFound(_) => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND".to_string(),
                    e.to_string(),
                ),
                DatabaseError::ConnectionPool(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE".to_string(),
                    "Database service temporarily unavailable".to_string(),
                ),
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR".to_string(),
                    "Database error occurred".to_string(),
                ),
            },

            AppError::Notification(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "NOTIFICATION_SERVICE_ERROR".to_string(),
                "Notification service temporarily unavailable".to_string(),
            ),

            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR".to_string(),
                "Internal server error".to_string(),
            ),
        };

        let error_response =
            ErrorResponse::new(request_id.to_string(), message, code, status.as_u16());

        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Validation error");
            }
            AppError::Flow(e) => match e {
                AuthFlowError::InvalidCredential => {
                    tracing::warn!(request_id = request_id, "Invalid credentials attempt");
                }
                AuthFlowError::AccountLocked { until } => {
                    tracing::warn!(
                        request_id = request_id,
                        locked_until = %until.to_rfc3339(),
                        "Login attempt against locked account"
                    );
                }
                _ => {
                    tracing::warn!(
                        request_id = request_id,
                        code = e.code(),
                        error = %e,
                        "Authentication flow rejected"
                    );
                }
            },
            AppError::Database(e) => {
                tracing::error!(request_id = request_id, error = %e, "Database error");
            }
            AppError::Notification(e) => {
                tracing::error!(request_id = request_id, error = %e, "Notification service error");
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, error_response) = self.response_parts(&request_id);

        HttpResponse::build(status).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Flow(e) => e.status(),
            AppError::Database(e) => match e {
                DatabaseError::UniqueConstraintViolation(_) => StatusCode::CONFLICT,
                DatabaseError::NotFound(_) => StatusCode::NOT_FOUND,
                DatabaseError::ConnectionPool(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Notification(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error context for enhanced logging and debugging
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub operation: String,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            operation: operation.into(),
        }
    }
}
