/// Password Hashing and Verification
///
/// Handles password hashing with bcrypt and password policy validation.
/// This is the slow-hash path; opaque tokens and codes go through
/// `auth::opaque` instead.
use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::{AppError, AuthFlowError};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Hash a password using bcrypt
///
/// # Errors
/// Returns `PasswordPolicyViolation` if the password fails policy, or an
/// internal error if bcrypt itself fails.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    validate_password_policy(password)?;

    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its hash.
///
/// Never short-circuits on length or format; the supplied value always
/// goes through the bcrypt comparison.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    verify(password, hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
}

/// Validate password policy requirements
///
/// Requirements:
/// - Minimum 8 characters
/// - Maximum 128 characters
/// - At least one digit
/// - At least one lowercase letter
/// - At least one uppercase letter
pub fn validate_password_policy(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Flow(AuthFlowError::PasswordPolicyViolation(
            "must be at least 8 characters",
        )));
    }

    // Max length bounds bcrypt input and prevents hashing abuse
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AppError::Flow(AuthFlowError::PasswordPolicyViolation(
            "must be at most 128 characters",
        )));
    }

    let has_digit = password.chars().any(|c| c.is_numeric());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());

    if !has_digit || !has_lowercase || !has_uppercase {
        return Err(AppError::Flow(AuthFlowError::PasswordPolicyViolation(
            "must contain at least one digit, one lowercase letter, and one uppercase letter",
        )));
    }

    Ok(())
}
