/// Input validators for registration and login payloads.
///
/// Length limits double as DoS protection; format checks reject values
/// that would never match a stored record anyway.
use chrono::Datelike;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MIN_HANDLE_LENGTH: usize = 3;
const MAX_HANDLE_LENGTH: usize = 20;
const MINIMUM_AGE_YEARS: u8 = 13;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    // E.164-ish: optional leading '+', 10-15 digits
    static ref PHONE_REGEX: Regex = Regex::new(r"^\+?\d{10,15}$").unwrap();

    // Handles are URL-safe: letters, digits, underscore, hyphen
    static ref HANDLE_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
}

/// Validates an email address and returns the trimmed value.
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    if trimmed.matches('@').count() != 1 || trimmed.contains('\0') {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates a human-chosen account handle.
pub fn is_valid_handle(handle: &str) -> Result<String, ValidationError> {
    let trimmed = handle.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("handle".to_string()));
    }

    if trimmed.len() < MIN_HANDLE_LENGTH {
        return Err(ValidationError::TooShort("handle".to_string(), MIN_HANDLE_LENGTH));
    }

    if trimmed.len() > MAX_HANDLE_LENGTH {
        return Err(ValidationError::TooLong("handle".to_string(), MAX_HANDLE_LENGTH));
    }

    if !HANDLE_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("handle".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates a phone number that can receive SMS.
pub fn is_valid_phone(phone: &str) -> Result<String, ValidationError> {
    let trimmed = phone.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("phone number".to_string()));
    }

    if !PHONE_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("phone number".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Checks the registration age floor against the supplied current date.
pub fn is_at_least_minimum_age(
    birth_date: chrono::NaiveDate,
    today: chrono::NaiveDate,
) -> Result<(), ValidationError> {
    let mut age = today.year() - birth_date.year();
    let birthday_passed = (today.month(), today.day()) >= (birth_date.month(), birth_date.day());
    if !birthday_passed {
        age -= 1;
    }

    if age < MINIMUM_AGE_YEARS as i32 {
        return Err(ValidationError::UnderMinimumAge(MINIMUM_AGE_YEARS));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_valid_email() {
        assert!(is_valid_email("user@example.com").is_ok());
        assert!(is_valid_email("test.email@domain.co.uk").is_ok());
        assert!(is_valid_email("user+tag@example.com").is_ok());
    }

    #[test]
    fn test_invalid_email_format() {
        assert!(is_valid_email("invalid").is_err());
        assert!(is_valid_email("user@").is_err());
        assert!(is_valid_email("@example.com").is_err());
        assert!(is_valid_email("user@@example.com").is_err());
    }

    #[test]
    fn test_email_length_limits() {
        let too_long = format!("{}@example.com", "a".repeat(250));
        assert!(is_valid_email(&too_long).is_err());

        assert!(is_valid_email("a@b").is_err()); // Too short
    }

    #[test]
    fn test_valid_handle() {
        assert!(is_valid_handle("abc123").is_ok());
        assert!(is_valid_handle("user_name-1").is_ok());
    }

    #[test]
    fn test_handle_length_limits() {
        assert!(is_valid_handle("ab").is_err());
        assert!(is_valid_handle(&"a".repeat(21)).is_err());
    }

    #[test]
    fn test_handle_rejects_whitespace_and_symbols() {
        assert!(is_valid_handle("has space").is_err());
        assert!(is_valid_handle("semi;colon").is_err());
    }

    #[test]
    fn test_valid_phone() {
        assert!(is_valid_phone("+819000000000").is_ok());
        assert!(is_valid_phone("08012345678").is_ok());
    }

    #[test]
    fn test_invalid_phone() {
        assert!(is_valid_phone("12345").is_err());
        assert!(is_valid_phone("not-a-number").is_err());
        assert!(is_valid_phone("+1234567890123456").is_err());
    }

    #[test]
    fn test_age_floor() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();

        let thirteen_exactly = NaiveDate::from_ymd_opt(2013, 6, 1).unwrap();
        assert!(is_at_least_minimum_age(thirteen_exactly, today).is_ok());

        let birthday_tomorrow = NaiveDate::from_ymd_opt(2013, 6, 2).unwrap();
        assert!(is_at_least_minimum_age(birthday_tomorrow, today).is_err());

        let adult = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
        assert!(is_at_least_minimum_age(adult, today).is_ok());
    }
}
