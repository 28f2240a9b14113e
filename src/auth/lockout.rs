/// Progressive lockout policy.
///
/// The failure counter increments per failed password check; at the
/// threshold the account locks for a fixed window and the counter resets
/// to zero. The lock, not the counter, is the enforcement mechanism: a
/// fresh failure streak starts after a lock expires.
use chrono::{DateTime, Duration, Utc};

use crate::error::{AppError, AuthFlowError};
use crate::model::Account;

pub const MAX_FAILED_ATTEMPTS: i32 = 5;
pub const LOCK_MINUTES: i64 = 15;

/// What the store should persist after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureOutcome {
    pub failed_login_count: i32,
    pub locked_until: Option<DateTime<Utc>>,
}

impl FailureOutcome {
    pub fn locked(&self) -> bool {
        self.locked_until.is_some()
    }
}

/// Rejects the attempt while a lock window is active.
///
/// Runs before password verification on every login call. A lock expiring
/// exactly at `now` counts as expired (strict comparison).
pub fn check_lock(account: &Account, now: DateTime<Utc>) -> Result<(), AppError> {
    if let Some(until) = account.locked_until {
        if until > now {
            return Err(AppError::Flow(AuthFlowError::AccountLocked { until }));
        }
    }
    Ok(())
}

/// The counter/lock state after one more failed password check.
///
/// Pure policy. The store applies it under its own atomicity so
/// concurrent failures never lose an increment.
pub fn record_failure(failed_login_count: i32, now: DateTime<Utc>) -> FailureOutcome {
    let next = failed_login_count + 1;
    if next >= MAX_FAILED_ATTEMPTS {
        FailureOutcome {
            failed_login_count: 0,
            locked_until: Some(now + Duration::minutes(LOCK_MINUTES)),
        }
    } else {
        FailureOutcome {
            failed_login_count: next,
            locked_until: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn account(failed: i32, locked_until: Option<DateTime<Utc>>) -> Account {
        Account {
            id: Uuid::new_v4(),
            handle: "abc123".to_string(),
            email: "a@x.com".to_string(),
            phone_number: Some("+819000000000".to_string()),
            birth_date: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            password_hash: "$2b$12$hash".to_string(),
            failed_login_count: failed,
            locked_until,
            is_email_verified: true,
            is_phone_verified: true,
            email_verification: None,
            sms_verification: None,
            login_step_up: None,
            last_login_ip: None,
            last_login_at: None,
            delete_requested_at: None,
            deleted_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_failures_below_threshold_only_increment() {
        let now = Utc::now();
        for prior in 0..3 {
            let outcome = record_failure(prior, now);
            assert_eq!(outcome.failed_login_count, prior + 1);
            assert!(!outcome.locked());
        }
    }

    #[test]
    fn test_fifth_failure_locks_and_resets_counter() {
        let now = Utc::now();
        let outcome = record_failure(4, now);

        assert!(outcome.locked());
        assert_eq!(outcome.failed_login_count, 0);
        assert_eq!(
            outcome.locked_until.unwrap(),
            now + Duration::minutes(LOCK_MINUTES)
        );
    }

    #[test]
    fn test_active_lock_rejects() {
        let now = Utc::now();
        let locked = account(0, Some(now + Duration::minutes(5)));

        match check_lock(&locked, now) {
            Err(AppError::Flow(AuthFlowError::AccountLocked { .. })) => (),
            _ => panic!("Expected AccountLocked"),
        }
    }

    #[test]
    fn test_lock_expiring_exactly_now_is_expired() {
        let now = Utc::now();
        let boundary = account(0, Some(now));

        assert!(check_lock(&boundary, now).is_ok());
    }

    #[test]
    fn test_expired_lock_allows_attempt() {
        let now = Utc::now();
        let expired = account(0, Some(now - Duration::minutes(1)));

        assert!(check_lock(&expired, now).is_ok());
    }
}
