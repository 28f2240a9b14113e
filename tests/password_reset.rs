//! Dual-secret password reset, history enforcement, and replay.
mod helpers;

use chrono::Duration;

use authgate::auth::login::{self, LoginOutcome};
use authgate::auth::{reset, Credentials};
use authgate::configuration::SecurityMode;
use authgate::error::{AppError, AuthFlowError};
use authgate::model::IssuedChallenges;
use authgate::store::MemoryCredentialStore;

use helpers::{jwt_settings, meta, meta_at, register_verified, sample_registration, RecordingNotifier, BASE_URL};

async fn open_reset(
    store: &MemoryCredentialStore,
    notifier: &RecordingNotifier,
    m: &authgate::model::RequestMeta,
) -> IssuedChallenges {
    reset::request_reset(
        store,
        notifier,
        BASE_URL,
        SecurityMode::Relaxed,
        "a@x.com",
        m,
    )
    .await
    .unwrap()
    .expect("relaxed mode echoes secrets")
}

#[tokio::test]
async fn reset_rotates_the_password() {
    let store = MemoryCredentialStore::new();
    let notifier = RecordingNotifier::new();
    let m = meta("203.0.113.1");
    register_verified(&store, &notifier, &sample_registration(), &m).await;

    let issued = open_reset(&store, &notifier, &m).await;
    reset::reset_password(&store, &issued.link_token, &issued.sms_code, "Newpass34", &m)
        .await
        .unwrap();

    // Old password no longer works, the new one does.
    let err = login::login(
        &store,
        &notifier,
        &jwt_settings(),
        SecurityMode::Relaxed,
        &Credentials {
            identifier: "abc123".to_string(),
            password: "Abcdef12".to_string(),
        },
        &m,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Flow(AuthFlowError::InvalidCredential)));

    let outcome = login::login(
        &store,
        &notifier,
        &jwt_settings(),
        SecurityMode::Relaxed,
        &Credentials {
            identifier: "abc123".to_string(),
            password: "Newpass34".to_string(),
        },
        &m,
    )
    .await
    .unwrap();
    assert!(matches!(outcome, LoginOutcome::Granted(_)));
}

#[tokio::test]
async fn reset_request_dispatches_both_channels() {
    let store = MemoryCredentialStore::new();
    let notifier = RecordingNotifier::new();
    let m = meta("203.0.113.1");
    register_verified(&store, &notifier, &sample_registration(), &m).await;

    let emails_before = notifier.email_count();
    let sms_before = notifier.sms_count();
    open_reset(&store, &notifier, &m).await;

    assert_eq!(notifier.email_count(), emails_before + 1);
    assert_eq!(notifier.sms_count(), sms_before + 1);
}

#[tokio::test]
async fn reset_for_unknown_email_is_not_found() {
    let store = MemoryCredentialStore::new();
    let notifier = RecordingNotifier::new();
    let m = meta("203.0.113.1");

    let err = reset::request_reset(
        &store,
        &notifier,
        BASE_URL,
        SecurityMode::Relaxed,
        "nobody@x.com",
        &m,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Flow(AuthFlowError::NotFound)));
}

#[tokio::test]
async fn both_secrets_must_match_the_same_request() {
    let store = MemoryCredentialStore::new();
    let notifier = RecordingNotifier::new();
    let m = meta("203.0.113.1");
    register_verified(&store, &notifier, &sample_registration(), &m).await;

    let issued = open_reset(&store, &notifier, &m).await;

    let err = reset::reset_password(&store, &issued.link_token, "999999", "Newpass34", &m)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Flow(AuthFlowError::SecretMismatch)));

    let err = reset::reset_password(&store, "wrong-token", &issued.sms_code, "Newpass34", &m)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Flow(AuthFlowError::SecretMismatch)));
}

#[tokio::test]
async fn a_used_request_cannot_be_replayed() {
    let store = MemoryCredentialStore::new();
    let notifier = RecordingNotifier::new();
    let m = meta("203.0.113.1");
    register_verified(&store, &notifier, &sample_registration(), &m).await;

    let issued = open_reset(&store, &notifier, &m).await;
    reset::reset_password(&store, &issued.link_token, &issued.sms_code, "Newpass34", &m)
        .await
        .unwrap();

    let err = reset::reset_password(&store, &issued.link_token, &issued.sms_code, "Another56", &m)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Flow(AuthFlowError::SecretAlreadyUsed)));
}

#[tokio::test]
async fn stale_reset_request_expires() {
    let store = MemoryCredentialStore::new();
    let notifier = RecordingNotifier::new();
    let m = meta("203.0.113.1");
    register_verified(&store, &notifier, &sample_registration(), &m).await;

    let issued = open_reset(&store, &notifier, &m).await;
    let too_late = meta_at("203.0.113.1", m.now + Duration::minutes(31));

    let err = reset::reset_password(
        &store,
        &issued.link_token,
        &issued.sms_code,
        "Newpass34",
        &too_late,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Flow(AuthFlowError::SecretExpired)));
}

#[tokio::test]
async fn recent_passwords_cannot_be_reused() {
    let store = MemoryCredentialStore::new();
    let notifier = RecordingNotifier::new();
    let m = meta("203.0.113.1");
    register_verified(&store, &notifier, &sample_registration(), &m).await;

    // Reusing the current password is refused outright.
    let issued = open_reset(&store, &notifier, &m).await;
    let err = reset::reset_password(&store, &issued.link_token, &issued.sms_code, "Abcdef12", &m)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Flow(AuthFlowError::PasswordReused)));

    // Walk through two more generations; each stays in the window. The
    // clock advances per generation so history ordering is unambiguous.
    let m2 = meta_at("203.0.113.1", m.now + Duration::minutes(1));
    let issued = open_reset(&store, &notifier, &m2).await;
    reset::reset_password(&store, &issued.link_token, &issued.sms_code, "Second22", &m2)
        .await
        .unwrap();

    let m3 = meta_at("203.0.113.1", m.now + Duration::minutes(2));
    let issued = open_reset(&store, &notifier, &m3).await;
    reset::reset_password(&store, &issued.link_token, &issued.sms_code, "Third333", &m3)
        .await
        .unwrap();

    // The registration password is still within the last three.
    let m4 = meta_at("203.0.113.1", m.now + Duration::minutes(3));
    let issued = open_reset(&store, &notifier, &m4).await;
    let err = reset::reset_password(&store, &issued.link_token, &issued.sms_code, "Abcdef12", &m4)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Flow(AuthFlowError::PasswordReused)));

    // One more generation pushes it out of the window.
    reset::reset_password(&store, &issued.link_token, &issued.sms_code, "Fourth44", &m4)
        .await
        .unwrap();

    let m5 = meta_at("203.0.113.1", m.now + Duration::minutes(4));
    let issued = open_reset(&store, &notifier, &m5).await;
    reset::reset_password(&store, &issued.link_token, &issued.sms_code, "Abcdef12", &m5)
        .await
        .unwrap();
}

#[tokio::test]
async fn policy_violations_are_rejected_before_secret_checks() {
    let store = MemoryCredentialStore::new();
    let notifier = RecordingNotifier::new();
    let m = meta("203.0.113.1");
    register_verified(&store, &notifier, &sample_registration(), &m).await;

    // Even with garbage secrets the policy failure is reported first.
    let err = reset::reset_password(&store, "whatever", "000000", "short", &m)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Flow(AuthFlowError::PasswordPolicyViolation(_))
    ));
}
