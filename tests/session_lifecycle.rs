//! Refresh rotation, revocation, deactivation, and email recovery.
mod helpers;

use chrono::{Duration, NaiveDate};

use authgate::auth::login::{self, LoginOutcome};
use authgate::auth::{account, session, Credentials, GrantedSession};
use authgate::configuration::SecurityMode;
use authgate::error::{AppError, AuthFlowError};
use authgate::store::{CredentialStore, MemoryCredentialStore};

use helpers::{jwt_settings, meta, meta_at, register_verified, sample_registration, RecordingNotifier};

async fn granted_login(
    store: &MemoryCredentialStore,
    notifier: &RecordingNotifier,
    m: &authgate::model::RequestMeta,
) -> GrantedSession {
    match login::login(
        store,
        notifier,
        &jwt_settings(),
        SecurityMode::Relaxed,
        &Credentials {
            identifier: "abc123".to_string(),
            password: "Abcdef12".to_string(),
        },
        m,
    )
    .await
    .unwrap()
    {
        LoginOutcome::Granted(granted) => granted,
        LoginOutcome::StepUpRequired => panic!("relaxed login must not park"),
    }
}

#[tokio::test]
async fn refresh_rotates_and_rejects_the_old_token() {
    let store = MemoryCredentialStore::new();
    let notifier = RecordingNotifier::new();
    let m = meta("203.0.113.1");
    register_verified(&store, &notifier, &sample_registration(), &m).await;

    let granted = granted_login(&store, &notifier, &m).await;

    let rotated = session::refresh(&store, &jwt_settings(), &granted.refresh_token, &m)
        .await
        .unwrap();
    assert_ne!(rotated.refresh_token, granted.refresh_token);
    assert_eq!(rotated.account.handle, "abc123");

    // The rotated-out token is dead; replaying it surfaces theft.
    let err = session::refresh(&store, &jwt_settings(), &granted.refresh_token, &m)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Flow(AuthFlowError::SessionInvalid)));

    // The replacement still works.
    session::refresh(&store, &jwt_settings(), &rotated.refresh_token, &m)
        .await
        .unwrap();
}

#[tokio::test]
async fn garbage_refresh_token_is_invalid() {
    let store = MemoryCredentialStore::new();
    let err = session::refresh(&store, &jwt_settings(), "not-a-token", &meta("203.0.113.1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Flow(AuthFlowError::SessionInvalid)));
}

#[tokio::test]
async fn expired_session_cannot_refresh() {
    let store = MemoryCredentialStore::new();
    let notifier = RecordingNotifier::new();
    let m = meta("203.0.113.1");
    register_verified(&store, &notifier, &sample_registration(), &m).await;

    let granted = granted_login(&store, &notifier, &m).await;

    let much_later = meta_at("203.0.113.1", m.now + Duration::days(31));
    let err = session::refresh(&store, &jwt_settings(), &granted.refresh_token, &much_later)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Flow(AuthFlowError::SessionExpired)));
}

#[tokio::test]
async fn refresh_does_not_move_the_trusted_origin() {
    let store = MemoryCredentialStore::new();
    let notifier = RecordingNotifier::new();
    let m = meta("203.0.113.1");
    register_verified(&store, &notifier, &sample_registration(), &m).await;

    let granted = granted_login(&store, &notifier, &m).await;

    let elsewhere = meta("198.51.100.7");
    session::refresh(&store, &jwt_settings(), &granted.refresh_token, &elsewhere)
        .await
        .unwrap();

    let account = store.find_by_handle("abc123").await.unwrap().unwrap();
    assert_eq!(account.last_login_ip.as_deref(), Some("203.0.113.1"));
}

#[tokio::test]
async fn logout_is_idempotent() {
    let store = MemoryCredentialStore::new();
    let notifier = RecordingNotifier::new();
    let m = meta("203.0.113.1");
    register_verified(&store, &notifier, &sample_registration(), &m).await;

    let granted = granted_login(&store, &notifier, &m).await;

    session::logout(&store, &granted.refresh_token, m.now).await.unwrap();
    session::logout(&store, &granted.refresh_token, m.now).await.unwrap();
    session::logout(&store, "never-issued", m.now).await.unwrap();

    let err = session::refresh(&store, &jwt_settings(), &granted.refresh_token, &m)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Flow(AuthFlowError::SessionInvalid)));
}

#[tokio::test]
async fn logout_all_revokes_every_session() {
    let store = MemoryCredentialStore::new();
    let notifier = RecordingNotifier::new();
    let m = meta("203.0.113.1");
    let outcome = register_verified(&store, &notifier, &sample_registration(), &m).await;

    let first = granted_login(&store, &notifier, &m).await;
    let second = granted_login(&store, &notifier, &m).await;

    session::logout_all(&store, outcome.account.id, m.now).await.unwrap();

    for token in [&first.refresh_token, &second.refresh_token] {
        let err = session::refresh(&store, &jwt_settings(), token, &m)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Flow(AuthFlowError::SessionInvalid)));
    }
}

#[tokio::test]
async fn deactivation_needs_the_exact_handle_and_password() {
    let store = MemoryCredentialStore::new();
    let notifier = RecordingNotifier::new();
    let m = meta("203.0.113.1");
    let outcome = register_verified(&store, &notifier, &sample_registration(), &m).await;

    let err = account::request_deactivation(&store, outcome.account.id, "abc123", "WrongPw99", &m)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Flow(AuthFlowError::InvalidCredential)));

    let err = account::request_deactivation(&store, outcome.account.id, "someone", "Abcdef12", &m)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Flow(AuthFlowError::InvalidCredential)));
}

#[tokio::test]
async fn deactivation_blocks_login_and_revokes_sessions() {
    let store = MemoryCredentialStore::new();
    let notifier = RecordingNotifier::new();
    let m = meta("203.0.113.1");
    let outcome = register_verified(&store, &notifier, &sample_registration(), &m).await;

    let granted = granted_login(&store, &notifier, &m).await;

    account::request_deactivation(&store, outcome.account.id, "abc123", "Abcdef12", &m)
        .await
        .unwrap();

    // Sessions are gone.
    let err = session::refresh(&store, &jwt_settings(), &granted.refresh_token, &m)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Flow(AuthFlowError::SessionInvalid)));

    // Within the grace window the login reports the pending deletion.
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
    assert!(matches!(err, AppError::Flow(AuthFlowError::DeactivationPending)));

    // Past the window the account is simply gone.
    let after_grace = meta_at("203.0.113.1", m.now + Duration::days(31));
    let err = login::login(
        &store,
        &notifier,
        &jwt_settings(),
        SecurityMode::Relaxed,
        &Credentials {
            identifier: "abc123".to_string(),
            password: "Abcdef12".to_string(),
        },
        &after_grace,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Flow(AuthFlowError::AccountDeactivated)));
}

#[tokio::test]
async fn forgotten_email_is_recovered_masked() {
    let store = MemoryCredentialStore::new();
    let notifier = RecordingNotifier::new();
    let m = meta("203.0.113.1");
    register_verified(&store, &notifier, &sample_registration(), &m).await;

    let masked = account::recover_email(
        &store,
        "+819000000000",
        NaiveDate::from_ymd_opt(1995, 4, 2).unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(masked, "a***@x.com");

    let err = account::recover_email(
        &store,
        "+819000000000",
        NaiveDate::from_ymd_opt(1995, 4, 3).unwrap(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Flow(AuthFlowError::NotFound)));
}
