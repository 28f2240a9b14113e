//! Shared fixtures for the integration tests.
//!
//! The tests drive the authentication core directly against the
//! in-memory credential store; no running Postgres or delivery service
//! is needed.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Mutex;

use authgate::auth::registration::{self, RegistrationOutcome};
use authgate::auth::NewRegistration;
use authgate::configuration::{JwtSettings, SecurityMode};
use authgate::error::AppError;
use authgate::model::{IssuedChallenges, RequestMeta};
use authgate::notify::NotificationDispatcher;
use authgate::store::MemoryCredentialStore;

pub const BASE_URL: &str = "http://127.0.0.1:8000";

/// Captures every outbound message instead of delivering it.
#[derive(Default)]
pub struct RecordingNotifier {
    pub emails: Mutex<Vec<(String, String, String)>>,
    pub sms: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// The 6-digit code from the most recent SMS.
    pub fn last_sms_code(&self) -> String {
        let sms = self.sms.lock().unwrap();
        let (_, body) = sms.last().expect("no SMS was recorded");
        body.chars().filter(|c| c.is_ascii_digit()).take(6).collect()
    }

    pub fn email_count(&self) -> usize {
        self.emails.lock().unwrap().len()
    }

    pub fn sms_count(&self) -> usize {
        self.sms.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingNotifier {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), AppError> {
        self.emails
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), html.to_string()));
        Ok(())
    }

    async fn send_sms(&self, to: &str, body: &str) -> Result<(), AppError> {
        self.sms
            .lock()
            .unwrap()
            .push((to.to_string(), body.to_string()));
        Ok(())
    }
}

pub fn jwt_settings() -> JwtSettings {
    JwtSettings {
        secret: "integration-test-signing-secret".to_string(),
        access_token_expiry: 900,
        refresh_token_expiry: 2_592_000,
        issuer: "authgate-test".to_string(),
    }
}

pub fn meta(ip: &str) -> RequestMeta {
    meta_at(ip, Utc::now())
}

pub fn meta_at(ip: &str, now: DateTime<Utc>) -> RequestMeta {
    RequestMeta {
        now,
        ip_address: ip.to_string(),
        user_agent: "integration-test".to_string(),
    }
}

pub fn sample_registration() -> NewRegistration {
    NewRegistration {
        handle: "abc123".to_string(),
        email: "a@x.com".to_string(),
        phone_number: "+819000000000".to_string(),
        birth_date: NaiveDate::from_ymd_opt(1995, 4, 2).unwrap(),
        password: "Abcdef12".to_string(),
    }
}

/// Registers in relaxed mode (to get the raw secrets back) and confirms
/// both channels, leaving a fully verified account behind.
pub async fn register_verified(
    store: &MemoryCredentialStore,
    notifier: &RecordingNotifier,
    registration: &NewRegistration,
    meta: &RequestMeta,
) -> RegistrationOutcome {
    let outcome = registration::register(
        store,
        notifier,
        BASE_URL,
        SecurityMode::Relaxed,
        registration,
        meta,
    )
    .await
    .expect("registration failed");

    let IssuedChallenges {
        link_token,
        sms_code,
    } = outcome.issued.clone().expect("relaxed mode echoes secrets");

    registration::verify_email(store, &link_token, meta)
        .await
        .expect("email verification failed");
    registration::verify_sms(store, &registration.handle, &sms_code, meta)
        .await
        .expect("sms verification failed");

    outcome
}
