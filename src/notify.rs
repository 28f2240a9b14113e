/// Outbound notification channel: verification links over email, one-time
/// codes over SMS.
///
/// The core treats delivery as fire-and-forget; the `*_best_effort`
/// helpers log failures and never propagate them, so a send error can
/// never undo a state change that already happened.
use async_trait::async_trait;
use serde::Serialize;

use crate::configuration::NotificationSettings;
use crate::error::{AppError, NotificationError};

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), AppError>;
    async fn send_sms(&self, to: &str, body: &str) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct HttpNotificationClient {
    http_client: reqwest::Client,
    settings: NotificationSettings,
}

#[derive(Serialize)]
struct SendEmailRequest {
    from: String,
    to: String,
    subject: String,
    html: String,
}

impl HttpNotificationClient {
    pub fn new(settings: NotificationSettings, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            settings,
        }
    }
}

#[async_trait]
impl NotificationDispatcher for HttpNotificationClient {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), AppError> {
        let url = format!("{}/emails", self.settings.email_base_url);
        let request = SendEmailRequest {
            from: self.settings.email_sender.clone(),
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        };

        self.http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                AppError::Notification(NotificationError::ServiceUnavailable(e.to_string()))
            })?
            .error_for_status()
            .map_err(|e| {
                AppError::Notification(NotificationError::SendFailed(e.to_string()))
            })?;

        Ok(())
    }

    async fn send_sms(&self, to: &str, body: &str) -> Result<(), AppError> {
        let url = format!("{}/messages", self.settings.sms_base_url);
        let form = [
            ("From", self.settings.sms_sender.as_str()),
            ("To", to),
            ("Body", body),
        ];

        self.http_client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                AppError::Notification(NotificationError::ServiceUnavailable(e.to_string()))
            })?
            .error_for_status()
            .map_err(|e| {
                AppError::Notification(NotificationError::SendFailed(e.to_string()))
            })?;

        Ok(())
    }
}

/// Send an email, logging any failure instead of returning it.
pub async fn send_email_best_effort<N: NotificationDispatcher + ?Sized>(
    dispatcher: &N,
    to: &str,
    subject: &str,
    html: &str,
) {
    if let Err(e) = dispatcher.send_email(to, subject, html).await {
        tracing::warn!(error = %e, "Email dispatch failed; continuing");
    }
}

/// Send an SMS, logging any failure instead of returning it.
pub async fn send_sms_best_effort<N: NotificationDispatcher + ?Sized>(
    dispatcher: &N,
    to: &str,
    body: &str,
) {
    if let Err(e) = dispatcher.send_sms(to, body).await {
        tracing::warn!(error = %e, "SMS dispatch failed; continuing");
    }
}

// Message builders. Raw secrets appear here and in the dispatcher only;
// they are never logged or persisted.

pub fn verification_email(base_url: &str, token: &str) -> (String, String) {
    let link = format!("{}/verify?token={}", base_url, urlencoding::encode(token));
    let subject = "Confirm your email address".to_string();
    let html = format!(
        "<p>Follow the link below to confirm your email (valid for 30 minutes):</p>\
         <p><a href=\"{link}\">{link}</a></p>\
         <p>Or enter this token directly: <b>{token}</b></p>"
    );
    (subject, html)
}

pub fn verification_sms(code: &str) -> String {
    format!("Your verification code: {} (valid 30 minutes)", code)
}

pub fn step_up_sms(code: &str) -> String {
    format!("Your additional sign-in code: {} (valid 15 minutes)", code)
}

pub fn reset_email(base_url: &str, token: &str) -> (String, String) {
    let link = format!(
        "{}/reset-password?token={}",
        base_url,
        urlencoding::encode(token)
    );
    let subject = "Reset your password".to_string();
    let html = format!(
        "<p>Follow the link below to reset your password (valid for 30 minutes):</p>\
         <p><a href=\"{link}\">{link}</a></p>\
         <p>Or enter this token directly: <b>{token}</b></p>"
    );
    (subject, html)
}

pub fn reset_sms(code: &str) -> String {
    format!("Your password reset code: {} (valid 30 minutes)", code)
}
