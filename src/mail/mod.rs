//! Outbound email.
//!
//! Emails are sent after the database change they report on has committed.
//! A failed send is logged and reported as `Delivery::Failed`; it never undoes
//! the change.

pub mod templates;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::{Config, EmailConfig};
use crate::models::{ContactSubmission, Locale, Subscriber};

/// A rendered email ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug)]
pub enum MailError {
    /// Request never reached the provider or timed out
    Transport(String),
    /// Provider answered with a non-success status
    Rejected { status: u16, body: String },
}

impl std::fmt::Display for MailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MailError::Transport(msg) => write!(f, "email transport error: {}", msg),
            MailError::Rejected { status, body } => {
                write!(f, "email provider rejected message ({}): {}", status, body)
            }
        }
    }
}

impl std::error::Error for MailError {}

/// Outcome of a best-effort notification.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    Sent,
    Failed,
    /// No provider configured or no recipient
    Skipped,
}

impl Delivery {
    /// Overall outcome of several sends: any failure wins, then any success.
    pub fn combine(self, other: Delivery) -> Delivery {
        match (self, other) {
            (Delivery::Failed, _) | (_, Delivery::Failed) => Delivery::Failed,
            (Delivery::Sent, _) | (_, Delivery::Sent) => Delivery::Sent,
            _ => Delivery::Skipped,
        }
    }
}

/// Transport for rendered emails.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<Delivery, MailError>;
}

/// Sends through an HTTP email API accepting `{from, to, subject, html}`.
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

#[derive(Serialize)]
struct OutgoingEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

impl HttpMailer {
    pub fn new(api_url: String, api_key: String, from: String) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            api_url,
            api_key,
            from,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<Delivery, MailError> {
        let body = OutgoingEmail {
            from: &self.from,
            to: [message.to.as_str()],
            subject: &message.subject,
            html: &message.html,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(Delivery::Sent)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// Logs instead of sending. Used when no provider key is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<Delivery, MailError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "Email provider not configured, skipping email"
        );
        Ok(Delivery::Skipped)
    }
}

/// Build the mailer for this configuration.
pub fn mailer_from_config(email: &EmailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match &email.api_key {
        Some(key) => Ok(Arc::new(HttpMailer::new(
            email.api_url.clone(),
            key.clone(),
            email.from.clone(),
        )?)),
        None => {
            tracing::warn!("No email API key configured (ESTUDIO_EMAIL_API_KEY). Emails will be logged only");
            Ok(Arc::new(LogMailer))
        }
    }
}

/// Renders and sends the site's transactional emails.
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    site_url: String,
    contact_notify: Option<String>,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, config: &Config) -> Self {
        Self {
            mailer,
            site_url: config.site_url.clone(),
            contact_notify: config.email.contact_notify.clone(),
        }
    }

    async fn deliver(&self, message: EmailMessage, kind: &str) -> Delivery {
        match self.mailer.send(&message).await {
            Ok(delivery) => delivery,
            Err(e) => {
                tracing::warn!(to = %message.to, "Failed to send {} email: {}", kind, e);
                Delivery::Failed
            }
        }
    }

    fn site_link(&self, locale: Locale) -> String {
        format!("{}/{}", self.site_url, locale.as_str())
    }

    fn unsubscribe_link(&self, subscriber: &Subscriber) -> String {
        format!(
            "{}/newsletter/unsubscribe/{}",
            self.site_link(subscriber.locale),
            subscriber.unsubscribe_token
        )
    }

    pub async fn newsletter_verification(&self, subscriber: &Subscriber) -> Delivery {
        let Some(token) = &subscriber.verification_token else {
            tracing::warn!("Subscriber {} has no verification token", subscriber.id);
            return Delivery::Skipped;
        };
        let verify_url = format!(
            "{}/newsletter/verify/{}",
            self.site_link(subscriber.locale),
            token
        );
        let message = templates::verification(
            subscriber.locale,
            &subscriber.email,
            &verify_url,
            &self.unsubscribe_link(subscriber),
        );
        self.deliver(message, "verification").await
    }

    pub async fn newsletter_welcome(&self, subscriber: &Subscriber) -> Delivery {
        let message = templates::welcome(
            subscriber.locale,
            &subscriber.email,
            &self.site_link(subscriber.locale),
            &self.unsubscribe_link(subscriber),
        );
        self.deliver(message, "welcome").await
    }

    pub async fn newsletter_goodbye(&self, subscriber: &Subscriber) -> Delivery {
        let message = templates::goodbye(
            subscriber.locale,
            &subscriber.email,
            &self.site_link(subscriber.locale),
        );
        self.deliver(message, "goodbye").await
    }

    /// Owner notification plus sender acknowledgement.
    pub async fn contact_received(&self, submission: &ContactSubmission) -> Delivery {
        let notification = match &self.contact_notify {
            Some(owner) => {
                let message = templates::contact_notification(submission.locale, owner, submission);
                self.deliver(message, "contact notification").await
            }
            None => Delivery::Skipped,
        };
        let ack = self
            .deliver(templates::contact_ack(submission.locale, submission), "contact acknowledgement")
            .await;
        notification.combine(ack)
    }
}
