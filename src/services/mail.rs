use crate::config::MailConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "email_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EmailKind {
    ResponseAlert,
    QuestionnaireReminder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub kind: EmailKind,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl EmailMessage {
    /// Tells a questionnaire author that a representative has responded.
    pub fn response_alert(
        questionnaire_title: &str,
        recipient_name: &str,
        recipient_email: &str,
        respondent_name: &str,
    ) -> Self {
        let greeting = if recipient_name.trim().is_empty() {
            "Hello,".to_string()
        } else {
            format!("Hello {},", recipient_name.trim())
        };
        let respondent = if respondent_name.trim().is_empty() {
            "A client representative"
        } else {
            respondent_name.trim()
        };
        Self {
            kind: EmailKind::ResponseAlert,
            to: vec![recipient_email.to_string()],
            subject: format!("New response to \"{questionnaire_title}\""),
            body: format!(
                "{greeting}\n\n{respondent} has submitted a response to the questionnaire \"{questionnaire_title}\".\n"
            ),
        }
    }

    /// Reminds client contacts that a questionnaire is close to its due date.
    pub fn questionnaire_reminder(questionnaire_title: &str, recipients: Vec<String>) -> Self {
        Self {
            kind: EmailKind::QuestionnaireReminder,
            to: recipients,
            subject: format!("Reminder: \"{questionnaire_title}\" is due soon"),
            body: format!(
                "Hello,\n\nThe questionnaire \"{questionnaire_title}\" is due within the next three days and has not been answered yet.\n"
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("message has no recipients")]
    NoRecipients,
    #[error("mail transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail api rejected message: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

#[derive(Serialize)]
struct ApiEmail<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    text: &'a str,
}

/// Posts messages as JSON to a transactional mail API (Resend-compatible).
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    from: String,
}

impl HttpMailer {
    pub fn new(endpoint: String, api_key: Option<String>, from: String) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .user_agent("b2b-feedback/0.1 (+reqwest)")
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
            from,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        if message.to.is_empty() {
            return Err(MailError::NoRecipients);
        }

        let mut req = self.client.post(&self.endpoint).json(&ApiEmail {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            text: &message.body,
        });
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let res = req.send().await?;
        let status = res.status();
        if status.is_success() {
            tracing::debug!("Mail API accepted {:?} for {} recipients", message.kind, message.to.len());
            Ok(())
        } else {
            let body = res.text().await.unwrap_or_default();
            Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// Writes messages to the log instead of delivering them.
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: String) -> Self {
        Self { from }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        if message.to.is_empty() {
            return Err(MailError::NoRecipients);
        }
        tracing::info!(
            "Mail ({:?}) from {} to {}: {}",
            message.kind,
            self.from,
            message.to.join(", "),
            message.subject
        );
        Ok(())
    }
}

/// Keeps every delivered message in memory.
#[derive(Clone, Default)]
pub struct MemoryMailer {
    sent: Arc<RwLock<Vec<EmailMessage>>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn outbox(&self) -> Vec<EmailMessage> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        if message.to.is_empty() {
            return Err(MailError::NoRecipients);
        }
        self.sent.write().await.push(message.clone());
        Ok(())
    }
}

pub fn mailer_from_config(config: &MailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match &config.api_url {
        Some(url) => {
            tracing::info!("Delivering mail through {}", url);
            Ok(Arc::new(HttpMailer::new(
                url.clone(),
                config.api_key.clone(),
                config.from.clone(),
            )?))
        }
        None => {
            tracing::warn!("MAIL_API_URL not set, emails will only be logged");
            Ok(Arc::new(LogMailer::new(config.from.clone())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_alert_addresses_author() {
        let msg = EmailMessage::response_alert("Q3 survey", "Sam", "sam@example.com", "Riley");
        assert_eq!(msg.kind, EmailKind::ResponseAlert);
        assert_eq!(msg.to, vec!["sam@example.com".to_string()]);
        assert!(msg.subject.contains("Q3 survey"));
        assert!(msg.body.starts_with("Hello Sam,"));
        assert!(msg.body.contains("Riley has submitted"));
    }

    #[test]
    fn test_response_alert_without_names() {
        let msg = EmailMessage::response_alert("Q3 survey", " ", "sam@example.com", "");
        assert!(msg.body.starts_with("Hello,"));
        assert!(msg.body.contains("A client representative has submitted"));
    }

    #[test]
    fn test_reminder_keeps_all_recipients() {
        let msg = EmailMessage::questionnaire_reminder(
            "Renewal",
            vec!["a@example.com".into(), "b@example.com".into()],
        );
        assert_eq!(msg.kind, EmailKind::QuestionnaireReminder);
        assert_eq!(msg.to.len(), 2);
        assert!(msg.subject.contains("Renewal"));
    }

    #[tokio::test]
    async fn test_memory_mailer_records_messages() {
        let mailer = MemoryMailer::new();
        let msg = EmailMessage::questionnaire_reminder("Renewal", vec!["a@example.com".into()]);
        mailer.send(&msg).await.unwrap();

        let empty = EmailMessage::questionnaire_reminder("Renewal", vec![]);
        assert!(matches!(mailer.send(&empty).await, Err(MailError::NoRecipients)));

        assert_eq!(mailer.outbox().await, vec![msg]);
    }

    #[test]
    fn test_log_mailer_selected_without_url() {
        let cfg = MailConfig {
            api_url: None,
            api_key: None,
            from: "noreply@example.com".into(),
        };
        assert!(mailer_from_config(&cfg).is_ok());
    }
}
