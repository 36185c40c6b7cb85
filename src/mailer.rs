use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{error, info};

use crate::config::MailConfig;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid mailbox address: {0}")]
    Address(String),

    #[error("message building error: {0}")]
    Message(String),

    #[error("SMTP error: {0}")]
    Smtp(String),
}

/// Outbound mail seam. Handlers talk to this trait so tests can
/// substitute a no-op transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), MailError>;
}

#[derive(Debug)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|e| MailError::Address(e.to_string()))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| MailError::Smtp(e.to_string()))?
            .port(config.smtp_port);

        if !config.smtp_username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), MailError> {
        let to_mailbox = to
            .parse::<Mailbox>()
            .map_err(|e| MailError::Address(e.to_string()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| MailError::Message(e.to_string()))?;

        self.transport.send(message).await.map_err(|e| {
            error!(error = %e, %to, "smtp send failed");
            MailError::Smtp(e.to_string())
        })?;

        info!(%to, "email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MailConfig;

    fn config() -> MailConfig {
        MailConfig {
            smtp_host: "localhost".into(),
            smtp_port: 2525,
            smtp_username: String::new(),
            smtp_password: String::new(),
            from: "Inventra <no-reply@inventra.local>".into(),
        }
    }

    #[tokio::test]
    async fn builds_transport_without_credentials() {
        assert!(SmtpMailer::new(&config()).is_ok());
    }

    #[test]
    fn rejects_malformed_from_mailbox() {
        let mut cfg = config();
        cfg.from = "not a mailbox".into();
        let err = SmtpMailer::new(&cfg).unwrap_err();
        assert!(matches!(err, MailError::Address(_)));
    }

    #[tokio::test]
    async fn send_rejects_malformed_recipient() {
        let mailer = SmtpMailer::new(&config()).unwrap();
        let err = mailer.send("???", "subject", "<p>hi</p>").await.unwrap_err();
        assert!(matches!(err, MailError::Address(_)));
    }
}
