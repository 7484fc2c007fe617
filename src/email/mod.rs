//! Outgoing mail: the `Mailer` seam, its lettre-backed implementation and
//! the delivery log kept in `email_logs`.

pub mod repo;
pub mod templates;

use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use sqlx::PgPool;
use tracing::{error, info, warn};

use crate::config::{EmailConfig, EmailTransportConfig};

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()>;
}

enum Transport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

pub struct LettreMailer {
    transport: Transport,
    from: Mailbox,
}

impl LettreMailer {
    pub fn new(config: &EmailConfig) -> anyhow::Result<Self> {
        let transport = match &config.transport {
            EmailTransportConfig::Smtp {
                host,
                port,
                username,
                password,
                use_tls,
            } => {
                let builder = if *use_tls {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                        .context("create SMTP transport")?
                } else {
                    warn!("SMTP TLS is disabled");
                    AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
                };
                Transport::Smtp(
                    builder
                        .port(*port)
                        .credentials(Credentials::new(username.clone(), password.clone()))
                        .build(),
                )
            }
            EmailTransportConfig::File { path } => {
                let dir = Path::new(path);
                if !dir.exists() {
                    std::fs::create_dir_all(dir).context("create emails directory")?;
                }
                Transport::File(AsyncFileTransport::<Tokio1Executor>::new(dir))
            }
        };

        let from = format!("{} <{}>", config.from_name, config.from_email)
            .parse::<Mailbox>()
            .context("parse from address")?;

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for LettreMailer {
    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()> {
        let to = email
            .to
            .parse::<Mailbox>()
            .with_context(|| format!("parse recipient {}", email.to))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(email.html.clone())
            .context("build email message")?;

        match &self.transport {
            Transport::Smtp(smtp) => {
                smtp.send(message).await.context("send SMTP email")?;
            }
            Transport::File(file) => {
                file.send(message).await.context("write email file")?;
            }
        }
        Ok(())
    }
}

/// Sends `email` and records the attempt in `email_logs`.
///
/// Delivery problems are logged and reported through the return value, never
/// raised.
pub async fn send_and_log(db: &PgPool, mailer: &dyn Mailer, email: OutgoingEmail) -> bool {
    let outcome = mailer.send(&email).await;

    let (status, error_message) = match &outcome {
        Ok(()) => {
            info!(to = %email.to, subject = %email.subject, "email sent");
            (repo::EmailStatus::Sent, None)
        }
        Err(e) => {
            error!(error = ?e, to = %email.to, subject = %email.subject, "email send failed");
            (repo::EmailStatus::Failed, Some(format!("{e:#}")))
        }
    };

    if let Err(e) =
        repo::insert_email_log(db, &email.to, &email.subject, status, error_message.as_deref()).await
    {
        warn!(error = %e, "could not record email log");
    }

    outcome.is_ok()
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingMailer;
    use super::*;
    use crate::state::AppState;

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            to: "guest@example.com".into(),
            subject: "Booking Receipt - Kina Resort".into(),
            html: "<p>hi</p>".into(),
        }
    }

    #[tokio::test]
    async fn send_and_log_reports_success_even_if_log_insert_fails() {
        // The fake pool never connects, so the log insert errors out.
        let state = AppState::fake();
        let mailer = RecordingMailer::default();
        assert!(send_and_log(&state.db, &mailer, email()).await);
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn send_and_log_swallows_delivery_failure() {
        let state = AppState::fake();
        let mailer = RecordingMailer {
            fail: true,
            ..Default::default()
        };
        assert!(!send_and_log(&state.db, &mailer, email()).await);
    }

    #[test]
    fn file_transport_builds() {
        let dir = std::env::temp_dir().join(format!("kina-mail-{}", uuid::Uuid::new_v4()));
        let config = EmailConfig {
            transport: EmailTransportConfig::File {
                path: dir.to_string_lossy().into_owned(),
            },
            from_email: "noreply@kina.example".into(),
            from_name: "Kina Resort".into(),
        };
        assert!(LettreMailer::new(&config).is_ok());
        assert!(dir.exists());
    }
}
