//! Mail collaborator (spec §1/§4.5): `send(subject, body, recipients)`.
//! Out of scope to implement for real; an SMTP-backed implementation stands
//! in so `Request::mark_as_completed` has something to call.

use lettre::message::Mailbox;
use lettre::transport::smtp::AsyncSmtpTransport;
use lettre::{AsyncTransport, Message, Tokio1Executor};

use crate::configuration::MailSettings;

#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, subject: &str, body: &str, recipients: &[String]);
}

pub struct NullMailer;

#[async_trait::async_trait]
impl Mailer for NullMailer {
    async fn send(&self, _subject: &str, _body: &str, _recipients: &[String]) {}
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &MailSettings) -> Self {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.smtp_host)
            .port(settings.smtp_port)
            .build();
        let from = settings
            .from_address
            .parse()
            .expect("COLD_MAIL__FROM_ADDRESS must be a valid mailbox address");
        Self { transport, from }
    }
}

#[async_trait::async_trait]
impl Mailer for SmtpMailer {
    /// Best-effort: a failed send is logged, never propagated (spec §4.5,
    /// §7 "Notification failure").
    async fn send(&self, subject: &str, body: &str, recipients: &[String]) {
        for recipient in recipients {
            let to: Mailbox = match recipient.parse() {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(recipient, error = %e, "mail: skipping invalid recipient address");
                    continue;
                }
            };
            let message = match Message::builder()
                .from(self.from.clone())
                .to(to)
                .subject(subject)
                .body(body.to_string())
            {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(recipient, error = %e, "mail: failed to build message");
                    continue;
                }
            };
            if let Err(e) = self.transport.send(message).await {
                tracing::warn!(recipient, error = %e, "mail: delivery failed");
            }
        }
    }
}
