use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{error, info, warn};

/// Outbound notification capability: subject + plain-text body + recipient.
/// Implementations never raise on their own misconfiguration; they log and
/// return so alert dispatch can carry on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str);
}

/// SMTP notifier backed by lettre. Disabled (a logging no-op) unless
/// ENABLE_EMAIL=true and the SMTP_* variables are all present.
pub struct SmtpNotifier {
    mailer: Option<Mailer>,
}

struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn from_env() -> Self {
        let enabled = std::env::var("ENABLE_EMAIL")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        if !enabled {
            info!("📧 Email alerts disabled (ENABLE_EMAIL is not true)");
            return Self::disabled();
        }

        match Self::build_mailer() {
            Ok(mailer) => Self {
                mailer: Some(mailer),
            },
            Err(reason) => {
                warn!("📧 Email alerts disabled: {}", reason);
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self { mailer: None }
    }

    fn build_mailer() -> Result<Mailer, String> {
        let host = require_env("SMTP_HOST")?;
        let port: u16 = require_env("SMTP_PORT")?
            .parse()
            .map_err(|_| "SMTP_PORT is not a valid port".to_string())?;
        let username = require_env("SMTP_USERNAME")?;
        let password = require_env("SMTP_PASSWORD")?;
        let from_email = require_env("SMTP_FROM_EMAIL")?;
        let from_name =
            std::env::var("SMTP_FROM_NAME").unwrap_or_else(|_| "Farewatch".to_string());

        let from: Mailbox = format!("{} <{}>", from_name, from_email)
            .parse()
            .map_err(|e| format!("invalid SMTP_FROM_EMAIL: {}", e))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host)
            .map_err(|e| format!("failed to create SMTP transport: {}", e))?
            .port(port)
            .credentials(Credentials::new(username, password))
            .build();

        Ok(Mailer { transport, from })
    }
}

fn require_env(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("{} not set", key))
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) {
        let Some(mailer) = &self.mailer else {
            info!("📧 Email disabled; would send '{}' to {}", subject, to);
            return;
        };

        let to_mailbox: Mailbox = match to.parse() {
            Ok(mb) => mb,
            Err(e) => {
                warn!("📧 Invalid recipient address {}: {}", to, e);
                return;
            }
        };

        let message = Message::builder()
            .from(mailer.from.clone())
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string());

        let message = match message {
            Ok(m) => m,
            Err(e) => {
                warn!("📧 Failed to build email for {}: {}", to, e);
                return;
            }
        };

        match mailer.transport.send(message).await {
            Ok(_) => info!("✅ Email '{}' sent to {}", subject, to),
            Err(e) => error!("❌ SMTP send to {} failed: {}", to, e),
        }
    }
}
