use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::{
    config::EmailConfig,
    error::{AppError, Result},
    notify::{EmailMessage, Notifier},
};

/// SMTP notifier built once at startup and injected where needed; the
/// transport keeps its own connection pool.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpNotifier {
    pub fn new(config: &EmailConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }

        let host = config.smtp_host.as_deref()?;
        let from = config
            .from_address
            .clone()
            .unwrap_or_else(|| "no-reply@membership.org".to_string());

        let mut builder = match AsyncSmtpTransport::<Tokio1Executor>::relay(host) {
            Ok(builder) => builder,
            Err(e) => {
                tracing::warn!("Invalid SMTP relay {}: {}", host, e);
                return None;
            }
        };

        if let Some(port) = config.smtp_port {
            builder = builder.port(port);
        }

        if let (Some(user), Some(pass)) = (config.smtp_user.clone(), config.smtp_pass.clone()) {
            builder = builder.credentials(Credentials::new(user, pass));
        }

        Some(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        let email = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| AppError::Delivery(format!("Invalid from address: {}", e)))?,
            )
            .to(message
                .to
                .parse()
                .map_err(|e| AppError::Delivery(format!("Invalid recipient: {}", e)))?)
            .subject(&message.subject)
            .header(ContentType::TEXT_HTML)
            .body(message.html)
            .map_err(|e| AppError::Delivery(format!("Failed to build email: {}", e)))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| AppError::Delivery(format!("SMTP send failed: {}", e)))?;

        Ok(())
    }
}
