use async_trait::async_trait;

use crate::error::Result;

pub mod mailer;

pub use mailer::SmtpNotifier;

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Outbound notifications. Implementations must not panic on delivery
/// failure; callers decide whether a failed send aborts the operation.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<()>;
}

/// Used when email is disabled: logs instead of sending, never fails.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        tracing::debug!(to = %message.to, subject = %message.subject, "Email disabled, dropping message");
        Ok(())
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use recording::RecordingNotifier;

#[cfg(any(test, feature = "test-utils"))]
mod recording {
    use super::*;
    use std::sync::Mutex;

    /// Captures messages for assertions instead of delivering them.
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<EmailMessage>>,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
            }
        }

        pub fn sent_count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }

        pub fn subjects(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|m| m.subject.clone())
                .collect()
        }
    }

    impl Default for RecordingNotifier {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, message: EmailMessage) -> Result<()> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }
    }
}
