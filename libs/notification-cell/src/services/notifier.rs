use async_trait::async_trait;
use tracing::info;

use crate::error::NotificationError;
use crate::models::AppointmentNotice;
use crate::services::composer;

/// Delivers a booking notice to a doctor. Callers treat every error as
/// non-fatal.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, doctor_email: &str, notice: &AppointmentNotice) -> Result<(), NotificationError>;

    fn name(&self) -> &'static str;
}

/// Stand-in used when no mail relay is configured: the message is only logged.
pub struct LogNotifier {
    sender: String,
}

impl LogNotifier {
    pub fn new(sender: impl Into<String>) -> Self {
        Self { sender: sender.into() }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, doctor_email: &str, notice: &AppointmentNotice) -> Result<(), NotificationError> {
        let message = composer::compose(notice, &self.sender);
        info!(
            to = %doctor_email,
            subject = %message.subject,
            "Simulated doctor notification (mail relay not configured)"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
