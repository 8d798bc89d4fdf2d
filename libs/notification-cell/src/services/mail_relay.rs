use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, info};

use shared_config::AppConfig;

use crate::error::NotificationError;
use crate::models::AppointmentNotice;
use crate::services::composer;
use crate::services::notifier::Notifier;

/// Hands composed e-mails to an HTTP mail relay.
pub struct MailRelayNotifier {
    client: Client,
    endpoint: String,
    token: Option<String>,
    sender: String,
}

impl fmt::Debug for MailRelayNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailRelayNotifier")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("sender", &self.sender)
            .finish()
    }
}

impl MailRelayNotifier {
    /// Every relay request, connection included, is abandoned after `timeout`.
    pub fn new(
        endpoint: impl Into<String>,
        token: Option<String>,
        sender: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NotificationError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token,
            sender: sender.into(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, NotificationError> {
        let endpoint = config
            .mail_relay_url
            .clone()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| NotificationError::NotConfigured("MAIL_RELAY_URL is not set".to_string()))?;

        Self::new(
            endpoint,
            config.mail_relay_token.clone(),
            config.mail_sender.clone(),
            config.notification_timeout(),
        )
    }
}

#[async_trait]
impl Notifier for MailRelayNotifier {
    async fn notify(&self, doctor_email: &str, notice: &AppointmentNotice) -> Result<(), NotificationError> {
        let mut message = composer::compose(notice, &self.sender);
        message.to = doctor_email.to_string();
        debug!("Posting notification for appointment {} to {}", notice.appointment_id, self.endpoint);

        let mut request = self.client.post(&self.endpoint).json(&message);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Mail relay rejected notification ({}): {}", status, body);
            return Err(NotificationError::Delivery(format!("relay responded {}: {}", status, body)));
        }

        info!("Notification sent to {}", doctor_email);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mail-relay"
    }
}
