use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Notifier not configured: {0}")]
    NotConfigured(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Mail relay request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Notification queue is full")]
    QueueFull,

    #[error("Notification queue is closed")]
    QueueClosed,
}
