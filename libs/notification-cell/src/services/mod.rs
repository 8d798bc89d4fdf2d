pub mod composer;
pub mod dispatcher;
pub mod mail_relay;
pub mod notifier;

pub use dispatcher::{NotificationDispatcher, NotificationWorker};
pub use mail_relay::MailRelayNotifier;
pub use notifier::{LogNotifier, Notifier};
