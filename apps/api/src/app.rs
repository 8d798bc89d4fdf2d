use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use availability_cell::{AvailabilityService, SlotStore};
use booking_cell::BookingCoordinator;
use notification_cell::{LogNotifier, MailRelayNotifier, NotificationDispatcher, NotificationWorker, Notifier};
use shared_config::AppConfig;
use shared_database::{PersistenceBackend, SeedData};

/// Long-lived services shared by every request.
pub struct AppServices {
    pub availability: Arc<AvailabilityService>,
    pub booking: Arc<BookingCoordinator>,
}

pub fn build_notifier(config: &AppConfig) -> Result<Arc<dyn Notifier>> {
    if config.is_mail_configured() {
        let notifier = MailRelayNotifier::from_config(config).context("Invalid mail relay configuration")?;
        info!("Doctor notifications go through the mail relay");
        Ok(Arc::new(notifier))
    } else {
        Ok(Arc::new(LogNotifier::new(config.mail_sender.clone())))
    }
}

pub async fn seed_if_configured(config: &AppConfig, backend: &dyn PersistenceBackend) -> Result<()> {
    let Some(seed_file) = &config.seed_file else {
        return Ok(());
    };

    let seed = SeedData::from_file(seed_file).await?;
    let report = seed
        .apply(backend)
        .await
        .with_context(|| format!("Failed to seed from {}", seed_file))?;

    info!(
        "Seeded {} doctors, {} slots and {} appointments from {} ({} slots already present)",
        report.doctors, report.slots_inserted, report.appointments, seed_file, report.slots_skipped
    );
    Ok(())
}

/// Wires storage, notification and the two request-facing services together.
/// Must be called inside a Tokio runtime; the returned worker has to be shut
/// down once the server stops.
pub fn build_services(
    config: &AppConfig,
    backend: Arc<dyn PersistenceBackend>,
    notifier: Arc<dyn Notifier>,
) -> (AppServices, NotificationWorker) {
    let (dispatcher, worker) = NotificationDispatcher::start(
        notifier,
        config.notification_queue_capacity,
        config.notification_timeout(),
    );
    let store = Arc::new(SlotStore::new(backend, config.reserve_timeout()));

    let services = AppServices {
        availability: Arc::new(AvailabilityService::new(Arc::clone(&store))),
        booking: Arc::new(BookingCoordinator::new(store, dispatcher)),
    };
    (services, worker)
}
