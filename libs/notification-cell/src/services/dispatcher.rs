use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

use crate::error::NotificationError;
use crate::models::{AppointmentNotice, NotificationJob, NotificationStats};
use crate::services::notifier::Notifier;

#[derive(Debug, Default)]
struct Counters {
    queued: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> NotificationStats {
        NotificationStats {
            queued: self.queued.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Producer side of the notification queue. Enqueueing never blocks and
/// never fails the caller's operation.
#[derive(Clone)]
pub struct NotificationDispatcher {
    sender: mpsc::Sender<NotificationJob>,
    counters: Arc<Counters>,
}

/// Owns the background delivery task.
pub struct NotificationWorker {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    counters: Arc<Counters>,
}

impl NotificationDispatcher {
    /// Spawns the delivery worker. Must be called inside a Tokio runtime.
    /// Each delivery attempt is cut off after `delivery_timeout` and counted
    /// as failed.
    pub fn start(
        notifier: Arc<dyn Notifier>,
        capacity: usize,
        delivery_timeout: Duration,
    ) -> (Self, NotificationWorker) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let counters = Arc::new(Counters::default());

        let worker_counters = Arc::clone(&counters);
        let task = tokio::spawn(async move {
            worker_loop(notifier, delivery_timeout, receiver, shutdown_rx, worker_counters).await;
        });

        info!("Notification worker started (queue capacity {})", capacity.max(1));

        let dispatcher = Self {
            sender,
            counters: Arc::clone(&counters),
        };
        let worker = NotificationWorker {
            shutdown: shutdown_tx,
            task,
            counters,
        };
        (dispatcher, worker)
    }

    /// Queues a notice for delivery. A full or closed queue drops the notice
    /// with a warning.
    pub fn dispatch(&self, notice: AppointmentNotice) -> Result<(), NotificationError> {
        let appointment_id = notice.appointment_id;
        match self.sender.try_send(NotificationJob::new(notice)) {
            Ok(()) => {
                self.counters.queued.fetch_add(1, Ordering::Relaxed);
                debug!("Queued notification for appointment {}", appointment_id);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Notification queue full; dropping notice for appointment {}", appointment_id);
                Err(NotificationError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Notification queue closed; dropping notice for appointment {}", appointment_id);
                Err(NotificationError::QueueClosed)
            }
        }
    }

    pub fn stats(&self) -> NotificationStats {
        self.counters.snapshot()
    }
}

impl NotificationWorker {
    /// Stops accepting notices, delivers whatever is already queued and
    /// waits for the worker to exit.
    pub async fn shutdown(self) -> NotificationStats {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!("Notification worker terminated abnormally: {}", e);
        }
        let stats = self.counters.snapshot();
        info!(
            delivered = stats.delivered,
            failed = stats.failed,
            dropped = stats.dropped,
            "Notification worker stopped"
        );
        stats
    }
}

async fn worker_loop(
    notifier: Arc<dyn Notifier>,
    delivery_timeout: Duration,
    mut receiver: mpsc::Receiver<NotificationJob>,
    mut shutdown: watch::Receiver<bool>,
    counters: Arc<Counters>,
) {
    loop {
        tokio::select! {
            job = receiver.recv() => match job {
                Some(job) => deliver(notifier.as_ref(), delivery_timeout, job, &counters).await,
                None => break,
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    receiver.close();
    while let Some(job) = receiver.recv().await {
        deliver(notifier.as_ref(), delivery_timeout, job, &counters).await;
    }
}

#[instrument(skip_all, fields(job_id = %job.job_id, appointment_id = job.notice.appointment_id))]
async fn deliver(notifier: &dyn Notifier, delivery_timeout: Duration, job: NotificationJob, counters: &Counters) {
    let waited = Utc::now() - job.enqueued_at;
    debug!("Delivering notification after {}ms in queue", waited.num_milliseconds());

    match timeout(delivery_timeout, notifier.notify(&job.notice.doctor_email, &job.notice)).await {
        Ok(Ok(())) => {
            counters.delivered.fetch_add(1, Ordering::Relaxed);
        }
        Ok(Err(e)) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            error!("Failed to notify {}: {}", job.notice.doctor_email, e);
        }
        Err(_) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            error!(
                "Notification to {} timed out after {:?}",
                job.notice.doctor_email, delivery_timeout
            );
        }
    }
}
