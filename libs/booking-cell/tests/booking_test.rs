use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use futures::future::join_all;

use availability_cell::SlotStore;
use booking_cell::*;
use notification_cell::{AppointmentNotice, NotificationDispatcher, NotificationError, NotificationWorker, Notifier};
use shared_database::{InMemoryBackend, JsonFileBackend, PersistenceBackend};
use shared_models::{Slot, SlotFilter};
use shared_utils::test_utils::{SchedulingFixtures, CARDIOLOGIST_ID, DENTIST_ID, SCENARIO_DATE};

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, AppointmentNotice)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, doctor_email: &str, notice: &AppointmentNotice) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push((doctor_email.to_string(), notice.clone()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _: &str, _: &AppointmentNotice) -> Result<(), NotificationError> {
        Err(NotificationError::Delivery("relay down".to_string()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

fn coordinator(
    backend: Arc<dyn PersistenceBackend>,
    notifier: Arc<dyn Notifier>,
) -> (Arc<BookingCoordinator>, NotificationWorker) {
    let store = Arc::new(SlotStore::new(backend, Duration::from_secs(1)));
    let (dispatcher, worker) = NotificationDispatcher::start(notifier, 16, Duration::from_secs(1));
    (Arc::new(BookingCoordinator::new(store, dispatcher)), worker)
}

fn alice_books(doctor_id: &str, date: &str, time: &str) -> BookAppointmentRequest {
    BookAppointmentRequest::new(doctor_id, date, time, "Alice", "Rex", "555-0001")
}

async fn all_slots(backend: &dyn PersistenceBackend) -> Vec<Slot> {
    backend.query_slots(&SlotFilter::default()).await.unwrap()
}

#[tokio::test]
async fn test_first_booking_gets_protocol_one_and_repeat_is_unavailable() {
    let backend = SchedulingFixtures::seeded_backend().await;
    let notifier = Arc::new(RecordingNotifier::default());
    let (coordinator, worker) = coordinator(backend.clone(), notifier.clone());

    let confirmation = coordinator
        .book(alice_books(DENTIST_ID, SCENARIO_DATE, "08:00"))
        .await
        .unwrap();

    assert_eq!(confirmation.appointment.id, 1);
    assert_eq!(
        confirmation.summary,
        BookingSummary {
            protocol: 1,
            doctor: "Ana Souza".to_string(),
            specialty: "Dentistry".to_string(),
            date: SCENARIO_DATE.to_string(),
            time: "08:00".to_string(),
            pet: "Rex".to_string(),
        }
    );

    let repeat = coordinator.book(alice_books(DENTIST_ID, SCENARIO_DATE, "08:00")).await;
    assert_matches!(repeat, Err(BookingError::SlotUnavailable));

    worker.shutdown().await;
    let sent = notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "ana.souza@vetcare.local");
    assert_eq!(sent[0].1.pet_name, "Rex");
    assert_eq!(sent[0].1.contact, "555-0001");
}

#[tokio::test]
async fn test_missing_contact_leaves_storage_untouched() {
    let backend = SchedulingFixtures::seeded_backend().await;
    let (coordinator, worker) = coordinator(backend.clone(), Arc::new(RecordingNotifier::default()));

    let mut request = alice_books(DENTIST_ID, SCENARIO_DATE, "08:00");
    request.contact = None;

    let result = coordinator.book(request).await;
    assert_matches!(result, Err(BookingError::ValidationError(msg)) if msg.contains("contact"));

    assert!(all_slots(backend.as_ref()).await.iter().all(|slot| slot.available));
    assert!(backend.list_appointments().await.unwrap().is_empty());
    assert_eq!(worker.shutdown().await.queued, 0);
}

#[tokio::test]
async fn test_malformed_time_is_rejected_before_reserving() {
    let backend = SchedulingFixtures::seeded_backend().await;
    let (coordinator, _worker) = coordinator(backend.clone(), Arc::new(RecordingNotifier::default()));

    let result = coordinator.book(alice_books(DENTIST_ID, SCENARIO_DATE, "8h00")).await;

    assert_matches!(result, Err(BookingError::ValidationError(_)));
    assert!(all_slots(backend.as_ref()).await.iter().all(|slot| slot.available));
}

#[tokio::test]
async fn test_unknown_slot_is_unavailable() {
    let backend = SchedulingFixtures::seeded_backend().await;
    let (coordinator, _worker) = coordinator(backend, Arc::new(RecordingNotifier::default()));

    let result = coordinator.book(alice_books(DENTIST_ID, "2030-01-01", "08:00")).await;

    assert_matches!(result, Err(BookingError::SlotUnavailable));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bookings_of_one_slot_have_one_winner() {
    let backend = SchedulingFixtures::seeded_backend().await;
    let (coordinator, _worker) = coordinator(backend.clone(), Arc::new(RecordingNotifier::default()));

    let attempts = (0..32).map(|i| {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            let mut request = alice_books(CARDIOLOGIST_ID, SCENARIO_DATE, "08:00");
            request.client_name = Some(format!("Client {}", i));
            coordinator.book(request).await
        })
    });

    let results: Vec<_> = join_all(attempts).await.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter(|r| r.is_err())
        .all(|r| matches!(r, Err(BookingError::SlotUnavailable))));
    assert_eq!(backend.list_appointments().await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_taken_slot_has_exactly_one_appointment() {
    let backend = SchedulingFixtures::seeded_backend().await;
    let (coordinator, _worker) = coordinator(backend.clone(), Arc::new(RecordingNotifier::default()));

    let attempts = SchedulingFixtures::slots()
        .into_iter()
        .take(3)
        .flat_map(|slot| std::iter::repeat(slot).take(8))
        .map(|slot| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.book(alice_books(&slot.doctor_id, &slot.date, &slot.time)).await })
        });
    join_all(attempts).await;

    let mut per_slot: HashMap<_, usize> = HashMap::new();
    for appointment in backend.list_appointments().await.unwrap() {
        *per_slot.entry(appointment.slot_key()).or_default() += 1;
    }

    let taken: Vec<_> = all_slots(backend.as_ref())
        .await
        .into_iter()
        .filter(|slot| !slot.available)
        .collect();
    assert_eq!(taken.len(), 3);
    for slot in taken {
        assert_eq!(per_slot.get(&slot.key()), Some(&1), "slot {}", slot.key());
    }
}

#[tokio::test]
async fn test_notification_failure_does_not_fail_the_booking() {
    let backend = SchedulingFixtures::seeded_backend().await;
    let (coordinator, worker) = coordinator(backend.clone(), Arc::new(FailingNotifier));

    let confirmation = coordinator.book(alice_books(DENTIST_ID, SCENARIO_DATE, "09:00")).await;
    assert!(confirmation.is_ok());

    let stats = worker.shutdown().await;
    assert_eq!(stats.failed, 1);
    assert_eq!(backend.list_appointments().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_booking_survives_a_stopped_notification_worker() {
    let backend = SchedulingFixtures::seeded_backend().await;
    let (coordinator, worker) = coordinator(backend, Arc::new(RecordingNotifier::default()));
    worker.shutdown().await;

    let confirmation = coordinator.book(alice_books(DENTIST_ID, SCENARIO_DATE, "09:00")).await;

    assert!(confirmation.is_ok());
}

#[tokio::test]
async fn test_missing_doctor_keeps_slot_reserved_without_appointment() {
    let backend: Arc<dyn PersistenceBackend> = Arc::new(InMemoryBackend::new());
    backend.insert_slot(Slot::open("D9", SCENARIO_DATE, "10:00")).await.unwrap();
    let (coordinator, _worker) = coordinator(backend.clone(), Arc::new(RecordingNotifier::default()));

    let result = coordinator.book(alice_books("D9", SCENARIO_DATE, "10:00")).await;
    assert_matches!(result, Err(BookingError::DoctorNotFound(id)) if id == "D9");

    let slots = all_slots(backend.as_ref()).await;
    assert!(!slots[0].available);
    assert!(backend.list_appointments().await.unwrap().is_empty());

    let retry = coordinator.book(alice_books("D9", SCENARIO_DATE, "10:00")).await;
    assert_matches!(retry, Err(BookingError::SlotUnavailable));
}

#[tokio::test]
async fn test_appointments_are_listed_in_protocol_order() {
    let backend = SchedulingFixtures::seeded_backend().await;
    let (coordinator, _worker) = coordinator(backend, Arc::new(RecordingNotifier::default()));

    coordinator.book(alice_books(DENTIST_ID, SCENARIO_DATE, "09:00")).await.unwrap();
    coordinator.book(alice_books(CARDIOLOGIST_ID, "2025-01-09", "14:00")).await.unwrap();

    let appointments = coordinator.list_appointments().await.unwrap();
    let ids: Vec<u64> = appointments.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(appointments[1].doctor_id, CARDIOLOGIST_ID);
}

#[tokio::test]
async fn test_json_file_bookings_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");

    {
        let backend: Arc<dyn PersistenceBackend> = Arc::new(JsonFileBackend::open(&path).await.unwrap());
        SchedulingFixtures::seed(backend.as_ref()).await;
        let (coordinator, worker) = coordinator(backend, Arc::new(RecordingNotifier::default()));
        coordinator.book(alice_books(DENTIST_ID, SCENARIO_DATE, "08:00")).await.unwrap();
        worker.shutdown().await;
    }

    let reopened: Arc<dyn PersistenceBackend> = Arc::new(JsonFileBackend::open(&path).await.unwrap());
    let (coordinator, _worker) = coordinator(reopened, Arc::new(RecordingNotifier::default()));

    let repeat = coordinator.book(alice_books(DENTIST_ID, SCENARIO_DATE, "08:00")).await;
    assert_matches!(repeat, Err(BookingError::SlotUnavailable));

    let next = coordinator.book(alice_books(DENTIST_ID, SCENARIO_DATE, "09:00")).await.unwrap();
    assert_eq!(next.appointment.id, 2);
}
