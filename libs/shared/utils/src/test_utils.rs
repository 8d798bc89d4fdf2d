use std::sync::Arc;

use serde_json::{json, Value};

use shared_config::{AppConfig, StorageBackend};
use shared_database::{InMemoryBackend, PersistenceBackend};
use shared_models::{Doctor, Slot};

pub const DENTIST_ID: &str = "D1";
pub const CARDIOLOGIST_ID: &str = "D2";
pub const SCENARIO_DATE: &str = "2025-01-10";

pub struct TestConfig {
    pub reserve_timeout_ms: u64,
    pub notification_queue_capacity: usize,
    pub mail_relay_url: Option<String>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            reserve_timeout_ms: 500,
            notification_queue_capacity: 16,
            mail_relay_url: None,
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            storage_backend: StorageBackend::Memory,
            reserve_timeout_ms: self.reserve_timeout_ms,
            notification_queue_capacity: self.notification_queue_capacity,
            mail_relay_url: self.mail_relay_url.clone(),
            ..AppConfig::default()
        }
    }
}

pub struct SchedulingFixtures;

impl SchedulingFixtures {
    pub fn dentist() -> Doctor {
        Doctor {
            id: DENTIST_ID.to_string(),
            name: "Ana Souza".to_string(),
            specialty: "Dentistry".to_string(),
            email: "ana.souza@vetcare.local".to_string(),
        }
    }

    pub fn cardiologist() -> Doctor {
        Doctor {
            id: CARDIOLOGIST_ID.to_string(),
            name: "Bruno Lima".to_string(),
            specialty: "Cardiology".to_string(),
            email: "bruno.lima@vetcare.local".to_string(),
        }
    }

    /// Slots deliberately inserted out of chronological order.
    pub fn slots() -> Vec<Slot> {
        vec![
            Slot::open(DENTIST_ID, SCENARIO_DATE, "09:00"),
            Slot::open(DENTIST_ID, SCENARIO_DATE, "08:00"),
            Slot::open(DENTIST_ID, "2025-01-11", "08:30"),
            Slot::open(CARDIOLOGIST_ID, "2025-01-09", "14:00"),
            Slot::open(CARDIOLOGIST_ID, SCENARIO_DATE, "08:00"),
        ]
    }

    pub async fn seed(backend: &dyn PersistenceBackend) {
        backend.insert_doctor(Self::dentist()).await.expect("seed dentist");
        backend.insert_doctor(Self::cardiologist()).await.expect("seed cardiologist");
        for slot in Self::slots() {
            backend.insert_slot(slot).await.expect("seed slot");
        }
    }

    pub async fn seeded_backend() -> Arc<dyn PersistenceBackend> {
        let backend = Arc::new(InMemoryBackend::new());
        Self::seed(backend.as_ref()).await;
        backend
    }

    pub fn booking_body(doctor_id: &str, date: &str, time: &str) -> Value {
        json!({
            "doctor_id": doctor_id,
            "date": date,
            "time": time,
            "client_name": "Alice",
            "pet_name": "Rex",
            "contact": "555-0001"
        })
    }
}
