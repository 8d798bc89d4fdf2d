use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use shared_models::{Appointment, Doctor, NewAppointment, Slot, SlotFilter, SlotKey};

use crate::backend::{BackendError, BackendResult, PersistenceBackend};

/// Process-local backend.
///
/// Each slot's availability lives in its own `AtomicBool`; reservation is a
/// `compare_exchange(true, false)` on that flag, so the map lock is only ever
/// taken for reading on the hot path.
pub struct InMemoryBackend {
    doctors: RwLock<HashMap<String, Doctor>>,
    slots: RwLock<BTreeMap<SlotKey, Arc<AtomicBool>>>,
    appointments: RwLock<Vec<Appointment>>,
    next_appointment_id: AtomicU64,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            doctors: RwLock::new(HashMap::new()),
            slots: RwLock::new(BTreeMap::new()),
            appointments: RwLock::new(Vec::new()),
            next_appointment_id: AtomicU64::new(1),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistenceBackend for InMemoryBackend {
    async fn get_doctor(&self, doctor_id: &str) -> BackendResult<Option<Doctor>> {
        Ok(self.doctors.read().await.get(doctor_id).cloned())
    }

    async fn list_doctors(&self) -> BackendResult<Vec<Doctor>> {
        let mut doctors: Vec<Doctor> = self.doctors.read().await.values().cloned().collect();
        doctors.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(doctors)
    }

    async fn query_slots(&self, filter: &SlotFilter) -> BackendResult<Vec<Slot>> {
        let slots = self.slots.read().await;
        let matching = slots
            .iter()
            .map(|(key, flag)| Slot {
                doctor_id: key.doctor_id.clone(),
                date: key.date.clone(),
                time: key.time.clone(),
                available: flag.load(Ordering::Acquire),
            })
            .filter(|slot| filter.accepts(slot))
            .collect();
        Ok(matching)
    }

    async fn conditional_reserve(&self, key: &SlotKey) -> BackendResult<bool> {
        let flag = match self.slots.read().await.get(key) {
            Some(flag) => Arc::clone(flag),
            None => return Ok(false),
        };

        let reserved = flag
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        debug!("In-memory reserve of {} -> {}", key, reserved);
        Ok(reserved)
    }

    async fn put_appointment(&self, appointment: NewAppointment) -> BackendResult<Appointment> {
        let mut appointments = self.appointments.write().await;
        // Allocated under the write lock so list order follows id order.
        let id = self.next_appointment_id.fetch_add(1, Ordering::SeqCst);
        let stored = appointment.into_appointment(id);
        appointments.push(stored.clone());
        Ok(stored)
    }

    async fn list_appointments(&self) -> BackendResult<Vec<Appointment>> {
        Ok(self.appointments.read().await.clone())
    }

    async fn insert_doctor(&self, doctor: Doctor) -> BackendResult<()> {
        self.doctors.write().await.insert(doctor.id.clone(), doctor);
        Ok(())
    }

    async fn insert_slot(&self, slot: Slot) -> BackendResult<()> {
        let mut slots = self.slots.write().await;
        let key = slot.key();
        if slots.contains_key(&key) {
            return Err(BackendError::DuplicateSlot(key));
        }
        slots.insert(key, Arc::new(AtomicBool::new(slot.available)));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;

    fn doctor(id: &str, specialty: &str) -> Doctor {
        Doctor {
            id: id.to_string(),
            name: format!("Dr. {}", id),
            specialty: specialty.to_string(),
            email: format!("{}@vetcare.local", id.to_lowercase()),
        }
    }

    #[tokio::test]
    async fn reserve_flips_slot_exactly_once() {
        let backend = InMemoryBackend::new();
        backend.insert_slot(Slot::open("D1", "2025-01-10", "08:00")).await.unwrap();
        let key = SlotKey::new("D1", "2025-01-10", "08:00");

        assert!(backend.conditional_reserve(&key).await.unwrap());
        assert!(!backend.conditional_reserve(&key).await.unwrap());

        let all = backend.query_slots(&SlotFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(!all[0].available);
    }

    #[tokio::test]
    async fn reserve_of_unknown_slot_is_false() {
        let backend = InMemoryBackend::new();
        let key = SlotKey::new("D9", "2025-01-10", "08:00");
        assert!(!backend.conditional_reserve(&key).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_slot_is_rejected() {
        let backend = InMemoryBackend::new();
        backend.insert_slot(Slot::open("D1", "2025-01-10", "08:00")).await.unwrap();
        let result = backend.insert_slot(Slot::open("D1", "2025-01-10", "08:00")).await;
        assert_matches!(result, Err(BackendError::DuplicateSlot(_)));
    }

    #[tokio::test]
    async fn appointment_ids_increase_from_one() {
        let backend = InMemoryBackend::new();
        backend.insert_doctor(doctor("D1", "Dentistry")).await.unwrap();

        for expected in 1..=3u64 {
            let stored = backend
                .put_appointment(NewAppointment {
                    timestamp: Utc::now(),
                    slot: SlotKey::new("D1", "2025-01-10", format!("0{}:00", expected)),
                    client_name: "Alice".into(),
                    pet_name: "Rex".into(),
                    contact: "555-0001".into(),
                })
                .await
                .unwrap();
            assert_eq!(stored.id, expected);
        }

        assert_eq!(backend.list_appointments().await.unwrap().len(), 3);
        assert_eq!(backend.get_doctor("D1").await.unwrap().unwrap().specialty, "Dentistry");
    }
}
