use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use shared_models::{is_valid_date, is_valid_time, Doctor, NewAppointment, Slot, SlotKey};

use crate::backend::{BackendError, PersistenceBackend};

/// A booking carried by a seed file. It must point at one of the seed's
/// unavailable slots. Protocol numbers are assigned by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedAppointment {
    pub doctor_id: String,
    pub date: String,
    pub time: String,
    pub client_name: String,
    pub pet_name: String,
    pub contact: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl SeedAppointment {
    fn slot_key(&self) -> SlotKey {
        SlotKey::new(&self.doctor_id, &self.date, &self.time)
    }

    fn to_new_appointment(&self) -> NewAppointment {
        NewAppointment {
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            slot: self.slot_key(),
            client_name: self.client_name.clone(),
            pet_name: self.pet_name.clone(),
            contact: self.contact.clone(),
        }
    }
}

/// Reference data loaded into a backend at startup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub doctors: Vec<Doctor>,
    #[serde(default)]
    pub slots: Vec<Slot>,
    #[serde(default)]
    pub appointments: Vec<SeedAppointment>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub doctors: usize,
    pub slots_inserted: usize,
    pub slots_skipped: usize,
    pub appointments: usize,
}

impl SeedData {
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading seed file {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing seed file {}", path.display()))
    }

    /// Rejects the whole seed unless every slot is well formed and belongs to
    /// a seeded doctor, and every unavailable slot has exactly one appointment.
    fn validate(&self) -> Result<HashMap<SlotKey, &SeedAppointment>> {
        let doctor_ids: HashSet<&str> = self.doctors.iter().map(|d| d.id.as_str()).collect();

        let mut unavailable = HashSet::new();
        for slot in &self.slots {
            if !is_valid_date(&slot.date) || !is_valid_time(&slot.time) {
                bail!(
                    "slot {} has a malformed date or time (expected YYYY-MM-DD and HH:MM)",
                    slot.key()
                );
            }
            if !doctor_ids.contains(slot.doctor_id.as_str()) {
                bail!("slot {} belongs to unknown doctor {}", slot.key(), slot.doctor_id);
            }
            if !slot.available {
                unavailable.insert(slot.key());
            }
        }

        let mut bookings = HashMap::new();
        for appointment in &self.appointments {
            let key = appointment.slot_key();
            if !unavailable.contains(&key) {
                bail!("appointment for {} does not match an unavailable seed slot", key);
            }
            if bookings.insert(key.clone(), appointment).is_some() {
                bail!("slot {} has more than one appointment", key);
            }
        }

        if let Some(orphan) = unavailable.iter().find(|key| !bookings.contains_key(*key)) {
            return Err(anyhow!("unavailable slot {} has no appointment", orphan));
        }

        Ok(bookings)
    }

    /// Writes doctors, slots and their appointments into `backend`. Slots
    /// already present are skipped together with their appointment, so a seed
    /// can be re-applied to a persistent store.
    pub async fn apply(&self, backend: &dyn PersistenceBackend) -> Result<SeedReport> {
        let bookings = self.validate()?;

        let mut report = SeedReport::default();

        for doctor in &self.doctors {
            backend.insert_doctor(doctor.clone()).await?;
            report.doctors += 1;
        }

        for slot in &self.slots {
            match backend.insert_slot(slot.clone()).await {
                Ok(()) => report.slots_inserted += 1,
                Err(BackendError::DuplicateSlot(key)) => {
                    warn!("Seed slot {} already exists, skipping", key);
                    report.slots_skipped += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            if let Some(appointment) = bookings.get(&slot.key()) {
                let stored = backend.put_appointment(appointment.to_new_appointment()).await?;
                info!("Seeded appointment {} for slot {}", stored.id, slot.key());
                report.appointments += 1;
            }
        }

        info!(
            "Seeded {} backend: {} doctors, {} slots ({} skipped), {} appointments",
            backend.name(),
            report.doctors,
            report.slots_inserted,
            report.slots_skipped,
            report.appointments
        );

        Ok(report)
    }
}
