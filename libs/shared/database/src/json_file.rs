use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use shared_models::{Appointment, Doctor, NewAppointment, Slot, SlotFilter, SlotKey};

use crate::backend::{BackendError, BackendResult, PersistenceBackend};

/// On-disk layout of the flat-file store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default)]
    pub doctors: Vec<Doctor>,
    #[serde(default)]
    pub slots: Vec<Slot>,
    #[serde(default)]
    pub appointments: Vec<Appointment>,
}

impl StoreDocument {
    fn next_appointment_id(&self) -> u64 {
        self.appointments.iter().map(|a| a.id).max().unwrap_or(0) + 1
    }
}

/// Single JSON document shared by all callers.
///
/// The document is loaded once and kept in memory behind a mutex. Mutations
/// are applied to a copy, written to disk, and only then swapped in, so the
/// in-memory view never runs ahead of the file and a dropped write leaves
/// memory untouched.
///
/// An exclusive OS lock on `<file>.lock` is held for the lifetime of the
/// backend, so at most one backend (in any process) owns a data file.
#[derive(Debug)]
pub struct JsonFileBackend {
    path: PathBuf,
    document: Mutex<StoreDocument>,
    _lock: File,
}

fn acquire_lock(path: &Path) -> BackendResult<File> {
    let lock_path = path.with_extension("json.lock");
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)?;

    fs2::FileExt::try_lock_exclusive(&file).map_err(|e| {
        BackendError::Unavailable(format!(
            "{} is in use by another process ({}): {}",
            path.display(),
            lock_path.display(),
            e
        ))
    })?;

    Ok(file)
}

impl JsonFileBackend {
    pub async fn open(path: impl AsRef<Path>) -> BackendResult<Self> {
        let path = path.as_ref().to_path_buf();
        let lock = acquire_lock(&path)?;

        let document = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str::<StoreDocument>(&raw).map_err(|e| {
                BackendError::Corrupt(format!("{}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("{} does not exist, starting with an empty store", path.display());
                StoreDocument::default()
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            "Loaded {} doctors, {} slots, {} appointments from {}",
            document.doctors.len(),
            document.slots.len(),
            document.appointments.len(),
            path.display()
        );

        Ok(Self {
            path,
            document: Mutex::new(document),
            _lock: lock,
        })
    }

    async fn persist(&self, document: &StoreDocument) -> BackendResult<()> {
        let payload = serde_json::to_vec_pretty(document)?;
        let tmp_path = self.path.with_extension("json.tmp");

        tokio::fs::write(&tmp_path, payload).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        debug!("Persisted store document to {}", self.path.display());
        Ok(())
    }
}

#[async_trait]
impl PersistenceBackend for JsonFileBackend {
    async fn get_doctor(&self, doctor_id: &str) -> BackendResult<Option<Doctor>> {
        let document = self.document.lock().await;
        Ok(document.doctors.iter().find(|d| d.id == doctor_id).cloned())
    }

    async fn list_doctors(&self) -> BackendResult<Vec<Doctor>> {
        Ok(self.document.lock().await.doctors.clone())
    }

    async fn query_slots(&self, filter: &SlotFilter) -> BackendResult<Vec<Slot>> {
        let document = self.document.lock().await;
        Ok(document
            .slots
            .iter()
            .filter(|slot| filter.accepts(slot))
            .cloned()
            .collect())
    }

    async fn conditional_reserve(&self, key: &SlotKey) -> BackendResult<bool> {
        let mut document = self.document.lock().await;

        let Some(index) = document
            .slots
            .iter()
            .position(|slot| slot.matches(key) && slot.available)
        else {
            return Ok(false);
        };

        let mut next = document.clone();
        next.slots[index].available = false;
        self.persist(&next).await.map_err(|e| {
            error!("Failed to persist reservation of {}: {}", key, e);
            e
        })?;
        *document = next;

        Ok(true)
    }

    async fn put_appointment(&self, appointment: NewAppointment) -> BackendResult<Appointment> {
        let mut document = self.document.lock().await;

        let stored = appointment.into_appointment(document.next_appointment_id());
        let mut next = document.clone();
        next.appointments.push(stored.clone());
        self.persist(&next).await.map_err(|e| {
            error!("Failed to persist appointment {}: {}", stored.id, e);
            e
        })?;
        *document = next;

        Ok(stored)
    }

    async fn list_appointments(&self) -> BackendResult<Vec<Appointment>> {
        Ok(self.document.lock().await.appointments.clone())
    }

    async fn insert_doctor(&self, doctor: Doctor) -> BackendResult<()> {
        let mut document = self.document.lock().await;

        let mut next = document.clone();
        match next.doctors.iter_mut().find(|d| d.id == doctor.id) {
            Some(existing) => *existing = doctor,
            None => next.doctors.push(doctor),
        }
        self.persist(&next).await?;
        *document = next;

        Ok(())
    }

    async fn insert_slot(&self, slot: Slot) -> BackendResult<()> {
        let mut document = self.document.lock().await;
        let key = slot.key();
        if document.slots.iter().any(|existing| existing.matches(&key)) {
            return Err(BackendError::DuplicateSlot(key));
        }

        let mut next = document.clone();
        next.slots.push(slot);
        self.persist(&next).await?;
        *document = next;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "json-file"
    }
}
