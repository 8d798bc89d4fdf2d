use async_trait::async_trait;
use thiserror::Error;

use shared_models::{Appointment, Doctor, NewAppointment, Slot, SlotFilter, SlotKey};

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Duplicate slot: {0}")]
    DuplicateSlot(SlotKey),

    #[error("Corrupt storage document: {0}")]
    Corrupt(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Storage contract shared by every backend.
///
/// `conditional_reserve` must flip `available` from `true` to `false` as a
/// single atomic step: for one key, at most one caller ever sees `true`.
#[async_trait]
pub trait PersistenceBackend: Send + Sync {
    async fn get_doctor(&self, doctor_id: &str) -> BackendResult<Option<Doctor>>;

    async fn list_doctors(&self) -> BackendResult<Vec<Doctor>>;

    async fn query_slots(&self, filter: &SlotFilter) -> BackendResult<Vec<Slot>>;

    async fn conditional_reserve(&self, key: &SlotKey) -> BackendResult<bool>;

    /// Stores the appointment under a fresh, monotonically increasing id.
    async fn put_appointment(&self, appointment: NewAppointment) -> BackendResult<Appointment>;

    async fn list_appointments(&self) -> BackendResult<Vec<Appointment>>;

    async fn insert_doctor(&self, doctor: Doctor) -> BackendResult<()>;

    /// Fails with `DuplicateSlot` when the natural key already exists.
    async fn insert_slot(&self, slot: Slot) -> BackendResult<()>;

    fn name(&self) -> &'static str;
}
