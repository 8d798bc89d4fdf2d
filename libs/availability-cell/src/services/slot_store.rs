use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use shared_database::{BackendError, PersistenceBackend};
use shared_models::{Doctor, Slot, SlotFilter, SlotKey};

use crate::models::{AvailabilityCriteria, SlotHandle, SlotStoreError};

impl From<BackendError> for SlotStoreError {
    fn from(e: BackendError) -> Self {
        SlotStoreError::BackendUnavailable(e.to_string())
    }
}

/// Owner of slot state. The only component allowed to mutate a slot, and
/// only through `reserve`.
pub struct SlotStore {
    backend: Arc<dyn PersistenceBackend>,
    reserve_timeout: Duration,
}

impl SlotStore {
    pub fn new(backend: Arc<dyn PersistenceBackend>, reserve_timeout: Duration) -> Self {
        Self {
            backend,
            reserve_timeout,
        }
    }

    pub fn backend(&self) -> &Arc<dyn PersistenceBackend> {
        &self.backend
    }

    pub async fn doctor(&self, doctor_id: &str) -> Result<Option<Doctor>, SlotStoreError> {
        Ok(self.backend.get_doctor(doctor_id).await?)
    }

    /// Doctors selected by the specialty (case-insensitive) and id filters.
    pub async fn matching_doctors(
        &self,
        criteria: &AvailabilityCriteria,
    ) -> Result<Vec<Doctor>, SlotStoreError> {
        let doctors = self.backend.list_doctors().await?;
        Ok(doctors
            .into_iter()
            .filter(|doctor| {
                criteria
                    .specialty
                    .as_deref()
                    .map_or(true, |specialty| doctor.has_specialty(specialty))
            })
            .filter(|doctor| {
                criteria
                    .doctor_id
                    .as_deref()
                    .map_or(true, |id| doctor.id == id)
            })
            .collect())
    }

    /// Slots owned by `doctors`, optionally restricted to one date.
    async fn slots_for(
        &self,
        doctors: &[Doctor],
        date: Option<&str>,
        available_only: bool,
    ) -> Result<Vec<Slot>, SlotStoreError> {
        if doctors.is_empty() {
            return Ok(Vec::new());
        }

        let filter = SlotFilter {
            doctor_ids: Some(doctors.iter().map(|d| d.id.clone()).collect::<HashSet<_>>()),
            date: date.map(str::to_string),
            available_only,
        };
        Ok(self.backend.query_slots(&filter).await?)
    }

    /// Read-only lookup of available slots matching `criteria`.
    pub async fn query(&self, criteria: &AvailabilityCriteria) -> Result<Vec<Slot>, SlotStoreError> {
        let doctors = self.matching_doctors(criteria).await?;
        self.slots_for(&doctors, criteria.date.as_deref(), true).await
    }

    /// Atomically moves the slot from available to reserved.
    ///
    /// Concurrent callers on one key are totally ordered by the backend's
    /// conditional update: exactly one gets a handle, the rest `NotFound`.
    /// The wait is bounded by the configured reserve timeout.
    #[instrument(skip(self), fields(slot = %key))]
    pub async fn reserve(&self, key: SlotKey) -> Result<SlotHandle, SlotStoreError> {
        let outcome = timeout(self.reserve_timeout, self.backend.conditional_reserve(&key)).await;

        match outcome {
            Ok(Ok(true)) => {
                info!("Slot reserved");
                Ok(SlotHandle::new(key))
            }
            Ok(Ok(false)) => {
                debug!("Slot not found or already booked");
                Err(SlotStoreError::NotFound)
            }
            Ok(Err(e)) => {
                warn!("Reservation failed in {} backend: {}", self.backend.name(), e);
                Err(e.into())
            }
            Err(_) => {
                warn!("Reservation timed out after {:?}", self.reserve_timeout);
                Err(SlotStoreError::BackendUnavailable(format!(
                    "reservation timed out after {} ms",
                    self.reserve_timeout.as_millis()
                )))
            }
        }
    }
}
