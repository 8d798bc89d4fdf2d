use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use shared_models::Doctor;

use crate::models::{Availability, AvailabilityCriteria, AvailableSlot, SlotStoreError};
use crate::services::slot_store::SlotStore;

pub struct AvailabilityService {
    store: Arc<SlotStore>,
}

impl AvailabilityService {
    pub fn new(store: Arc<SlotStore>) -> Self {
        Self { store }
    }

    /// Available slots matching `criteria`, earliest `(date, time)` first.
    ///
    /// Ordering is a stable sort on the raw strings; slots that tie on date
    /// and time keep the order the backend returned them in.
    pub async fn find_available(
        &self,
        criteria: AvailabilityCriteria,
    ) -> Result<Availability, SlotStoreError> {
        let criteria = criteria.normalized();
        debug!("Searching availability with {:?}", criteria);

        let slots = self.store.query(&criteria).await?;
        let doctors = self.store.matching_doctors(&criteria).await?;

        let by_id: HashMap<&str, &Doctor> = doctors.iter().map(|d| (d.id.as_str(), d)).collect();

        let mut available: Vec<AvailableSlot> = slots
            .into_iter()
            .filter_map(|slot| {
                let doctor = by_id.get(slot.doctor_id.as_str())?;
                Some(AvailableSlot {
                    doctor: doctor.name.clone(),
                    specialty: doctor.specialty.clone(),
                    date: slot.date,
                    time: slot.time,
                    doctor_id: slot.doctor_id,
                })
            })
            .collect();

        available.sort_by(|a, b| (&a.date, &a.time).cmp(&(&b.date, &b.time)));

        debug!("Found {} available slots", available.len());
        Ok(Availability::from_sorted(available))
    }
}
