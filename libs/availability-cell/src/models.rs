use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_models::SlotKey;

/// Filters accepted by the availability search. Blank values count as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AvailabilityCriteria {
    pub specialty: Option<String>,
    pub date: Option<String>,
    pub doctor_id: Option<String>,
}

impl AvailabilityCriteria {
    pub fn normalized(self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            specialty: clean(self.specialty),
            date: clean(self.date),
            doctor_id: clean(self.doctor_id),
        }
    }

    pub fn specialty(mut self, specialty: impl Into<String>) -> Self {
        self.specialty = Some(specialty.into());
        self
    }

    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn doctor(mut self, doctor_id: impl Into<String>) -> Self {
        self.doctor_id = Some(doctor_id.into());
        self
    }
}

/// A bookable slot joined with its doctor's public details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableSlot {
    pub doctor: String,
    pub specialty: String,
    pub date: String,
    pub time: String,
    pub doctor_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    NoMatches,
    /// Earliest first; never empty.
    Slots(Vec<AvailableSlot>),
}

impl Availability {
    pub fn from_sorted(slots: Vec<AvailableSlot>) -> Self {
        if slots.is_empty() {
            Availability::NoMatches
        } else {
            Availability::Slots(slots)
        }
    }

    pub fn earliest(&self) -> Option<&AvailableSlot> {
        match self {
            Availability::NoMatches => None,
            Availability::Slots(slots) => slots.first(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Availability::NoMatches => 0,
            Availability::Slots(slots) => slots.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Availability::NoMatches)
    }
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub total_found: usize,
    pub slots: Vec<AvailableSlot>,
}

/// Proof that a reservation succeeded. Only `SlotStore::reserve` creates one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotHandle {
    key: SlotKey,
}

impl SlotHandle {
    pub(crate) fn new(key: SlotKey) -> Self {
        Self { key }
    }

    pub fn key(&self) -> &SlotKey {
        &self.key
    }

    pub fn into_key(self) -> SlotKey {
        self.key
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotStoreError {
    /// No slot with that key, or it is already reserved.
    #[error("Slot not found or already booked")]
    NotFound,

    #[error("Slot storage unavailable: {0}")]
    BackendUnavailable(String),
}
