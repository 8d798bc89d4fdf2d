use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_models::{is_valid_date, is_valid_time, Appointment, Doctor, SlotKey};

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

/// Raw booking request. Every field is optional so that a missing field
/// surfaces as a validation error instead of a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BookAppointmentRequest {
    pub doctor_id: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub client_name: Option<String>,
    pub pet_name: Option<String>,
    pub contact: Option<String>,
}

/// A booking request that passed validation. Values are trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedBooking {
    pub slot: SlotKey,
    pub client_name: String,
    pub pet_name: String,
    pub contact: String,
}

impl BookAppointmentRequest {
    pub fn new(
        doctor_id: impl Into<String>,
        date: impl Into<String>,
        time: impl Into<String>,
        client_name: impl Into<String>,
        pet_name: impl Into<String>,
        contact: impl Into<String>,
    ) -> Self {
        Self {
            doctor_id: Some(doctor_id.into()),
            date: Some(date.into()),
            time: Some(time.into()),
            client_name: Some(client_name.into()),
            pet_name: Some(pet_name.into()),
            contact: Some(contact.into()),
        }
    }

    pub fn validate(&self) -> Result<ValidatedBooking, BookingError> {
        let fields = [
            ("doctor_id", &self.doctor_id),
            ("date", &self.date),
            ("time", &self.time),
            ("client_name", &self.client_name),
            ("pet_name", &self.pet_name),
            ("contact", &self.contact),
        ];

        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, value)| value.as_deref().map(str::trim).unwrap_or("").is_empty())
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            return Err(BookingError::ValidationError(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let field = |value: &Option<String>| value.as_deref().unwrap_or_default().trim().to_string();

        let date = field(&self.date);
        if !is_valid_date(&date) {
            return Err(BookingError::ValidationError(format!(
                "Invalid date '{}', expected YYYY-MM-DD",
                date
            )));
        }

        let time = field(&self.time);
        if !is_valid_time(&time) {
            return Err(BookingError::ValidationError(format!(
                "Invalid time '{}', expected HH:MM",
                time
            )));
        }

        Ok(ValidatedBooking {
            slot: SlotKey::new(field(&self.doctor_id), date, time),
            client_name: field(&self.client_name),
            pet_name: field(&self.pet_name),
            contact: field(&self.contact),
        })
    }
}

// ==============================================================================
// RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingSummary {
    pub protocol: u64,
    pub doctor: String,
    pub specialty: String,
    pub date: String,
    pub time: String,
    pub pet: String,
}

impl BookingSummary {
    pub fn new(appointment: &Appointment, doctor: &Doctor) -> Self {
        Self {
            protocol: appointment.id,
            doctor: doctor.name.clone(),
            specialty: doctor.specialty.clone(),
            date: appointment.date.clone(),
            time: appointment.time.clone(),
            pet: appointment.pet_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingConfirmation {
    pub appointment: Appointment,
    pub summary: BookingSummary,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AppointmentListResponse {
    pub total: usize,
    pub appointments: Vec<Appointment>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    #[error("{0}")]
    ValidationError(String),

    #[error("Slot not found or already booked")]
    SlotUnavailable,

    #[error("Doctor not found: {0}")]
    DoctorNotFound(String),

    #[error("Storage unavailable: {0}")]
    BackendUnavailable(String),
}
