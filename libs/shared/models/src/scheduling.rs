use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub specialty: String,
    pub email: String,
}

impl Doctor {
    pub fn has_specialty(&self, specialty: &str) -> bool {
        self.specialty.to_lowercase() == specialty.to_lowercase()
    }
}

/// Natural key of a slot. Unique within a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    pub doctor_id: String,
    pub date: String,
    pub time: String,
}

impl SlotKey {
    pub fn new(
        doctor_id: impl Into<String>,
        date: impl Into<String>,
        time: impl Into<String>,
    ) -> Self {
        Self {
            doctor_id: doctor_id.into(),
            date: date.into(),
            time: time.into(),
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.doctor_id, self.date, self.time)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub doctor_id: String,
    pub date: String,
    pub time: String,
    pub available: bool,
}

impl Slot {
    pub fn open(
        doctor_id: impl Into<String>,
        date: impl Into<String>,
        time: impl Into<String>,
    ) -> Self {
        Self {
            doctor_id: doctor_id.into(),
            date: date.into(),
            time: time.into(),
            available: true,
        }
    }

    pub fn key(&self) -> SlotKey {
        SlotKey::new(&self.doctor_id, &self.date, &self.time)
    }

    pub fn matches(&self, key: &SlotKey) -> bool {
        self.doctor_id == key.doctor_id && self.date == key.date && self.time == key.time
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub doctor_id: String,
    pub date: String,
    pub time: String,
    pub client_name: String,
    pub pet_name: String,
    pub contact: String,
}

impl Appointment {
    pub fn slot_key(&self) -> SlotKey {
        SlotKey::new(&self.doctor_id, &self.date, &self.time)
    }
}

/// Appointment data before the backend assigns its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub timestamp: DateTime<Utc>,
    pub slot: SlotKey,
    pub client_name: String,
    pub pet_name: String,
    pub contact: String,
}

impl NewAppointment {
    pub fn into_appointment(self, id: u64) -> Appointment {
        Appointment {
            id,
            timestamp: self.timestamp,
            doctor_id: self.slot.doctor_id,
            date: self.slot.date,
            time: self.slot.time,
            client_name: self.client_name,
            pet_name: self.pet_name,
            contact: self.contact,
        }
    }
}

/// Backend-level slot selection. `None` means "no restriction".
#[derive(Debug, Clone, Default)]
pub struct SlotFilter {
    pub doctor_ids: Option<HashSet<String>>,
    pub date: Option<String>,
    pub available_only: bool,
}

impl SlotFilter {
    pub fn available() -> Self {
        Self {
            available_only: true,
            ..Self::default()
        }
    }

    pub fn accepts(&self, slot: &Slot) -> bool {
        if self.available_only && !slot.available {
            return false;
        }
        if let Some(date) = &self.date {
            if &slot.date != date {
                return false;
            }
        }
        match &self.doctor_ids {
            Some(ids) => ids.contains(&slot.doctor_id),
            None => true,
        }
    }
}

pub fn is_valid_date(value: &str) -> bool {
    NaiveDate::parse_from_str(value, DATE_FORMAT).is_ok()
}

/// Slot times are `HH:MM`, zero padded so string order matches clock order.
pub fn is_valid_time(value: &str) -> bool {
    value.len() == 5 && NaiveTime::parse_from_str(value, TIME_FORMAT).is_ok()
}
