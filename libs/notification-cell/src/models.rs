use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Everything the doctor needs to know about a fresh booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentNotice {
    pub appointment_id: u64,
    pub doctor_name: String,
    pub doctor_email: String,
    pub specialty: String,
    pub date: String,
    pub time: String,
    pub pet_name: String,
    pub client_name: String,
    pub contact: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone)]
pub struct NotificationJob {
    pub job_id: Uuid,
    pub notice: AppointmentNotice,
    pub enqueued_at: DateTime<Utc>,
}

impl NotificationJob {
    pub fn new(notice: AppointmentNotice) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            notice,
            enqueued_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NotificationStats {
    pub queued: u64,
    pub delivered: u64,
    pub failed: u64,
    pub dropped: u64,
}
