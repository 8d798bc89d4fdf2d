use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};

use availability_cell::{SlotStore, SlotStoreError};
use notification_cell::{AppointmentNotice, NotificationDispatcher};
use shared_database::BackendError;
use shared_models::{Appointment, Doctor, NewAppointment, SlotKey};

use crate::models::{BookAppointmentRequest, BookingConfirmation, BookingError, BookingSummary, ValidatedBooking};

impl From<SlotStoreError> for BookingError {
    fn from(e: SlotStoreError) -> Self {
        match e {
            SlotStoreError::NotFound => BookingError::SlotUnavailable,
            SlotStoreError::BackendUnavailable(msg) => BookingError::BackendUnavailable(msg),
        }
    }
}

impl From<BackendError> for BookingError {
    fn from(e: BackendError) -> Self {
        BookingError::BackendUnavailable(e.to_string())
    }
}

/// Turns a booking request into a committed appointment.
///
/// The slot reservation is the commit point: once `reserve` succeeds the slot
/// never becomes available again, whatever happens afterwards.
pub struct BookingCoordinator {
    store: Arc<SlotStore>,
    dispatcher: NotificationDispatcher,
}

impl BookingCoordinator {
    pub fn new(store: Arc<SlotStore>, dispatcher: NotificationDispatcher) -> Self {
        Self { store, dispatcher }
    }

    #[instrument(skip(self, request))]
    pub async fn book(&self, request: BookAppointmentRequest) -> Result<BookingConfirmation, BookingError> {
        let booking = request.validate()?;
        debug!("Booking request validated for slot {}", booking.slot);

        let handle = self.store.reserve(booking.slot.clone()).await.map_err(|e| {
            info!("Reservation of {} rejected: {}", booking.slot, e);
            BookingError::from(e)
        })?;

        let doctor = match self.store.doctor(&handle.key().doctor_id).await? {
            Some(doctor) => doctor,
            None => {
                error!(
                    "Slot {} was reserved but doctor {} does not exist; the slot stays reserved without an appointment",
                    handle.key(),
                    handle.key().doctor_id
                );
                return Err(BookingError::DoctorNotFound(handle.key().doctor_id.clone()));
            }
        };

        let appointment = self.record(handle.into_key(), booking).await?;
        info!(
            "Appointment {} booked with {} on {} at {}",
            appointment.id, doctor.name, appointment.date, appointment.time
        );

        self.notify(&appointment, &doctor);

        Ok(BookingConfirmation {
            summary: BookingSummary::new(&appointment, &doctor),
            appointment,
        })
    }

    pub async fn list_appointments(&self) -> Result<Vec<Appointment>, BookingError> {
        let mut appointments = self.store.backend().list_appointments().await?;
        appointments.sort_by_key(|appointment| appointment.id);
        Ok(appointments)
    }

    async fn record(
        &self,
        slot: SlotKey,
        booking: ValidatedBooking,
    ) -> Result<Appointment, BookingError> {
        let new_appointment = NewAppointment {
            timestamp: Utc::now(),
            slot,
            client_name: booking.client_name,
            pet_name: booking.pet_name,
            contact: booking.contact,
        };
        let slot = new_appointment.slot.clone();

        self.store
            .backend()
            .put_appointment(new_appointment)
            .await
            .map_err(|e| {
                error!("Slot {} is reserved but the appointment could not be stored: {}", slot, e);
                BookingError::from(e)
            })
    }

    fn notify(&self, appointment: &Appointment, doctor: &Doctor) {
        let notice = AppointmentNotice {
            appointment_id: appointment.id,
            doctor_name: doctor.name.clone(),
            doctor_email: doctor.email.clone(),
            specialty: doctor.specialty.clone(),
            date: appointment.date.clone(),
            time: appointment.time.clone(),
            pet_name: appointment.pet_name.clone(),
            client_name: appointment.client_name.clone(),
            contact: appointment.contact.clone(),
        };

        if let Err(e) = self.dispatcher.dispatch(notice) {
            warn!("Appointment {} committed without a doctor notification: {}", appointment.id, e);
        }
    }
}
