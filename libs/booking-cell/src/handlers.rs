use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use shared_models::error::AppError;

use crate::models::{AppointmentListResponse, BookAppointmentRequest, BookingError};
use crate::services::BookingCoordinator;

pub const BOOKED_MESSAGE: &str = "Appointment booked successfully!";

impl From<BookingError> for AppError {
    fn from(e: BookingError) -> Self {
        match e {
            BookingError::ValidationError(msg) => AppError::ValidationError(msg),
            BookingError::SlotUnavailable | BookingError::DoctorNotFound(_) => AppError::NotFound(e.to_string()),
            BookingError::BackendUnavailable(msg) => AppError::Database(msg),
        }
    }
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(coordinator): State<Arc<BookingCoordinator>>,
    payload: Result<Json<BookAppointmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(request) = payload.map_err(|rejection| {
        debug!("Rejected booking body: {}", rejection.body_text());
        AppError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    })?;

    let confirmation = coordinator.book(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": BOOKED_MESSAGE,
            "details": confirmation.summary,
        })),
    ))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(coordinator): State<Arc<BookingCoordinator>>,
) -> Result<Json<AppointmentListResponse>, AppError> {
    let appointments = coordinator.list_appointments().await?;

    Ok(Json(AppointmentListResponse {
        total: appointments.len(),
        appointments,
    }))
}
