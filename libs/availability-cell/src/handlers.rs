use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use shared_models::error::AppError;

use crate::models::{Availability, AvailabilityCriteria, AvailabilityResponse, SlotStoreError};
use crate::services::AvailabilityService;

pub const NO_AVAILABILITY_MESSAGE: &str = "No available time slots found for the selected criteria.";

impl From<SlotStoreError> for AppError {
    fn from(e: SlotStoreError) -> Self {
        match e {
            SlotStoreError::NotFound => AppError::NotFound(e.to_string()),
            SlotStoreError::BackendUnavailable(msg) => AppError::Database(msg),
        }
    }
}

#[axum::debug_handler]
pub async fn get_availability(
    State(service): State<Arc<AvailabilityService>>,
    Query(criteria): Query<AvailabilityCriteria>,
) -> Result<Response, AppError> {
    let availability = service.find_available(criteria).await?;

    let response = match availability {
        Availability::NoMatches => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": NO_AVAILABILITY_MESSAGE })),
        )
            .into_response(),
        Availability::Slots(slots) => Json(AvailabilityResponse {
            total_found: slots.len(),
            slots,
        })
        .into_response(),
    };

    Ok(response)
}
