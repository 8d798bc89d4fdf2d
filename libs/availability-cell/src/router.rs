use std::sync::Arc;

use axum::{routing::get, Router};

use crate::handlers;
use crate::services::AvailabilityService;

pub fn availability_routes(service: Arc<AvailabilityService>) -> Router {
    Router::new()
        .route("/availability", get(handlers::get_availability))
        .with_state(service)
}
