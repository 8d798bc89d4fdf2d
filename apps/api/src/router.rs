use axum::{routing::get, Router};

use availability_cell::availability_routes;
use booking_cell::booking_routes;

use crate::app::AppServices;

pub fn create_router(services: AppServices) -> Router {
    Router::new()
        .route("/", get(|| async { "VetCare scheduling API is running!" }))
        .merge(availability_routes(services.availability))
        .merge(booking_routes(services.booking))
}
