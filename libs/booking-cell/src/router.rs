use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::services::BookingCoordinator;

pub fn booking_routes(coordinator: Arc<BookingCoordinator>) -> Router {
    Router::new()
        .route("/book", post(handlers::book_appointment))
        .route("/appointments", get(handlers::list_appointments))
        .with_state(coordinator)
}
