use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;

use crate::handlers;
use crate::services::notifier::Notifier;

#[derive(Clone)]
pub struct BookingState {
    pub config: Arc<AppConfig>,
    pub notifier: Arc<dyn Notifier>,
}

pub fn booking_routes(state: BookingState) -> Router {
    Router::new()
        .route("/availability", get(handlers::get_availability))
        .route("/clients/{client_id}", get(handlers::list_client_bookings))
        .route(
            "/providers/{provider_id}",
            get(handlers::list_provider_bookings),
        )
        .route("/{booking_id}", get(handlers::get_booking))
        .route("/{booking_id}/confirm", post(handlers::confirm_booking))
        .route("/{booking_id}/cancel", post(handlers::cancel_booking))
        .with_state(state)
}
