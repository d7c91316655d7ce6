use std::sync::Arc;

use axum::{routing::get, Router};

use booking_cell::router::{booking_routes, BookingState};
use booking_cell::services::notifier::Notifier;
use catalog_cell::router::catalog_routes;
use conversation_cell::router::conversation_routes;
use conversation_cell::services::engine::ConversationEngine;
use shared_config::AppConfig;

pub fn create_router(
    state: Arc<AppConfig>,
    engine: Arc<ConversationEngine>,
    notifier: Arc<dyn Notifier>,
) -> Router {
    Router::new()
        .route("/", get(|| async { "Appointment API is running!" }))
        .nest("/catalog", catalog_routes(state.clone()))
        .nest(
            "/bookings",
            booking_routes(BookingState {
                config: state,
                notifier,
            }),
        )
        .nest("/conversation", conversation_routes(engine))
}
