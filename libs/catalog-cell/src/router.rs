use std::sync::Arc;

use axum::{routing::get, Router};

use shared_config::AppConfig;

use crate::handlers;

pub fn catalog_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/services", get(handlers::list_services))
        .route("/providers", get(handlers::list_providers))
        .route(
            "/providers/{provider_id}/schedule",
            get(handlers::get_provider_schedule),
        )
        .with_state(state)
}
