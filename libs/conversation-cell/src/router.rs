use std::sync::Arc;

use axum::{routing::post, Router};

use crate::handlers;
use crate::services::engine::ConversationEngine;

pub fn conversation_routes(engine: Arc<ConversationEngine>) -> Router {
    Router::new()
        .route("/step", post(handlers::step))
        .route("/widget/code", post(handlers::widget_issue_code))
        .route("/widget/bookings", post(handlers::widget_reserve))
        .with_state(engine)
}
