use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use shared_models::AppError;

use crate::models::{StepInput, WidgetReserveRequest};
use crate::services::engine::ConversationEngine;

#[derive(Debug, Deserialize)]
pub struct StepRequest {
    pub client_id: String,
    #[serde(flatten)]
    pub input: StepInput,
}

#[derive(Debug, Deserialize)]
pub struct WidgetCodeRequest {
    pub phone: String,
}

#[axum::debug_handler]
pub async fn step(
    State(engine): State<Arc<ConversationEngine>>,
    Json(request): Json<StepRequest>,
) -> Result<Json<Value>, AppError> {
    let prompt = engine.handle(&request.client_id, request.input).await?;

    Ok(Json(json!(prompt)))
}

#[axum::debug_handler]
pub async fn widget_issue_code(
    State(engine): State<Arc<ConversationEngine>>,
    Json(request): Json<WidgetCodeRequest>,
) -> Result<Json<Value>, AppError> {
    engine.widget_issue_code(&request.phone, Utc::now()).await?;

    Ok(Json(json!({ "status": "sent" })))
}

#[axum::debug_handler]
pub async fn widget_reserve(
    State(engine): State<Arc<ConversationEngine>>,
    Json(request): Json<WidgetReserveRequest>,
) -> Result<Json<Value>, AppError> {
    let booking = engine.widget_reserve(request, Utc::now()).await?;

    Ok(Json(json!(booking)))
}
