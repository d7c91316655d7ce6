use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::AppError;

use crate::services::catalog::CatalogService;

#[axum::debug_handler]
pub async fn list_services(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let catalog = CatalogService::new(&state);
    let grouped = catalog.services_by_category().await?;

    Ok(Json(json!({ "services": grouped })))
}

#[axum::debug_handler]
pub async fn list_providers(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let catalog = CatalogService::new(&state);
    let providers = catalog.list_providers().await?;

    Ok(Json(json!({
        "providers": providers,
        "total": providers.len()
    })))
}

#[axum::debug_handler]
pub async fn get_provider_schedule(
    State(state): State<Arc<AppConfig>>,
    Path(provider_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let catalog = CatalogService::new(&state);

    // 404 for unknown providers rather than an empty schedule list
    let provider = catalog.get_provider(provider_id).await?;
    let schedules = catalog.schedules_for_provider(provider_id).await?;

    Ok(Json(json!({
        "provider_id": provider.id,
        "schedules": schedules
    })))
}
