use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::AppError;

use crate::models::BookingError;
use crate::router::BookingState;
use crate::services::availability::AvailabilityService;
use crate::services::ledger::BookingLedgerService;

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub provider_id: Uuid,
    pub service_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct ProviderBookingsQuery {
    pub date: NaiveDate,
}

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<BookingState>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    let catalog = catalog_cell::CatalogService::new(&state.config);
    let service = catalog
        .get_service(query.service_id)
        .await
        .map_err(|_| BookingError::ServiceNotFound(query.service_id))?;

    let availability = AvailabilityService::new(&state.config);
    let slots = availability
        .free_slots(query.provider_id, query.date, service.duration_minutes)
        .await?;

    let times: Vec<String> = slots.iter().map(|t| t.format("%H:%M").to_string()).collect();

    Ok(Json(json!({
        "provider_id": query.provider_id,
        "date": query.date,
        "duration_minutes": service.duration_minutes,
        "slots": times
    })))
}

#[axum::debug_handler]
pub async fn get_booking(
    State(state): State<BookingState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let ledger = BookingLedgerService::new(&state.config, state.notifier.clone());
    let booking = ledger.get_booking(booking_id).await?;

    Ok(Json(json!(booking)))
}

#[axum::debug_handler]
pub async fn confirm_booking(
    State(state): State<BookingState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let ledger = BookingLedgerService::new(&state.config, state.notifier.clone());
    let booking = ledger.confirm(booking_id).await?;

    Ok(Json(json!(booking)))
}

#[axum::debug_handler]
pub async fn cancel_booking(
    State(state): State<BookingState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let ledger = BookingLedgerService::new(&state.config, state.notifier.clone());
    let booking = ledger.cancel(booking_id).await?;

    Ok(Json(json!(booking)))
}

#[axum::debug_handler]
pub async fn list_client_bookings(
    State(state): State<BookingState>,
    Path(client_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let ledger = BookingLedgerService::new(&state.config, state.notifier.clone());
    let bookings = ledger.list_active_for_client(&client_id).await?;

    Ok(Json(json!({
        "bookings": bookings,
        "total": bookings.len()
    })))
}

#[axum::debug_handler]
pub async fn list_provider_bookings(
    State(state): State<BookingState>,
    Path(provider_id): Path<Uuid>,
    Query(query): Query<ProviderBookingsQuery>,
) -> Result<Json<Value>, AppError> {
    let ledger = BookingLedgerService::new(&state.config, state.notifier.clone());
    let bookings = ledger
        .list_for_provider_on_date(provider_id, query.date)
        .await?;

    Ok(Json(json!({
        "bookings": bookings,
        "total": bookings.len()
    })))
}
