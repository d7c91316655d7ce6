use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use catalog_cell::models::CatalogError;
use catalog_cell::services::catalog::CatalogService;
use shared_config::AppConfig;
use shared_database::PostgrestClient;

use crate::models::{Booking, BookingError, BookingStatus, ReserveRequest};
use crate::services::availability::AvailabilityService;
use crate::services::notifier::Notifier;

/// Append-and-transition ledger over the bookings table. Double booking
/// is prevented by a partial unique index on (provider_id, date, time)
/// covering non-cancelled rows; a violated insert comes back as 409 and
/// surfaces as `SlotTaken`, so there is no check-then-insert window.
pub struct BookingLedgerService {
    supabase: PostgrestClient,
    catalog: CatalogService,
    availability: AvailabilityService,
    notifier: Arc<dyn Notifier>,
}

impl BookingLedgerService {
    pub fn new(config: &AppConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            supabase: PostgrestClient::new(config),
            catalog: CatalogService::new(config),
            availability: AvailabilityService::new(config),
            notifier,
        }
    }

    /// Insert a booking for the requested slot. `confirmed` is the widget
    /// path where the code was already verified; the assistant flow starts
    /// in pending confirmation and gets promoted by `confirm`.
    pub async fn reserve(
        &self,
        request: ReserveRequest,
        confirmed: bool,
    ) -> Result<Booking, BookingError> {
        let service = self
            .catalog
            .get_service(request.service_id)
            .await
            .map_err(|e| match e {
                CatalogError::NotFound(_) => BookingError::ServiceNotFound(request.service_id),
                other => BookingError::Store(other.to_string()),
            })?;

        let free = self
            .availability
            .free_slots(request.provider_id, request.date, service.duration_minutes)
            .await?;
        if !free.contains(&request.time) {
            return Err(BookingError::SlotTaken);
        }

        let status = if confirmed {
            BookingStatus::Confirmed
        } else {
            BookingStatus::PendingConfirmation
        };

        let body = json!({
            "client_id": request.client_id,
            "provider_id": request.provider_id,
            "service_id": request.service_id,
            "date": request.date,
            "time": request.time,
            "duration_minutes": service.duration_minutes,
            "status": status,
            "created_at": Utc::now().to_rfc3339()
        });

        let rows = self
            .supabase
            .write_returning(Method::POST, "/rest/v1/bookings", body)
            .await?;

        let booking = parse_booking_row(rows.into_iter().next())?;
        debug!("Reserved booking {} as {}", booking.id, booking.status);

        let text = match status {
            BookingStatus::Confirmed => format!(
                "Your appointment on {} at {} is confirmed.",
                booking.date,
                booking.time.format("%H:%M")
            ),
            _ => format!(
                "Your appointment on {} at {} is placed and awaiting confirmation.",
                booking.date,
                booking.time.format("%H:%M")
            ),
        };
        self.notify(&booking.client_id, &text).await;

        Ok(booking)
    }

    /// Promote a pending booking to confirmed. The status filter makes the
    /// update a no-op on any other state, which we report as an invalid
    /// transition instead of silently succeeding.
    pub async fn confirm(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        let path = format!(
            "/rest/v1/bookings?id=eq.{}&status=eq.pending_confirmation",
            booking_id
        );
        let rows = self
            .supabase
            .write_returning(Method::PATCH, &path, json!({ "status": "confirmed" }))
            .await?;

        match rows.into_iter().next() {
            Some(row) => {
                let booking = parse_booking_row(Some(row))?;
                self.notify(
                    &booking.client_id,
                    &format!(
                        "Your appointment on {} at {} is confirmed.",
                        booking.date,
                        booking.time.format("%H:%M")
                    ),
                )
                .await;
                Ok(booking)
            }
            None => {
                let current = self.get_booking(booking_id).await?;
                Err(BookingError::InvalidTransition(current.status))
            }
        }
    }

    /// Cancel a booking. Cancelling an already cancelled booking is a
    /// no-op that returns the current row.
    pub async fn cancel(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        let current = self.get_booking(booking_id).await?;
        if current.status == BookingStatus::Cancelled {
            return Ok(current);
        }

        let path = format!(
            "/rest/v1/bookings?id=eq.{}&status=neq.cancelled",
            booking_id
        );
        let rows = self
            .supabase
            .write_returning(Method::PATCH, &path, json!({ "status": "cancelled" }))
            .await?;

        match rows.into_iter().next() {
            Some(row) => {
                let booking = parse_booking_row(Some(row))?;
                self.notify(
                    &booking.client_id,
                    &format!(
                        "Your appointment on {} at {} was cancelled.",
                        booking.date,
                        booking.time.format("%H:%M")
                    ),
                )
                .await;
                Ok(booking)
            }
            // lost a race to another cancel, the end state is the same
            None => self.get_booking(booking_id).await,
        }
    }

    pub async fn get_booking(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        let path = format!("/rest/v1/bookings?id=eq.{}", booking_id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;

        match rows.into_iter().next() {
            Some(row) => parse_booking_row(Some(row)),
            None => Err(BookingError::NotFound(booking_id)),
        }
    }

    /// Upcoming non-cancelled bookings for one client.
    pub async fn list_active_for_client(
        &self,
        client_id: &str,
    ) -> Result<Vec<Booking>, BookingError> {
        let path = format!(
            "/rest/v1/bookings?client_id=eq.{}&status=in.(pending_confirmation,confirmed)&order=date.asc,time.asc",
            urlencoding::encode(client_id)
        );
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;

        rows.into_iter().map(|row| parse_booking_row(Some(row))).collect()
    }

    pub async fn list_for_provider_on_date(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, BookingError> {
        let path = format!(
            "/rest/v1/bookings?provider_id=eq.{}&date=eq.{}&status=in.(pending_confirmation,confirmed)&order=time.asc",
            provider_id, date
        );
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;

        rows.into_iter().map(|row| parse_booking_row(Some(row))).collect()
    }

    async fn notify(&self, client_id: &str, text: &str) {
        if let Err(e) = self.notifier.send(client_id, text).await {
            warn!("Failed to notify client {}: {}", client_id, e);
        }
    }
}

fn parse_booking_row(row: Option<Value>) -> Result<Booking, BookingError> {
    let row = row.ok_or_else(|| BookingError::Store("write returned no rows".to_string()))?;
    serde_json::from_value(row).map_err(|e| BookingError::Store(e.to_string()))
}
