use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    PendingConfirmation,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::PendingConfirmation => "pending_confirmation",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub client_id: String,
    pub provider_id: Uuid,
    pub service_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    /// Minutes the slot occupies, copied from the service at reserve time
    /// so later catalog edits cannot shift existing bookings.
    pub duration_minutes: i32,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReserveRequest {
    pub client_id: String,
    pub provider_id: Uuid,
    pub service_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("booking not found: {0}")]
    NotFound(Uuid),

    #[error("provider not found: {0}")]
    ProviderNotFound(Uuid),

    #[error("service not found: {0}")]
    ServiceNotFound(Uuid),

    #[error("slot is already taken")]
    SlotTaken,

    #[error("booking is {0}, transition not allowed")]
    InvalidTransition(BookingStatus),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(String),
}

impl From<shared_database::DbError> for BookingError {
    fn from(err: shared_database::DbError) -> Self {
        match err {
            shared_database::DbError::Conflict(_) => BookingError::SlotTaken,
            other => BookingError::Store(other.to_string()),
        }
    }
}

impl From<BookingError> for shared_models::AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::NotFound(id) => {
                shared_models::AppError::NotFound(format!("booking {}", id))
            }
            BookingError::ProviderNotFound(id) => {
                shared_models::AppError::NotFound(format!("provider {}", id))
            }
            BookingError::ServiceNotFound(id) => {
                shared_models::AppError::NotFound(format!("service {}", id))
            }
            BookingError::SlotTaken => {
                shared_models::AppError::SlotTaken("slot is already taken".to_string())
            }
            BookingError::InvalidTransition(status) => shared_models::AppError::InvalidTransition(
                format!("booking is {}", status),
            ),
            BookingError::Validation(msg) => shared_models::AppError::Validation(msg),
            BookingError::Store(msg) => shared_models::AppError::Store(msg),
        }
    }
}
