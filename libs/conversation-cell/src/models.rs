use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use booking_cell::models::BookingError;
use catalog_cell::models::{CatalogError, Provider, Service};

/// Service picked earlier in the flow. The duration is copied here so
/// the rest of the flow works from the value the client saw.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ServiceChoice {
    pub service_id: Uuid,
    pub duration_minutes: i32,
}

/// Where a client currently is in the booking dialogue. Each variant
/// carries everything collected so far, so resuming needs no other state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ConversationState {
    ChoosingService,
    ChoosingProvider {
        service: ServiceChoice,
    },
    ChoosingDate {
        service: ServiceChoice,
        provider_id: Uuid,
    },
    ChoosingTime {
        service: ServiceChoice,
        provider_id: Uuid,
        date: NaiveDate,
    },
    EnteringPhone {
        service: ServiceChoice,
        provider_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    },
    EnteringCode {
        service: ServiceChoice,
        provider_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        phone: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredConversation {
    pub state: ConversationState,
    pub created_at: DateTime<Utc>,
}

/// One client action against the dialogue.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepInput {
    StartBooking,
    CancelFlow,
    Service { service_id: Uuid },
    Provider { provider_id: Uuid },
    Date { date: NaiveDate },
    Time { time: NaiveTime },
    Text { text: String },
}

/// What the client should be shown next.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "prompt", rename_all = "snake_case")]
pub enum Prompt {
    ChooseService {
        services: BTreeMap<String, Vec<Service>>,
    },
    ChooseProvider {
        providers: Vec<Provider>,
    },
    ChooseDate {
        dates: Vec<NaiveDate>,
    },
    ChooseTime {
        times: Vec<String>,
    },
    EnterPhone,
    EnterCode {
        phone: String,
    },
    BookingPlaced {
        booking_id: Uuid,
    },
    FlowCancelled,
    Idle,
}

/// Direct booking from the web widget, authorized by a code previously
/// sent to the phone.
#[derive(Debug, Clone, Deserialize)]
pub struct WidgetReserveRequest {
    pub phone: String,
    pub provider_id: Uuid,
    pub service_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub code: String,
}

#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("store error: {0}")]
    Store(String),
}

impl From<ConversationError> for shared_models::AppError {
    fn from(err: ConversationError) -> Self {
        match err {
            ConversationError::Validation(msg) => shared_models::AppError::Validation(msg),
            ConversationError::Booking(e) => e.into(),
            ConversationError::Catalog(e) => e.into(),
            ConversationError::Store(msg) => shared_models::AppError::Store(msg),
        }
    }
}

/// International format, plus sign and 10 to 15 digits.
pub fn is_valid_phone(phone: &str) -> bool {
    static PHONE_RE: OnceLock<Regex> = OnceLock::new();
    PHONE_RE
        .get_or_init(|| Regex::new(r"^\+[0-9]{10,15}$").unwrap())
        .is_match(phone)
}
