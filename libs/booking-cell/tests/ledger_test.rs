use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use booking_cell::models::{BookingError, BookingStatus, ReserveRequest};
use booking_cell::services::ledger::BookingLedgerService;
use booking_cell::services::notifier::Notifier;
use shared_config::AppConfig;

struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
        })
    }

    fn messages(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, recipient: &str, text: &str) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), text.to_string()));
        Ok(())
    }
}

struct TestSetup {
    server: MockServer,
    config: AppConfig,
    notifier: Arc<RecordingNotifier>,
    provider_id: Uuid,
    service_id: Uuid,
}

impl TestSetup {
    async fn new() -> Self {
        let server = MockServer::start().await;
        let config = AppConfig {
            supabase_url: server.uri(),
            supabase_anon_key: "test-anon-key".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            port: 3000,
            sweep_interval_secs: 60,
            pending_timeout_minutes: 24 * 60,
            code_ttl_minutes: 5,
            booking_window_days: 14,
        };

        Self {
            server,
            config,
            notifier: RecordingNotifier::new(),
            provider_id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
        }
    }

    fn ledger(&self) -> BookingLedgerService {
        BookingLedgerService::new(&self.config, self.notifier.clone())
    }

    fn reserve_request(&self) -> ReserveRequest {
        ReserveRequest {
            client_id: "client-42".to_string(),
            provider_id: self.provider_id,
            service_id: self.service_id,
            date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        }
    }

    fn booking_row(&self, id: Uuid, status: &str) -> serde_json::Value {
        json!({
            "id": id,
            "client_id": "client-42",
            "provider_id": self.provider_id,
            "service_id": self.service_id,
            "date": "2026-09-01",
            "time": "10:00:00",
            "duration_minutes": 30,
            "status": status,
            "created_at": "2026-08-26T10:00:00Z"
        })
    }

    /// Catalog and schedule lookups shared by the reserve tests.
    async fn mount_catalog(&self) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/services"))
            .and(query_param("id", format!("eq.{}", self.service_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": self.service_id,
                "name": "Cleaning",
                "category": "Hygiene",
                "duration_minutes": 30,
                "price": 50.0
            }])))
            .mount(&self.server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/providers"))
            .and(query_param("id", format!("eq.{}", self.provider_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": self.provider_id,
                "full_name": "Dr. Ana Ruiz",
                "specialty": "Dentistry",
                "is_active": true,
                "created_at": "2026-01-01T00:00:00Z"
            }])))
            .mount(&self.server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/provider_schedules"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": Uuid::new_v4(),
                "provider_id": self.provider_id,
                "weekday": 2,
                "work_start": "09:00:00",
                "work_end": "18:00:00",
                "break_start": null,
                "break_end": null,
                "is_working_day": true
            }])))
            .mount(&self.server)
            .await;
    }

    async fn mount_occupied(&self, rows: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/bookings"))
            .and(query_param("select", "time,duration_minutes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows))
            .mount(&self.server)
            .await;
    }
}

#[tokio::test]
async fn reserve_places_pending_booking_and_notifies() {
    let setup = TestSetup::new().await;
    setup.mount_catalog().await;
    setup.mount_occupied(json!([])).await;

    let booking_id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/rest/v1/bookings"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([setup.booking_row(booking_id, "pending_confirmation")])),
        )
        .mount(&setup.server)
        .await;

    let booking = setup
        .ledger()
        .reserve(setup.reserve_request(), false)
        .await
        .unwrap();

    assert_eq!(booking.id, booking_id);
    assert_eq!(booking.status, BookingStatus::PendingConfirmation);
    assert_eq!(booking.duration_minutes, 30);

    let sent = setup.notifier.messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "client-42");
    assert!(sent[0].1.contains("awaiting confirmation"));
}

#[tokio::test]
async fn reserve_widget_path_is_confirmed_immediately() {
    let setup = TestSetup::new().await;
    setup.mount_catalog().await;
    setup.mount_occupied(json!([])).await;

    let booking_id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/rest/v1/bookings"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([setup.booking_row(booking_id, "confirmed")])),
        )
        .mount(&setup.server)
        .await;

    let booking = setup
        .ledger()
        .reserve(setup.reserve_request(), true)
        .await
        .unwrap();

    assert_eq!(booking.status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn reserve_rejects_slot_held_by_active_booking() {
    let setup = TestSetup::new().await;
    setup.mount_catalog().await;
    setup
        .mount_occupied(json!([{ "time": "10:00:00", "duration_minutes": 30 }]))
        .await;

    let err = setup
        .ledger()
        .reserve(setup.reserve_request(), false)
        .await
        .unwrap_err();

    assert_matches!(err, BookingError::SlotTaken);
}

#[tokio::test]
async fn reserve_maps_insert_conflict_to_slot_taken() {
    let setup = TestSetup::new().await;
    setup.mount_catalog().await;
    setup.mount_occupied(json!([])).await;

    // a rival request wins the slot between the free check and the insert
    Mock::given(method("POST"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(409).set_body_string(
            "duplicate key value violates unique constraint \"bookings_active_slot_idx\"",
        ))
        .mount(&setup.server)
        .await;

    let err = setup
        .ledger()
        .reserve(setup.reserve_request(), false)
        .await
        .unwrap_err();

    assert_matches!(err, BookingError::SlotTaken);
    assert!(setup.notifier.messages().is_empty());
}

#[tokio::test]
async fn reserve_unknown_service_is_not_found() {
    let setup = TestSetup::new().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&setup.server)
        .await;

    let err = setup
        .ledger()
        .reserve(setup.reserve_request(), false)
        .await
        .unwrap_err();

    assert_matches!(err, BookingError::ServiceNotFound(id) if id == setup.service_id);
}

#[tokio::test]
async fn confirm_promotes_pending_booking() {
    let setup = TestSetup::new().await;
    let booking_id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("id", format!("eq.{}", booking_id)))
        .and(query_param("status", "eq.pending_confirmation"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([setup.booking_row(booking_id, "confirmed")])),
        )
        .mount(&setup.server)
        .await;

    let booking = setup.ledger().confirm(booking_id).await.unwrap();

    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert!(setup.notifier.messages()[0].1.contains("confirmed"));
}

#[tokio::test]
async fn confirm_on_cancelled_booking_is_invalid_transition() {
    let setup = TestSetup::new().await;
    let booking_id = Uuid::new_v4();

    // guarded update touches nothing
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&setup.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("id", format!("eq.{}", booking_id)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([setup.booking_row(booking_id, "cancelled")])),
        )
        .mount(&setup.server)
        .await;

    let err = setup.ledger().confirm(booking_id).await.unwrap_err();

    assert_matches!(err, BookingError::InvalidTransition(BookingStatus::Cancelled));
    assert!(setup.notifier.messages().is_empty());
}

#[tokio::test]
async fn confirm_unknown_booking_is_not_found() {
    let setup = TestSetup::new().await;
    let booking_id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&setup.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&setup.server)
        .await;

    let err = setup.ledger().confirm(booking_id).await.unwrap_err();

    assert_matches!(err, BookingError::NotFound(id) if id == booking_id);
}

#[tokio::test]
async fn cancel_is_idempotent_on_cancelled_booking() {
    let setup = TestSetup::new().await;
    let booking_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("id", format!("eq.{}", booking_id)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([setup.booking_row(booking_id, "cancelled")])),
        )
        .mount(&setup.server)
        .await;

    let booking = setup.ledger().cancel(booking_id).await.unwrap();

    assert_eq!(booking.status, BookingStatus::Cancelled);
    // no state change, no notification
    assert!(setup.notifier.messages().is_empty());
}

#[tokio::test]
async fn cancel_releases_pending_booking() {
    let setup = TestSetup::new().await;
    let booking_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("id", format!("eq.{}", booking_id)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([setup.booking_row(booking_id, "pending_confirmation")])),
        )
        .mount(&setup.server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("status", "neq.cancelled"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([setup.booking_row(booking_id, "cancelled")])),
        )
        .mount(&setup.server)
        .await;

    let booking = setup.ledger().cancel(booking_id).await.unwrap();

    assert_eq!(booking.status, BookingStatus::Cancelled);
    assert!(setup.notifier.messages()[0].1.contains("cancelled"));
}

#[tokio::test]
async fn client_listing_returns_active_bookings() {
    let setup = TestSetup::new().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("client_id", "eq.client-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            setup.booking_row(Uuid::new_v4(), "pending_confirmation"),
            setup.booking_row(Uuid::new_v4(), "confirmed")
        ])))
        .mount(&setup.server)
        .await;

    let bookings = setup
        .ledger()
        .list_active_for_client("client-42")
        .await
        .unwrap();

    assert_eq!(bookings.len(), 2);
}
