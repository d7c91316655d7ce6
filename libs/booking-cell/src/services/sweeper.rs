use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::PostgrestClient;

use crate::models::{Booking, BookingError};
use crate::services::notifier::Notifier;

/// Background task that cancels bookings stuck in pending confirmation
/// past the configured timeout.
pub struct ExpirySweeper {
    supabase: PostgrestClient,
    notifier: Arc<dyn Notifier>,
    pending_timeout: chrono::Duration,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(config: &AppConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            supabase: PostgrestClient::new(config),
            notifier,
            pending_timeout: chrono::Duration::minutes(config.pending_timeout_minutes),
            interval: Duration::from_secs(config.sweep_interval_secs),
        }
    }

    pub async fn run(self) {
        info!(
            "Expiry sweeper started, interval {}s, timeout {}m",
            self.interval.as_secs(),
            self.pending_timeout.num_minutes()
        );

        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            match self.sweep_once(Utc::now()).await {
                Ok(0) => {}
                Ok(expired) => info!("Expired {} stale pending bookings", expired),
                Err(e) => warn!("Sweep failed: {}", e),
            }
        }
    }

    /// One pass over stale pending bookings. Each cancellation is guarded
    /// by the pending status filter, so a booking confirmed between the
    /// listing and the update is left alone and not counted.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<usize, BookingError> {
        let cutoff = (now - self.pending_timeout).to_rfc3339_opts(SecondsFormat::Secs, true);
        let path = format!(
            "/rest/v1/bookings?status=eq.pending_confirmation&created_at=lt.{}",
            cutoff
        );
        let stale: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;

        let mut expired = 0;
        for row in stale {
            let booking: Booking = serde_json::from_value(row)
                .map_err(|e| BookingError::Store(e.to_string()))?;

            let guard = format!(
                "/rest/v1/bookings?id=eq.{}&status=eq.pending_confirmation",
                booking.id
            );
            let updated = self
                .supabase
                .write_returning(Method::PATCH, &guard, json!({ "status": "cancelled" }))
                .await?;

            if updated.is_empty() {
                debug!("Booking {} changed state mid-sweep, skipping", booking.id);
                continue;
            }

            expired += 1;
            let text = format!(
                "Your unconfirmed appointment on {} at {} has expired and was cancelled.",
                booking.date,
                booking.time.format("%H:%M")
            );
            if let Err(e) = self.notifier.send(&booking.client_id, &text).await {
                warn!("Failed to notify client {}: {}", booking.client_id, e);
            }
        }

        Ok(expired)
    }
}
