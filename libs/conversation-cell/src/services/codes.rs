use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::ConversationError;
use crate::services::stores::CodeStore;

/// A code handed to a client, with its validity window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCode {
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StoredCode {
    /// True when the submission matches and the code has not expired.
    pub fn matches(&self, submitted: &str, now: DateTime<Utc>) -> bool {
        self.code == submitted && now < self.expires_at
    }
}

fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

/// Issues and checks six-digit confirmation codes. Issuing overwrites
/// any previous code for the client; verification deletes the code on
/// success and leaves it in place on failure, so a typo does not burn
/// the code.
pub struct ConfirmationCodeService {
    store: Arc<dyn CodeStore>,
    ttl: Duration,
}

impl ConfirmationCodeService {
    pub fn new(store: Arc<dyn CodeStore>, ttl_minutes: i64) -> Self {
        Self {
            store,
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub async fn issue(
        &self,
        client_id: &str,
        now: DateTime<Utc>,
    ) -> Result<StoredCode, ConversationError> {
        let code = StoredCode {
            code: generate_code(),
            issued_at: now,
            expires_at: now + self.ttl,
        };

        let ttl_secs = self.ttl.num_seconds().max(1) as u64;
        self.store.save(client_id, &code, ttl_secs).await?;
        debug!("Issued confirmation code for client {}", client_id);

        Ok(code)
    }

    pub async fn verify(
        &self,
        client_id: &str,
        submitted: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, ConversationError> {
        let stored = match self.store.load(client_id).await? {
            Some(code) => code,
            None => return Ok(false),
        };

        if !stored.matches(submitted, now) {
            return Ok(false);
        }

        self.store.clear(client_id).await?;
        Ok(true)
    }

    pub async fn revoke(&self, client_id: &str) -> Result<(), ConversationError> {
        self.store.clear(client_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn issued_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 26, 12, 0, 0).unwrap()
    }

    fn code() -> StoredCode {
        StoredCode {
            code: "482913".to_string(),
            issued_at: issued_at(),
            expires_at: issued_at() + Duration::minutes(5),
        }
    }

    #[test]
    fn matches_inside_validity_window() {
        assert!(code().matches("482913", issued_at() + Duration::minutes(4)));
    }

    #[test]
    fn rejects_wrong_code() {
        assert!(!code().matches("000000", issued_at() + Duration::minutes(1)));
    }

    #[test]
    fn rejects_just_past_expiry() {
        let now = issued_at() + Duration::minutes(5) + Duration::seconds(1);
        assert!(!code().matches("482913", now));
    }

    #[test]
    fn rejects_at_exact_expiry() {
        assert!(!code().matches("482913", issued_at() + Duration::minutes(5)));
    }

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
