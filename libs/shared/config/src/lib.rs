use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub redis_url: String,
    pub port: u16,
    /// Seconds between expiry sweeper runs.
    pub sweep_interval_secs: u64,
    /// Minutes a booking may sit in pending confirmation before the
    /// sweeper cancels it.
    pub pending_timeout_minutes: i64,
    /// Minutes a confirmation code stays valid.
    pub code_ttl_minutes: i64,
    /// How many days ahead clients may book, counting from today.
    pub booking_window_days: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL").unwrap_or_else(|_| {
                warn!("SUPABASE_URL not set, using empty value");
                String::new()
            }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY").unwrap_or_else(|_| {
                warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                String::new()
            }),
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| {
                warn!("REDIS_URL not set, using default");
                "redis://localhost:6379".to_string()
            }),
            port: parse_env_or("PORT", 3000),
            sweep_interval_secs: parse_env_or("SWEEP_INTERVAL_SECS", 60),
            pending_timeout_minutes: parse_env_or("PENDING_TIMEOUT_MINUTES", 24 * 60),
            code_ttl_minutes: parse_env_or("CODE_TTL_MINUTES", 5),
            booking_window_days: parse_env_or("BOOKING_WINDOW_DAYS", 14),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value, using default", key);
            default
        }),
        Err(_) => default,
    }
}
