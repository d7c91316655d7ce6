use async_trait::async_trait;
use tracing::info;

/// Outbound client notifications. Delivery is best effort; callers log
/// failures and move on rather than failing the booking operation.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, text: &str) -> anyhow::Result<()>;
}

/// Default sink that writes notifications to the log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, recipient: &str, text: &str) -> anyhow::Result<()> {
        info!("Notification to {}: {}", recipient, text);
        Ok(())
    }
}
