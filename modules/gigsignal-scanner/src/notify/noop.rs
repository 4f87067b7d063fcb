use async_trait::async_trait;
use tracing::info;

use super::Notifier;

/// Backend that drops every message. Useful for dry runs and tests.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, text: &str) -> anyhow::Result<()> {
        info!(chars = text.len(), "Noop notifier: message dropped");
        Ok(())
    }
}
