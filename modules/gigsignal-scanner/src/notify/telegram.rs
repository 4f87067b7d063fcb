use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use super::Notifier;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Telegram bot-API backend: POST `{api_base}/bot{token}/sendMessage`.
pub struct TelegramNotifier {
    http: reqwest::Client,
    bot_url: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(api_base: &str, token: &str, chat_id: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .expect("Failed to build Telegram HTTP client");
        Self {
            http,
            bot_url: format!("{}/bot{token}", api_base.trim_end_matches('/')),
            chat_id: chat_id.to_string(),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> anyhow::Result<()> {
        let url = format!("{}/sendMessage", self.bot_url);
        let payload = json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });

        let resp = self.http.post(&url).json(&payload).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Telegram returned non-success");
            anyhow::bail!("Telegram sendMessage returned {status}");
        }

        Ok(())
    }
}
