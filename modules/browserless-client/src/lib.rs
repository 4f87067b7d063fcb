pub mod error;

pub use error::{BrowserlessError, Result};

use std::time::Duration;

use serde::Serialize;

/// Options for a /content render. `wait_for_selector` blocks until the
/// given element appears (or its timeout elapses), which is what dynamic
/// job-board pages need before their card lists exist in the DOM.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRequest {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goto_options: Option<GotoOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_for_selector: Option<WaitForSelector>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GotoOptions {
    pub timeout: u64,
    pub wait_until: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitForSelector {
    pub selector: String,
    pub timeout: u64,
}

impl ContentRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            goto_options: None,
            wait_for_selector: None,
        }
    }

    pub fn goto_timeout(mut self, timeout: Duration) -> Self {
        self.goto_options = Some(GotoOptions {
            timeout: timeout.as_millis() as u64,
            wait_until: "networkidle2",
        });
        self
    }

    pub fn wait_for(mut self, selector: impl Into<String>, timeout: Duration) -> Self {
        self.wait_for_selector = Some(WaitForSelector {
            selector: selector.into(),
            timeout: timeout.as_millis() as u64,
        });
        self
    }
}

pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(45))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        }
    }

    /// Fetch fully-rendered HTML for a URL via the Browserless /content
    /// endpoint.
    pub async fn content(&self, request: &ContentRequest) -> Result<String> {
        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }

        let resp = self
            .client
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            if let Some(wait) = &request.wait_for_selector {
                if is_wait_timeout(&message) {
                    return Err(BrowserlessError::SelectorTimeout {
                        selector: wait.selector.clone(),
                        message,
                    });
                }
            }
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.text().await?)
    }
}

/// Browserless surfaces an elapsed waitForSelector deadline as a
/// puppeteer TimeoutError in the error body, not as a dedicated status.
fn is_wait_timeout(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("waiting for selector") || lower.contains("timeouterror")
}
