use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LlmError;

const OPENAI_API_URL: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Minimal chat surface the scoring pipeline depends on. One request,
/// one text completion back; no tools, no conversation state.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn chat(&self, messages: &[Message], temperature: f32) -> Result<String, LlmError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat-completions client. Works against any provider
/// exposing the `/chat/completions` contract via `with_base_url`.
pub struct OpenAiChat {
    api_key: String,
    model: String,
    http: reqwest::Client,
    base_url: String,
}

impl OpenAiChat {
    pub fn new(api_key: &str, model: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build LLM HTTP client");
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            http,
            base_url: OPENAI_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn headers(&self) -> Result<HeaderMap, LlmError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", self.api_key)).map_err(|_| {
            LlmError::Api {
                status: 0,
                message: "API key contains invalid header characters".to_string(),
            }
        })?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl ChatApi for OpenAiChat {
    async fn chat(&self, messages: &[Message], temperature: f32) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature,
        };

        debug!(model = %self.model, "LLM chat request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                return Err(LlmError::RateLimited);
            }
            if is_token_limit(&message) {
                return Err(LlmError::TokenLimit(message));
            }
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .ok_or(LlmError::Empty)
    }
}

/// Provider error bodies for over-long prompts mention the context window
/// or token count; there is no dedicated status code for them.
fn is_token_limit(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("context_length") || lower.contains("maximum context") || lower.contains("max_tokens")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_limit_detected_from_error_body() {
        assert!(is_token_limit(
            r#"{"error":{"code":"context_length_exceeded"}}"#
        ));
        assert!(is_token_limit("This model's maximum context length is 8192 tokens"));
        assert!(!is_token_limit(r#"{"error":{"code":"invalid_api_key"}}"#));
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let client = OpenAiChat::new("k", "m").with_base_url("https://llm.example.com/v1/");
        assert_eq!(client.base_url, "https://llm.example.com/v1");
    }
}
