use std::env;

/// Secrets loaded from environment variables. File config never carries
/// credentials.
#[derive(Debug, Clone)]
pub struct Secrets {
    // Telegram
    pub telegram_token: String,
    pub telegram_chat_id: String,
    pub telegram_api_base: String,

    // LLM (OpenAI-compatible)
    pub llm_api_key: String,
    pub llm_base_url: Option<String>,
    pub llm_model: String,

    // Postgres backend
    pub database_url: Option<String>,

    // Headless browser (HTML sources)
    pub browserless_url: Option<String>,
    pub browserless_token: Option<String>,
}

impl Secrets {
    /// Load secrets from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            telegram_token: required_env("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: required_env("TELEGRAM_CHAT_ID"),
            telegram_api_base: env::var("TELEGRAM_API_BASE")
                .unwrap_or_else(|_| "https://api.telegram.org".to_string()),
            llm_api_key: required_env("LLM_API_KEY"),
            llm_base_url: env::var("LLM_BASE_URL").ok(),
            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            database_url: env::var("DATABASE_URL").ok(),
            browserless_url: env::var("BROWSERLESS_URL").ok(),
            browserless_token: env::var("BROWSERLESS_TOKEN").ok(),
        }
    }

    /// Log which secrets are present without leaking their values.
    pub fn log_redacted(&self) {
        let vars = [
            ("TELEGRAM_BOT_TOKEN", Some(self.telegram_token.as_str())),
            ("TELEGRAM_CHAT_ID", Some(self.telegram_chat_id.as_str())),
            ("LLM_API_KEY", Some(self.llm_api_key.as_str())),
            ("LLM_BASE_URL", self.llm_base_url.as_deref()),
            ("DATABASE_URL", self.database_url.as_deref()),
            ("BROWSERLESS_URL", self.browserless_url.as_deref()),
        ];
        for (name, value) in vars {
            match value {
                Some(v) if !v.is_empty() => tracing::info!("{name} = ({} chars)", v.len()),
                _ => tracing::info!("{name} = (empty)"),
            }
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
