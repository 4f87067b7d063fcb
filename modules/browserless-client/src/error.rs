use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserlessError>;

#[derive(Debug, Error)]
pub enum BrowserlessError {
    #[error("Network error: {0}")]
    Network(String),

    /// The page rendered but the awaited selector never appeared before
    /// its deadline. For card-list scrapers this usually means selector
    /// rot, not an outage, so callers degrade to an empty result.
    #[error("Timed out waiting for selector {selector:?}: {message}")]
    SelectorTimeout { selector: String, message: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl From<reqwest::Error> for BrowserlessError {
    fn from(err: reqwest::Error) -> Self {
        BrowserlessError::Network(err.to_string())
    }
}
