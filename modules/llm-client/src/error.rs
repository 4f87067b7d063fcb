use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Rate limited by provider")]
    RateLimited,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Token limit exceeded: {0}")]
    TokenLimit(String),

    #[error("Empty response from provider")]
    Empty,
}

impl LlmError {
    /// Whether a call failing with this error may succeed on a retry.
    /// Token-limit errors are terminal for a given input: the retry would
    /// send the identical payload.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Transport(_) => true,
            LlmError::RateLimited => true,
            LlmError::Api { status, .. } => *status >= 500,
            LlmError::TokenLimit(_) => false,
            LlmError::Empty => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_retryable() {
        assert!(LlmError::Api { status: 502, message: "bad gateway".into() }.is_retryable());
        assert!(LlmError::RateLimited.is_retryable());
    }

    #[test]
    fn client_errors_are_terminal() {
        assert!(!LlmError::Api { status: 401, message: "unauthorized".into() }.is_retryable());
        assert!(!LlmError::TokenLimit("prompt too long".into()).is_retryable());
        assert!(!LlmError::Empty.is_retryable());
    }
}
