use thiserror::Error;

#[derive(Error, Debug)]
pub enum GigSignalError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scrape error: {0}")]
    Scrape(String),

    #[error("Scoring error: {0}")]
    Scoring(String),

    #[error("Notification error: {0}")]
    Notify(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
