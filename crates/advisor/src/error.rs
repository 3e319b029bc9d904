use thiserror::Error;

pub type AdvisorResult<T> = Result<T, AdvisorError>;

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("No API key configured")]
    NoApiKey,

    #[error("Invalid response format")]
    InvalidResponse,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}
