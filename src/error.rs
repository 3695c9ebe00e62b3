use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("could not reach the backend: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend responded with {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("backend returned a malformed response: {0}")]
    Malformed(String),
    #[error("invalid backend URL: {0}")]
    InvalidUrl(String),
}

pub type ApiResult<T> = Result<T, ApiError>;
