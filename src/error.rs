use thiserror::Error;

pub type StoreResult<T> = core::result::Result<T, StoreError>;

/// Failure reading or writing the persisted task snapshot.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of a call to the text-generation service.
///
/// Every variant is recovered at the call site; none of them reach the user
/// as an error.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("no API key configured")]
    MissingCredential,
    #[error("network error: {0}")]
    Network(String),
    #[error("API returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("empty response from model")]
    EmptyResponse,
    #[error("response does not match schema: {0}")]
    Schema(String),
}

impl From<serde_json::Error> for AiError {
    fn from(e: serde_json::Error) -> Self {
        AiError::Schema(e.to_string())
    }
}
