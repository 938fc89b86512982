//! Gencache error types

/// Gencache error types
#[derive(Debug, thiserror::Error)]
pub enum GencacheError {
    // Client errors
    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("invalid request: {0}")]
    Validation(String),

    // Upstream errors
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("upstream protocol error ({status}): {message}")]
    UpstreamProtocol { status: u16, message: String },

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // Cache persistence errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for GencacheError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GencacheError::UpstreamUnavailable(format!("request timed out: {err}"))
        } else if err.is_connect() {
            GencacheError::UpstreamUnavailable(format!("connection failed: {err}"))
        } else if let Some(status) = err.status() {
            GencacheError::UpstreamProtocol {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            GencacheError::UpstreamUnavailable(err.to_string())
        }
    }
}

/// Result type alias for gencache operations
pub type Result<T> = std::result::Result<T, GencacheError>;
