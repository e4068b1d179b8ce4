// src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("no active session")]
    Unauthenticated,

    #[error("credential retrieval failed: {0}")]
    Credential(String),

    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("server responded with HTTP {0}")]
    Status(u16),

    #[error("malformed response body: {0}")]
    Payload(String),

    #[error("{0}")]
    Validation(String),

    #[error("another request is already in progress")]
    Busy,

    #[error("row no longer rendered")]
    StaleRow,

    #[error("action not supported on this page")]
    Unsupported,

    #[error("configuration error: {0}")]
    Config(String),
}

impl DashboardError {
    /// Text shown to the user at the view boundary.
    pub fn user_message(&self) -> String {
        match self {
            DashboardError::Unauthenticated => "Please sign in.".to_string(),
            DashboardError::Credential(_) | DashboardError::Network(_) => {
                "Server error.".to_string()
            }
            DashboardError::Status(code) => format!("Request failed (HTTP {}).", code),
            DashboardError::Payload(_) => "Malformed data from server.".to_string(),
            DashboardError::Validation(message) => message.clone(),
            DashboardError::Busy => "Please wait for the previous request.".to_string(),
            DashboardError::StaleRow => "This row has changed, reload and retry.".to_string(),
            DashboardError::Unsupported => "Not available on this page.".to_string(),
            DashboardError::Config(message) => message.clone(),
        }
    }

    /// Whether the failure came from the response body rather than transport or status.
    pub fn is_payload(&self) -> bool {
        matches!(self, DashboardError::Payload(_))
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::Payload(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
