use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GarageError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("gpio pin {0} is not configured")]
    UnconfiguredPin(u8),
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("controller is not running")]
    Stopped,
}

/// Rejection of a webhook request. Never reaches the controller; each class
/// maps to the HTTP status returned to the caller.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("no webhook at {0}")]
    NotFound(String),
    #[error("method {0} not allowed")]
    MethodNotAllowed(String),
    #[error("unsupported content type {0:?}")]
    UnsupportedMediaType(Option<String>),
    #[error("request body unreadable: {0}")]
    Body(String),
    #[error("request body is not JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
    #[error("json path {0} matched nothing")]
    Missing(String),
}

impl WebhookError {
    pub fn status(&self) -> u16 {
        match self {
            WebhookError::NotFound(_) => 404,
            WebhookError::MethodNotAllowed(_) => 405,
            WebhookError::UnsupportedMediaType(_) => 415,
            WebhookError::Body(_) | WebhookError::MalformedJson(_) | WebhookError::Missing(_) => {
                500
            }
        }
    }
}
