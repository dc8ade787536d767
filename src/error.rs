use thiserror::Error;

/// Errors raised while reading the venter configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Errors raised while delivering a pod to the configured webhooks.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to serialize webhook payload: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to sign webhook payload: {0}")]
    Sign(String),
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to webhook {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("webhook {url} responded with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}
