// System
use std::str::FromStr;

// Third Party
use tokio::time::Duration;

// Local
use crate::{error::ConfigError, webhook::DeliveryOutcome};

pub const WEBHOOKS_ENV: &str = "POD_VENT_WEBHOOKS";
pub const SECRET_ENV: &str = "POD_VENT_SECRET";
pub const ENVIRONMENT_ENV: &str = "POD_VENT_ENV";
pub const NAMESPACE_ENV: &str = "POD_VENT_NAMESPACE";
pub const TIMEOUT_ENV: &str = "POD_VENT_TIMEOUT_SECS";
pub const DELIVERY_POLICY_ENV: &str = "POD_VENT_DELIVERY_POLICY";
pub const RETRY_INTERVAL_ENV: &str = "POD_VENT_RETRY_INTERVAL_SECS";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(30);

/// How the per-endpoint outcomes of one delivery are folded into a single success signal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeliveryPolicy {
    /// Every endpoint must accept the event.
    #[default]
    All,
    /// At least one endpoint must accept the event.
    Any,
}

impl DeliveryPolicy {
    /// An empty outcome list (no webhooks configured) counts as a success.
    pub fn succeeded(&self, outcomes: &[DeliveryOutcome]) -> bool {
        if outcomes.is_empty() {
            return true;
        }
        match self {
            DeliveryPolicy::All => outcomes.iter().all(DeliveryOutcome::is_success),
            DeliveryPolicy::Any => outcomes.iter().any(DeliveryOutcome::is_success),
        }
    }
}

impl FromStr for DeliveryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(DeliveryPolicy::All),
            "any" => Ok(DeliveryPolicy::Any),
            other => Err(format!("expected `all` or `any`, got `{}`", other)),
        }
    }
}

/// Settings loaded once at startup and handed to the publisher, venter and watcher.
#[derive(Clone, Debug, PartialEq)]
pub struct VentConfig {
    pub webhook_urls: Vec<String>,
    /// Shared HMAC secret. Deliveries are unsigned when this is `None`.
    pub secret: Option<String>,
    /// Tag sent alongside every pod so receivers can tell clusters apart.
    pub environment: String,
    /// Only watch this namespace. All namespaces are watched when `None`.
    pub namespace: Option<String>,
    pub request_timeout: Duration,
    pub delivery_policy: DeliveryPolicy,
    /// How often pods whose delivery failed are retried when no watch event arrives.
    pub retry_interval: Duration,
}

impl Default for VentConfig {
    fn default() -> Self {
        Self {
            webhook_urls: Vec::new(),
            secret: None,
            environment: String::new(),
            namespace: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            delivery_policy: DeliveryPolicy::default(),
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

impl VentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let request_timeout = seconds_var(TIMEOUT_ENV, DEFAULT_REQUEST_TIMEOUT)?;
        let retry_interval = seconds_var(RETRY_INTERVAL_ENV, DEFAULT_RETRY_INTERVAL)?;
        let delivery_policy = match non_empty_var(DELIVERY_POLICY_ENV) {
            Some(value) => value
                .parse::<DeliveryPolicy>()
                .map_err(|reason| ConfigError::InvalidValue {
                    key: DELIVERY_POLICY_ENV,
                    value: value.clone(),
                    reason,
                })?,
            None => DeliveryPolicy::default(),
        };

        Ok(Self {
            webhook_urls: non_empty_var(WEBHOOKS_ENV)
                .map(|urls| parse_webhook_urls(&urls))
                .unwrap_or_default(),
            secret: non_empty_var(SECRET_ENV),
            environment: non_empty_var(ENVIRONMENT_ENV).unwrap_or_default(),
            namespace: non_empty_var(NAMESPACE_ENV),
            request_timeout,
            delivery_policy,
            retry_interval,
        })
    }
}

/// Split a comma-separated list of webhook URLs, keeping their order.
pub fn parse_webhook_urls(urls: &str) -> Vec<String> {
    urls.split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reads a whole, non-zero number of seconds.
fn seconds_var(key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    let Some(value) = non_empty_var(key) else {
        return Ok(default);
    };
    let invalid = |reason: String| ConfigError::InvalidValue {
        key,
        value: value.clone(),
        reason,
    };
    match value.trim().parse::<u64>() {
        Ok(0) => Err(invalid("must be greater than zero".to_string())),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(invalid(e.to_string())),
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}
