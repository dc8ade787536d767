pub mod config;
pub mod error;
pub mod health;
pub mod sign;
pub mod utils;
pub mod vent;
pub mod watcher;
pub mod webhook;

pub use config::{parse_webhook_urls, DeliveryPolicy, VentConfig};
pub use error::{ConfigError, DeliveryError};
pub use health::pod_healthy;
pub use sign::{generate_signature, verify_signature};
pub use vent::{LastPods, Venter};
pub use watcher::PodWatcher;
pub use webhook::{DeliveryOutcome, Publisher, WebhookEnvelope, WebhookPublisher};
