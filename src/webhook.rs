// Third Party
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use tracing::{debug, error, warn};

// Local
use crate::{
    config::VentConfig,
    error::DeliveryError,
    sign::{generate_signature, SIGNATURE_HEADER},
};

/// The payload posted to every webhook: the pod as the API server reported it plus the
/// configured environment tag.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct WebhookEnvelope<'a> {
    pub pod: &'a Pod,
    pub env: &'a str,
}

/// The result of posting one envelope to one webhook URL.
#[derive(Debug)]
pub struct DeliveryOutcome {
    pub url: String,
    pub result: Result<(), DeliveryError>,
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Delivers envelopes to subscribers.
///
/// `Err` means nothing was sent, for example because the payload could not be serialized or
/// signed. Otherwise there is one outcome per configured endpoint, in configuration order.
#[async_trait]
pub trait Publisher {
    async fn publish(
        &self,
        envelope: &WebhookEnvelope<'_>,
    ) -> Result<Vec<DeliveryOutcome>, DeliveryError>;
}

/// Posts envelopes over HTTP to each configured webhook, one request at a time.
pub struct WebhookPublisher {
    client: reqwest::Client,
    urls: Vec<String>,
    secret: Option<String>,
}

impl WebhookPublisher {
    pub fn new(config: &VentConfig) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(DeliveryError::Client)?;
        Ok(Self {
            client,
            urls: config.webhook_urls.clone(),
            secret: config.secret.clone(),
        })
    }

    /// Send `body` to every URL. A failing URL is logged and does not stop the others.
    pub async fn post_to_webhooks(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Vec<DeliveryOutcome> {
        let mut outcomes = Vec::with_capacity(self.urls.len());
        for url in &self.urls {
            let result = self.post(url, body, signature).await;
            match &result {
                Ok(()) => debug!(url = %url, "Posted to webhook"),
                Err(e) => error!(url = %url, "Failed to post to webhook: {}", e),
            }
            outcomes.push(DeliveryOutcome {
                url: url.clone(),
                result,
            });
        }
        outcomes
    }

    async fn post(
        &self,
        url: &str,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<(), DeliveryError> {
        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_vec());
        if let Some(signature) = signature {
            request = request.header(SIGNATURE_HEADER, signature);
        }
        let response = request.send().await.map_err(|source| DeliveryError::Request {
            url: url.to_string(),
            source,
        })?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Status {
                url: url.to_string(),
                status,
            })
        }
    }
}

#[async_trait]
impl Publisher for WebhookPublisher {
    async fn publish(
        &self,
        envelope: &WebhookEnvelope<'_>,
    ) -> Result<Vec<DeliveryOutcome>, DeliveryError> {
        let body = serde_json::to_vec(envelope)?;
        let signature = match self.secret.as_deref() {
            Some(secret) => Some(generate_signature(&body, secret)?),
            None => None,
        };
        if self.urls.is_empty() {
            warn!("No webhooks configured, dropping event");
        }
        Ok(self.post_to_webhooks(&body, signature.as_deref()).await)
    }
}
