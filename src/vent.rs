// System
use std::collections::BTreeMap;

// Third Party
use k8s_openapi::api::core::v1::Pod;
use tracing::{debug, error, info, info_span, Instrument};

// Local
use crate::{
    config::{DeliveryPolicy, VentConfig},
    health::pod_healthy,
    utils::pod_slug,
    webhook::{Publisher, WebhookEnvelope},
};

/// Pods that were processed in the last cycle, keyed by slug.
pub type LastPods = BTreeMap<String, Pod>;

/// Decides which pods changed between cycles and sends each changed pod to the webhooks.
pub struct Venter<P> {
    publisher: P,
    env: String,
    delivery_policy: DeliveryPolicy,
}

impl<P: Publisher> Venter<P> {
    pub fn new(publisher: P, config: &VentConfig) -> Self {
        Self {
            publisher,
            env: config.environment.clone(),
            delivery_policy: config.delivery_policy,
        }
    }

    /// Sends every pod in `pods` that is new, unhealthy, or different from its entry in
    /// `last_pods`, and returns the pods to compare against on the next cycle.
    ///
    /// Pods whose delivery failed are left out of the result so they are sent again next cycle.
    /// Pods missing from `pods` are dropped.
    pub async fn process_pods<'a, I>(&self, pods: I, last_pods: &LastPods) -> LastPods
    where
        I: IntoIterator<Item = &'a Pod>,
    {
        let mut processed = LastPods::new();
        for pod in pods {
            let slug = pod_slug(pod);
            if last_pods.get(&slug) == Some(pod) && pod_healthy(pod) {
                debug!(pod = %slug, "Pod is healthy and state is unchanged");
                processed.insert(slug, pod.clone());
                continue;
            }
            let delivered = self
                .process_pod(&slug, pod)
                .instrument(info_span!("vent", pod = %slug))
                .await;
            if delivered {
                processed.insert(slug, pod.clone());
            }
        }
        processed
    }

    /// Returns whether the pod was delivered according to the delivery policy.
    async fn process_pod(&self, slug: &str, pod: &Pod) -> bool {
        let envelope = WebhookEnvelope {
            pod,
            env: &self.env,
        };
        match self.publisher.publish(&envelope).await {
            Ok(outcomes) => {
                if self.delivery_policy.succeeded(&outcomes) {
                    info!(pod = %slug, "Vented pod to {} webhook(s)", outcomes.len());
                    return true;
                }
                let causes: Vec<String> = outcomes
                    .iter()
                    .filter_map(|outcome| outcome.result.as_ref().err())
                    .map(ToString::to_string)
                    .collect();
                error!(
                    pod = %slug,
                    "Failed to process pod: {} of {} webhook(s) failed: {}",
                    causes.len(),
                    outcomes.len(),
                    causes.join("; ")
                );
                false
            }
            Err(e) => {
                error!(pod = %slug, "Failed to process pod: {}", e);
                false
            }
        }
    }
}
