// System
use std::collections::BTreeMap;

// Third Party
use futures::{pin_mut, TryStreamExt};
use k8s_openapi::api::core::v1::Pod;
use kube::{
    api::{Api, ListParams, WatchEvent, WatchParams},
    error::ErrorResponse,
    Client,
};
use rand::Rng;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

// Local
use crate::{
    config::VentConfig,
    utils::pod_slug,
    vent::{LastPods, Venter},
    webhook::Publisher,
};

const NUM_WATCH_RETRIES: u32 = 30;
const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Exponential backoff between failed list/watch attempts.
#[derive(Debug)]
struct Backoff {
    delay: Duration,
    retries: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            delay: INITIAL_RETRY_DELAY,
            retries: 0,
        }
    }
}

impl Backoff {
    fn reset(&mut self) {
        *self = Self::default();
    }

    /// Returns the delay before the next attempt, without jitter, or `None` once the retries are
    /// used up.
    fn next_delay(&mut self) -> Option<Duration> {
        if self.retries >= NUM_WATCH_RETRIES {
            return None;
        }
        self.retries += 1;
        let delay = self.delay;
        self.delay = std::cmp::min(MAX_RETRY_DELAY, self.delay * 2);
        Some(delay)
    }
}

/// Applies a watch event to the current pods. Returns `Ok(true)` when the set of pods changed and
/// a cycle should run, and the API error carried by an `Error` event.
pub fn apply_event(
    pods: &mut BTreeMap<String, Pod>,
    event: WatchEvent<Pod>,
) -> Result<bool, ErrorResponse> {
    match event {
        WatchEvent::Added(pod) | WatchEvent::Modified(pod) => {
            let slug = pod_slug(&pod);
            Ok(pods.insert(slug, pod.clone()).as_ref() != Some(&pod))
        }
        WatchEvent::Deleted(pod) => Ok(pods.remove(&pod_slug(&pod)).is_some()),
        WatchEvent::Bookmark(_) => Ok(false),
        WatchEvent::Error(error_response) => Err(error_response),
    }
}

/// Returns whether a pod being watched is missing from the last cycle's result, which happens
/// when its delivery failed.
pub fn has_undelivered(current: &BTreeMap<String, Pod>, last_pods: &LastPods) -> bool {
    current.keys().any(|slug| !last_pods.contains_key(slug))
}

/// Lists and watches pods and hands every new snapshot of the cluster to a [`Venter`].
///
/// Besides running a cycle for every watch event, pods whose delivery failed are retried every
/// `retry_interval` even when the cluster is quiet.
pub struct PodWatcher {
    pods: Api<Pod>,
    retry_interval: Duration,
}

impl PodWatcher {
    /// Watch the configured namespace, or every namespace when none is set.
    pub fn new(client: &Client, config: &VentConfig) -> Self {
        let pods = match config.namespace.as_deref() {
            Some(namespace) => Api::namespaced(client.clone(), namespace),
            None => Api::all(client.clone()),
        };
        Self {
            pods,
            retry_interval: config.retry_interval,
        }
    }

    /// Run diff cycles until the watch cannot be re-established.
    pub async fn watch_pods<P: Publisher>(&self, venter: &Venter<P>) -> Result<(), anyhow::Error> {
        let mut backoff = Backoff::default();
        let mut last_pods = LastPods::new();

        loop {
            match self
                .list_and_watch(venter, &mut last_pods, &mut backoff)
                .await
            {
                Ok(()) => {
                    debug!("Pod watch stream ended, relisting...");
                    continue;
                }
                Err(e) => error!("Pod watch failed: {}", e),
            }

            match backoff.next_delay() {
                Some(delay) => {
                    let delay = delay + Duration::from_millis(rand::thread_rng().gen_range(0..500));
                    warn!("Retrying pod watch in {} ms...", delay.as_millis());
                    time::sleep(delay).await;
                }
                None => {
                    let message = format!("Max retries {} exceeded", NUM_WATCH_RETRIES);
                    return Err(anyhow::Error::msg(message));
                }
            }
        }
    }

    async fn list_and_watch<P: Publisher>(
        &self,
        venter: &Venter<P>,
        last_pods: &mut LastPods,
        backoff: &mut Backoff,
    ) -> Result<(), anyhow::Error> {
        let pod_list = self.pods.list(&ListParams::default()).await?;
        let resource_version = pod_list.metadata.resource_version.unwrap_or_default();
        let mut current: BTreeMap<String, Pod> = pod_list
            .items
            .into_iter()
            .map(|pod| (pod_slug(&pod), pod))
            .collect();
        // Successfully connected, so reset duration and retry limit
        backoff.reset();

        info!("Listed {} pods, starting pod watcher...", current.len());
        Self::run_cycle(venter, &current, last_pods).await;

        let stream = self
            .pods
            .watch(&WatchParams::default(), &resource_version)
            .await?;
        pin_mut!(stream);
        let mut retry =
            time::interval_at(Instant::now() + self.retry_interval, self.retry_interval);
        retry.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                event = stream.try_next() => {
                    let Some(event) = event? else {
                        break;
                    };
                    match apply_event(&mut current, event) {
                        Ok(true) => Self::run_cycle(venter, &current, last_pods).await,
                        Ok(false) => {}
                        Err(error_response) => {
                            return Err(anyhow::anyhow!(
                                "watch error {}: {}",
                                error_response.code,
                                error_response.message
                            ));
                        }
                    }
                }
                _ = retry.tick() => {
                    if has_undelivered(&current, last_pods) {
                        debug!("Retrying pods that were not delivered...");
                        Self::run_cycle(venter, &current, last_pods).await;
                    }
                }
            }
        }
        Ok(())
    }

    async fn run_cycle<P: Publisher>(
        venter: &Venter<P>,
        current: &BTreeMap<String, Pod>,
        last_pods: &mut LastPods,
    ) {
        let processed = venter.process_pods(current.values(), last_pods).await;
        debug!(
            "Cycle processed {} of {} pods",
            processed.len(),
            current.len()
        );
        *last_pods = processed;
    }
}
