// Third Party
use kube::Client;
use tracing::{info, warn};

// Local
use pod_vent::{
    utils::{init_tracing, setup_exit_hooks},
    PodWatcher, Venter, VentConfig, WebhookPublisher,
};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    init_tracing("pod_vent", tracing::Level::INFO);
    setup_exit_hooks()?;

    let config = VentConfig::from_env()?;
    if config.webhook_urls.is_empty() {
        warn!("No webhooks configured, pod changes will only be logged");
    } else {
        info!("Venting pod changes to {:?}", config.webhook_urls);
    }
    if config.secret.is_none() {
        warn!("No webhook secret configured, payloads will not be signed");
    }

    let client = Client::try_default().await?;
    let publisher = WebhookPublisher::new(&config)?;
    let venter = Venter::new(publisher, &config);
    let pod_watcher = PodWatcher::new(&client, &config);

    // If the watch cannot be re-established, exit and let Kubernetes restart the pod with backoff
    pod_watcher.watch_pods(&venter).await?;

    Ok(())
}
