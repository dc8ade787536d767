// Third Party
use k8s_openapi::api::core::v1::Pod;
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    iterator::Signals,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber that logs `crate_name` at `level`. `RUST_LOG` takes precedence when
/// set.
pub fn init_tracing(crate_name: &str, level: tracing::Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{}={}", crate_name, level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Exit the process on SIGINT or SIGTERM.
pub fn setup_exit_hooks() -> Result<(), std::io::Error> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    std::thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            info!("Received signal {}, shutting down", signal);
            std::process::exit(0);
        }
    });
    Ok(())
}

/// Returns `<namespace>/<name>`, the key that identifies a pod across cycles.
pub fn pod_slug(pod: &Pod) -> String {
    format!(
        "{}/{}",
        pod.metadata.namespace.as_deref().unwrap_or_default(),
        pod.metadata.name.as_deref().unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::Pod;
    use kube::api::ObjectMeta;

    use super::pod_slug;

    #[test]
    fn test_pod_slug() {
        let pod = Pod {
            metadata: ObjectMeta {
                name: Some("sleepy-7d9f".to_string()),
                namespace: Some("rem".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(pod_slug(&pod), "rem/sleepy-7d9f");
        assert_eq!(pod_slug(&Pod::default()), "/");
    }
}
