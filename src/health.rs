// Third Party
use k8s_openapi::api::core::v1::{ContainerStatus, Pod};

const POD_RUNNING: &str = "Running";
const CONDITION_TRUE: &str = "True";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ContainerKind {
    Init,
    Regular,
}

/// Determines whether a pod is running with every condition true and every container healthy.
/// Any missing status field counts against the pod.
pub fn pod_healthy(pod: &Pod) -> bool {
    let Some(status) = pod.status.as_ref() else {
        return false;
    };
    if status.phase.as_deref() != Some(POD_RUNNING) {
        return false;
    }
    if status
        .conditions
        .iter()
        .flatten()
        .any(|condition| condition.status != CONDITION_TRUE)
    {
        return false;
    }
    status
        .init_container_statuses
        .iter()
        .flatten()
        .all(|container_status| container_healthy(container_status, ContainerKind::Init))
        && status
            .container_statuses
            .iter()
            .flatten()
            .all(|container_status| container_healthy(container_status, ContainerKind::Regular))
}

/// Init containers may have terminated with exit code 0. Regular containers must be running.
fn container_healthy(container_status: &ContainerStatus, kind: ContainerKind) -> bool {
    if !container_status.ready {
        return false;
    }
    let Some(state) = container_status.state.as_ref() else {
        return false;
    };
    if state.waiting.is_some() {
        return false;
    }
    match (kind, state.terminated.as_ref()) {
        (ContainerKind::Init, Some(terminated)) => terminated.exit_code == 0,
        (ContainerKind::Regular, Some(_)) => false,
        (_, None) => state.running.is_some(),
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::{
        ContainerState, ContainerStateRunning, ContainerStateTerminated, ContainerStateWaiting,
        ContainerStatus, Pod, PodCondition, PodStatus,
    };

    use super::pod_healthy;

    fn running() -> ContainerState {
        ContainerState {
            running: Some(ContainerStateRunning::default()),
            ..Default::default()
        }
    }

    fn terminated(exit_code: i32) -> ContainerState {
        ContainerState {
            terminated: Some(ContainerStateTerminated {
                exit_code,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn waiting(reason: &str) -> ContainerState {
        ContainerState {
            waiting: Some(ContainerStateWaiting {
                reason: Some(reason.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn container(name: &str, ready: bool, state: ContainerState) -> ContainerStatus {
        ContainerStatus {
            name: name.to_string(),
            ready,
            state: Some(state),
            ..Default::default()
        }
    }

    fn condition(type_: &str, status: &str) -> PodCondition {
        PodCondition {
            type_: type_.to_string(),
            status: status.to_string(),
            ..Default::default()
        }
    }

    fn healthy_status() -> PodStatus {
        PodStatus {
            phase: Some("Running".to_string()),
            conditions: Some(vec![
                condition("Initialized", "True"),
                condition("Ready", "True"),
                condition("ContainersReady", "True"),
                condition("PodScheduled", "True"),
            ]),
            init_container_statuses: Some(vec![
                container("migrate", true, terminated(0)),
                container("sidecar", true, running()),
            ]),
            container_statuses: Some(vec![container("app", true, running())]),
            ..Default::default()
        }
    }

    fn pod_with(status: PodStatus) -> Pod {
        Pod {
            status: Some(status),
            ..Default::default()
        }
    }

    #[test]
    fn test_healthy_pod() {
        assert!(pod_healthy(&pod_with(healthy_status())));
    }

    #[test]
    fn test_no_containers_is_healthy() {
        let status = PodStatus {
            phase: Some("Running".to_string()),
            ..Default::default()
        };
        assert!(pod_healthy(&pod_with(status)));
    }

    #[test]
    fn test_not_running_phase() {
        for phase in ["Pending", "Succeeded", "Failed", "Unknown", ""] {
            let status = PodStatus {
                phase: Some(phase.to_string()),
                ..healthy_status()
            };
            assert!(!pod_healthy(&pod_with(status)), "phase {}", phase);
        }
        let status = PodStatus {
            phase: None,
            ..healthy_status()
        };
        assert!(!pod_healthy(&pod_with(status)));
        assert!(!pod_healthy(&Pod::default()));
    }

    #[test]
    fn test_condition_not_true() {
        for value in ["False", "Unknown"] {
            let mut status = healthy_status();
            status
                .conditions
                .as_mut()
                .unwrap()
                .push(condition("Ready", value));
            assert!(!pod_healthy(&pod_with(status)));
        }
    }

    #[test]
    fn test_init_container_states() {
        let cases = vec![
            (container("init", true, terminated(0)), true),
            (container("init", true, running()), true),
            (container("init", true, terminated(1)), false),
            (container("init", true, terminated(-1)), false),
            (container("init", false, terminated(0)), false),
            (container("init", true, waiting("PodInitializing")), false),
            (container("init", true, ContainerState::default()), false),
            (
                ContainerStatus {
                    name: "init".to_string(),
                    ready: true,
                    state: None,
                    ..Default::default()
                },
                false,
            ),
        ];
        for (init, expected) in cases {
            let status = PodStatus {
                init_container_statuses: Some(vec![init.clone()]),
                ..healthy_status()
            };
            assert_eq!(pod_healthy(&pod_with(status)), expected, "{:?}", init);
        }
    }

    #[test]
    fn test_regular_container_states() {
        let cases = vec![
            (container("app", true, running()), true),
            (container("app", false, running()), false),
            (container("app", true, waiting("CrashLoopBackOff")), false),
            (container("app", true, ContainerState::default()), false),
        ];
        for (app, expected) in cases {
            let status = PodStatus {
                container_statuses: Some(vec![app.clone()]),
                ..healthy_status()
            };
            assert_eq!(pod_healthy(&pod_with(status)), expected, "{:?}", app);
        }
    }

    #[test]
    fn test_terminated_regular_container_is_unhealthy() {
        for exit_code in [0, 1, 137] {
            let mut status = healthy_status();
            status
                .container_statuses
                .as_mut()
                .unwrap()
                .push(container("job", true, terminated(exit_code)));
            assert!(!pod_healthy(&pod_with(status)), "exit code {}", exit_code);
        }
    }

    #[test]
    fn test_waiting_wins_over_running() {
        let state = ContainerState {
            running: Some(ContainerStateRunning::default()),
            waiting: Some(ContainerStateWaiting::default()),
            ..Default::default()
        };
        let status = PodStatus {
            container_statuses: Some(vec![container("app", true, state)]),
            ..healthy_status()
        };
        assert!(!pod_healthy(&pod_with(status)));
    }
}
