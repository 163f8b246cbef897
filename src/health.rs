//! Pod health classification
//!
//! Derives the kubectl STATUS column reason from a pod's raw status and maps
//! it to a severity: 0 for Running/Succeeded/Completed, 1 for everything
//! else. Init container failures take precedence over main container state;
//! a pending deletion overrides both (Terminating, or Unknown when the node
//! was lost).

use serde_json::Value;

use crate::models::PodHealth;

const HEALTHY_REASONS: [&str; 3] = ["Running", "Succeeded", "Completed"];

/// Classify a pod object (raw JSON form) into severity + reason
pub fn classify_pod(pod: &Value) -> PodHealth {
    let status = &pod["status"];
    let mut reason = status["reason"]
        .as_str()
        .or_else(|| status["phase"].as_str())
        .unwrap_or("Unknown")
        .to_string();

    let mut initializing = false;
    if let Some(init_statuses) = status["initContainerStatuses"].as_array() {
        let init_total = pod["spec"]["initContainers"]
            .as_array()
            .map(Vec::len)
            .unwrap_or(init_statuses.len());
        for (i, ct) in init_statuses.iter().enumerate() {
            let state = &ct["state"];
            if let Some(terminated) = state["terminated"].as_object() {
                if terminated.get("exitCode").and_then(Value::as_i64) == Some(0) {
                    continue;
                }
                reason = match terminated.get("reason").and_then(Value::as_str) {
                    Some(r) if !r.is_empty() => format!("Init:{}", r),
                    _ => match terminated.get("signal").and_then(Value::as_i64) {
                        Some(signal) if signal != 0 => format!("Init:Signal:{}", signal),
                        _ => format!(
                            "Init:ExitCode:{}",
                            terminated.get("exitCode").and_then(Value::as_i64).unwrap_or(0)
                        ),
                    },
                };
                initializing = true;
            } else if let Some(waiting_reason) = state["waiting"]["reason"].as_str()
                && !waiting_reason.is_empty()
                && waiting_reason != "PodInitializing"
            {
                reason = format!("Init:{}", waiting_reason);
            } else {
                reason = format!("Init:{}/{}", i, init_total);
                initializing = true;
            }
            break;
        }
    }

    if !initializing {
        let mut has_running = false;
        if let Some(statuses) = status["containerStatuses"].as_array() {
            // Reverse order so the first container's state wins
            for ct in statuses.iter().rev() {
                let state = &ct["state"];
                if let Some(waiting_reason) = state["waiting"]["reason"].as_str() {
                    reason = waiting_reason.to_string();
                } else if let Some(terminated_reason) = state["terminated"]["reason"].as_str() {
                    reason = terminated_reason.to_string();
                } else if let Some(terminated) = state["terminated"].as_object() {
                    reason = match terminated.get("signal").and_then(Value::as_i64) {
                        Some(signal) if signal != 0 => format!("Signal:{}", signal),
                        _ => format!(
                            "ExitCode:{}",
                            terminated.get("exitCode").and_then(Value::as_i64).unwrap_or(0)
                        ),
                    };
                } else if ct["ready"].as_bool() == Some(true) && state["running"].is_object() {
                    has_running = true;
                }
            }
        }
        if reason == "Completed" && has_running {
            reason = "Running".to_string();
        }
    }

    if !pod["metadata"]["deletionTimestamp"].is_null() {
        reason = if status["reason"].as_str() == Some("NodeLost") {
            "Unknown".to_string()
        } else {
            "Terminating".to_string()
        };
    }

    let severity = if HEALTHY_REASONS.contains(&reason.as_str()) {
        0
    } else {
        1
    };
    PodHealth { severity, reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn classify(pod: Value) -> PodHealth {
        classify_pod(&pod)
    }

    #[test]
    fn test_running_pod_is_healthy() {
        let health = classify(json!({
            "metadata": {},
            "status": {
                "phase": "Running",
                "containerStatuses": [
                    { "ready": true, "state": { "running": {} } }
                ]
            }
        }));
        assert_eq!(health, PodHealth { severity: 0, reason: "Running".to_string() });
    }

    #[test]
    fn test_waiting_reason_wins() {
        let health = classify(json!({
            "metadata": {},
            "status": {
                "phase": "Running",
                "containerStatuses": [
                    { "ready": false, "state": { "waiting": { "reason": "CrashLoopBackOff" } } }
                ]
            }
        }));
        assert_eq!(health.severity, 1);
        assert_eq!(health.reason, "CrashLoopBackOff");
    }

    #[test]
    fn test_terminated_without_reason_reports_exit_code() {
        let health = classify(json!({
            "metadata": {},
            "status": {
                "phase": "Running",
                "containerStatuses": [
                    { "ready": false, "state": { "terminated": { "exitCode": 137, "signal": 0 } } }
                ]
            }
        }));
        assert_eq!(health.reason, "ExitCode:137");
    }

    #[test]
    fn test_terminated_by_signal() {
        let health = classify(json!({
            "metadata": {},
            "status": {
                "phase": "Running",
                "containerStatuses": [
                    { "ready": false, "state": { "terminated": { "exitCode": 1, "signal": 9 } } }
                ]
            }
        }));
        assert_eq!(health.reason, "Signal:9");
    }

    #[test]
    fn test_failed_init_container() {
        let health = classify(json!({
            "metadata": {},
            "spec": { "initContainers": [{}, {}] },
            "status": {
                "phase": "Pending",
                "initContainerStatuses": [
                    { "state": { "terminated": { "exitCode": 1, "signal": 0, "reason": "" } } }
                ]
            }
        }));
        assert_eq!(health.reason, "Init:ExitCode:1");
        assert_eq!(health.severity, 1);
    }

    #[test]
    fn test_init_in_progress_counts_position() {
        let health = classify(json!({
            "metadata": {},
            "spec": { "initContainers": [{}, {}, {}] },
            "status": {
                "phase": "Pending",
                "initContainerStatuses": [
                    { "state": { "terminated": { "exitCode": 0 } } },
                    { "state": { "running": {} } }
                ]
            }
        }));
        assert_eq!(health.reason, "Init:1/3");
    }

    #[test]
    fn test_init_waiting_reason() {
        let health = classify(json!({
            "metadata": {},
            "status": {
                "phase": "Pending",
                "initContainerStatuses": [
                    { "state": { "waiting": { "reason": "ImagePullBackOff" } } }
                ]
            }
        }));
        assert_eq!(health.reason, "Init:ImagePullBackOff");
    }

    #[test]
    fn test_completed_with_running_sidecar_is_running() {
        let health = classify(json!({
            "metadata": {},
            "status": {
                "phase": "Running",
                "containerStatuses": [
                    { "ready": true, "state": { "running": {} } },
                    { "ready": false, "state": { "terminated": { "reason": "Completed" } } }
                ]
            }
        }));
        assert_eq!(health.reason, "Running");
        assert_eq!(health.severity, 0);
    }

    #[test]
    fn test_deletion_timestamp_means_terminating() {
        let health = classify(json!({
            "metadata": { "deletionTimestamp": "2024-03-01T12:00:00Z" },
            "status": { "phase": "Running" }
        }));
        assert_eq!(health.reason, "Terminating");
        assert_eq!(health.severity, 1);
    }

    #[test]
    fn test_node_lost_deletion_is_unknown() {
        let health = classify(json!({
            "metadata": { "deletionTimestamp": "2024-03-01T12:00:00Z" },
            "status": { "phase": "Running", "reason": "NodeLost" }
        }));
        assert_eq!(health.reason, "Unknown");
    }

    #[test]
    fn test_succeeded_phase_is_healthy() {
        let health = classify(json!({
            "metadata": {},
            "status": { "phase": "Succeeded" }
        }));
        assert_eq!(health, PodHealth { severity: 0, reason: "Succeeded".to_string() });
    }

    #[test]
    fn test_pending_phase_is_unhealthy() {
        let health = classify(json!({
            "metadata": {},
            "status": { "phase": "Pending" }
        }));
        assert_eq!(health.severity, 1);
        assert_eq!(health.reason, "Pending");
    }
}
