//! Shape typed API objects into the flat records the renderers consume.
//!
//! Field names follow the camelCase layout of `kmcp_core::records`. Absent upstream values become
//! empty strings, zero counts or empty maps; only container entries are built strictly.

use chrono::{DateTime, SecondsFormat, Utc};
use k8s_openapi::api::{
    apps::v1::Deployment,
    core::v1::{ContainerState, Pod, Service, ServicePort},
};
use k8s_openapi::apimachinery::pkg::{apis::meta::v1::ObjectMeta, util::intstr::IntOrString};
use serde_json::{json, Map, Value};

use crate::Record;

fn created_at(meta: &ObjectMeta) -> Value {
    match meta.creation_timestamp.as_ref() {
        Some(t) => Value::String(rfc3339(t.0)),
        None => Value::Null,
    }
}

fn rfc3339(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn string_map(m: Option<&std::collections::BTreeMap<String, String>>) -> Value {
    let mut out = Map::new();
    for (k, v) in m.into_iter().flatten() {
        out.insert(k.clone(), Value::String(v.clone()));
    }
    Value::Object(out)
}

fn state_text(state: Option<&ContainerState>) -> String {
    let Some(state) = state else { return "Unknown".to_string() };
    if state.running.is_some() {
        return "Running".to_string();
    }
    if let Some(w) = &state.waiting {
        return format!("Waiting: {}", w.reason.as_deref().unwrap_or("unknown"));
    }
    if let Some(t) = &state.terminated {
        return format!("Terminated: {} (exit code {})", t.reason.as_deref().unwrap_or("unknown"), t.exit_code);
    }
    "Unknown".to_string()
}

pub fn pod_record(pod: &Pod) -> Record {
    let meta = &pod.metadata;
    let status = pod.status.as_ref();
    let spec = pod.spec.as_ref();
    let phase = status.and_then(|s| s.phase.clone()).unwrap_or_default();

    let statuses = status.and_then(|s| s.container_statuses.as_ref());
    let restarts: i32 = statuses.map(|cs| cs.iter().map(|c| c.restart_count).sum()).unwrap_or(0);
    // Statuses are empty until the kubelet reports; fall back to the declared containers.
    let containers: Vec<Value> = match statuses {
        Some(cs) if !cs.is_empty() => cs
            .iter()
            .map(|c| {
                json!({
                    "name": c.name,
                    "image": c.image,
                    "ready": c.ready,
                    "state": state_text(c.state.as_ref()),
                    "restartCount": c.restart_count,
                })
            })
            .collect(),
        _ => spec
            .map(|s| {
                s.containers
                    .iter()
                    .map(|c| {
                        json!({
                            "name": c.name,
                            "image": c.image.clone().unwrap_or_default(),
                            "ready": false,
                            "state": "Waiting",
                            "restartCount": 0,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default(),
    };
    let conditions: Vec<String> = status
        .and_then(|s| s.conditions.as_ref())
        .map(|cs| cs.iter().filter(|c| c.status == "True").map(|c| c.type_.clone()).collect())
        .unwrap_or_default();

    json!({
        "name": meta.name.clone().unwrap_or_default(),
        "namespace": meta.namespace.clone().unwrap_or_default(),
        "status": phase,
        "phase": phase,
        "node": spec.and_then(|s| s.node_name.clone()).unwrap_or_default(),
        "restarts": restarts,
        "containers": containers,
        "conditions": conditions,
        "labels": string_map(meta.labels.as_ref()),
        "createdAt": created_at(meta),
    })
}

fn port_entry(p: &ServicePort) -> Value {
    // A named target port resolves through the pod spec; it is reported as the service port here
    // unless the name happens to be numeric.
    let target = match &p.target_port {
        Some(IntOrString::Int(i)) => *i,
        Some(IntOrString::String(s)) => s.parse().unwrap_or(p.port),
        None => p.port,
    };
    json!({
        "name": p.name.clone().unwrap_or_default(),
        "port": p.port,
        "targetPort": target,
        "protocol": p.protocol.clone().unwrap_or_else(|| "TCP".to_string()),
    })
}

pub fn service_record(svc: &Service) -> Record {
    let meta = &svc.metadata;
    let spec = svc.spec.as_ref();
    let ports: Vec<Value> = spec.and_then(|s| s.ports.as_ref()).map(|ps| ps.iter().map(port_entry).collect()).unwrap_or_default();
    json!({
        "name": meta.name.clone().unwrap_or_default(),
        "namespace": meta.namespace.clone().unwrap_or_default(),
        "type": spec.and_then(|s| s.type_.clone()).unwrap_or_else(|| "ClusterIP".to_string()),
        "clusterIP": spec.and_then(|s| s.cluster_ip.clone()).unwrap_or_default(),
        "ports": ports,
        "selector": string_map(spec.and_then(|s| s.selector.as_ref())),
        "labels": string_map(meta.labels.as_ref()),
        "createdAt": created_at(meta),
    })
}

pub fn deployment_record(dep: &Deployment) -> Record {
    let meta = &dep.metadata;
    let spec = dep.spec.as_ref();
    let status = dep.status.as_ref();
    let strategy = match spec.and_then(|s| s.strategy.as_ref()).and_then(|s| s.type_.as_deref()) {
        Some("Recreate") => "Recreate",
        _ => "RollingUpdate",
    };
    let conditions: Vec<String> = status
        .and_then(|s| s.conditions.as_ref())
        .map(|cs| {
            cs.iter()
                .filter(|c| c.status == "True")
                .map(|c| format!("{}: {}", c.type_, c.message.as_deref().unwrap_or("")))
                .collect()
        })
        .unwrap_or_default();
    json!({
        "name": meta.name.clone().unwrap_or_default(),
        "namespace": meta.namespace.clone().unwrap_or_default(),
        // Unset spec.replicas means the API server default of one.
        "totalReplicas": spec.and_then(|s| s.replicas).unwrap_or(1),
        "readyReplicas": status.and_then(|s| s.ready_replicas).unwrap_or(0),
        "updatedReplicas": status.and_then(|s| s.updated_replicas).unwrap_or(0),
        "availableReplicas": status.and_then(|s| s.available_replicas).unwrap_or(0),
        "strategy": strategy,
        "selector": string_map(spec.and_then(|s| s.selector.match_labels.as_ref())),
        "conditions": conditions,
        "labels": string_map(meta.labels.as_ref()),
        "createdAt": created_at(meta),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmcp_core::records::{decode_record, DeploymentRecord, PodRecord, ServiceRecord};
    use kmcp_core::ResourceKind;

    fn from_json<T: serde::de::DeserializeOwned>(v: Value) -> T {
        serde_json::from_value(v).expect("k8s object")
    }

    #[test]
    fn pod_sums_restarts_and_describes_states() {
        let pod: Pod = from_json(json!({
            "metadata": {"name": "web-0", "namespace": "shop", "labels": {"app": "web"}, "creationTimestamp": "2024-03-01T10:00:00Z"},
            "spec": {"nodeName": "node-a", "containers": [{"name": "app", "image": "web:1"}, {"name": "side", "image": "envoy"}]},
            "status": {
                "phase": "Running",
                "conditions": [{"type": "Ready", "status": "False"}, {"type": "PodScheduled", "status": "True"}],
                "containerStatuses": [
                    {"name": "app", "image": "web:1", "imageID": "", "ready": true, "restartCount": 1, "state": {"running": {}}},
                    {"name": "side", "image": "envoy", "imageID": "", "ready": false, "restartCount": 2,
                     "state": {"waiting": {"reason": "CrashLoopBackOff"}}}
                ]
            }
        }));
        let rec = pod_record(&pod);
        assert_eq!(rec["status"], "Running");
        assert_eq!(rec["node"], "node-a");
        assert_eq!(rec["restarts"], 3);
        assert_eq!(rec["containers"][1]["state"], "Waiting: CrashLoopBackOff");
        assert_eq!(rec["conditions"], json!(["PodScheduled"]));
        assert_eq!(rec["createdAt"], "2024-03-01T10:00:00Z");
        let typed: PodRecord = decode_record(ResourceKind::Pod, &rec).expect("decodes");
        assert_eq!(typed.containers.len(), 2);
    }

    #[test]
    fn pending_pod_falls_back_to_spec_containers() {
        let pod: Pod = from_json(json!({
            "metadata": {"name": "job-1", "namespace": "batch"},
            "spec": {"containers": [{"name": "work", "image": "busybox"}]},
            "status": {"phase": "Pending"}
        }));
        let rec = pod_record(&pod);
        assert_eq!(rec["containers"], json!([{"name": "work", "image": "busybox", "ready": false, "state": "Waiting", "restartCount": 0}]));
        assert_eq!(rec["createdAt"], Value::Null);
        assert!(decode_record::<PodRecord>(ResourceKind::Pod, &rec).is_ok());
    }

    #[test]
    fn terminated_state_carries_exit_code() {
        let state: ContainerState = from_json(json!({"terminated": {"exitCode": 137, "reason": "OOMKilled"}}));
        assert_eq!(state_text(Some(&state)), "Terminated: OOMKilled (exit code 137)");
        assert_eq!(state_text(None), "Unknown");
    }

    #[test]
    fn service_ports_keep_order_and_resolve_targets() {
        let svc: Service = from_json(json!({
            "metadata": {"name": "my-svc", "namespace": "default"},
            "spec": {
                "type": "ClusterIP",
                "clusterIP": "10.0.0.5",
                "selector": {"app": "my-app"},
                "ports": [
                    {"name": "http", "port": 80, "targetPort": 8080},
                    {"name": "grpc", "port": 9090, "targetPort": "grpc", "protocol": "TCP"},
                    {"port": 53, "protocol": "UDP"}
                ]
            }
        }));
        let rec = service_record(&svc);
        assert_eq!(rec["ports"][0], json!({"name": "http", "port": 80, "targetPort": 8080, "protocol": "TCP"}));
        assert_eq!(rec["ports"][1]["targetPort"], 9090);
        assert_eq!(rec["ports"][2], json!({"name": "", "port": 53, "targetPort": 53, "protocol": "UDP"}));
        let typed: ServiceRecord = decode_record(ResourceKind::Service, &rec).expect("decodes");
        assert_eq!(typed.cluster_ip, "10.0.0.5");
        assert_eq!(typed.selector.get("app").map(String::as_str), Some("my-app"));
    }

    #[test]
    fn deployment_defaults_and_true_conditions() {
        let dep: Deployment = from_json(json!({
            "metadata": {"name": "api", "namespace": "prod"},
            "spec": {"selector": {"matchLabels": {"app": "api"}}, "template": {}, "strategy": {"type": "Recreate"}},
            "status": {
                "readyReplicas": 1,
                "conditions": [
                    {"type": "Available", "status": "True", "message": "Deployment has minimum availability."},
                    {"type": "Progressing", "status": "False", "message": "stalled"}
                ]
            }
        }));
        let rec = deployment_record(&dep);
        assert_eq!(rec["totalReplicas"], 1);
        assert_eq!(rec["updatedReplicas"], 0);
        assert_eq!(rec["strategy"], "Recreate");
        assert_eq!(rec["conditions"], json!(["Available: Deployment has minimum availability."]));
        let typed: DeploymentRecord = decode_record(ResourceKind::Deployment, &rec).expect("decodes");
        assert_eq!(typed.selector.len(), 1);
    }
}
