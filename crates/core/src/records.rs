//! Typed per-kind records.
//!
//! The cluster gateway answers with a loosely shaped JSON record. It is decoded into one of these
//! structs in a single step ([`decode_record`]); that step is the only place a malformed record can
//! surface, as [`RenderError`]. Renderers only ever see the typed form.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use smallvec::SmallVec;

use crate::ResourceKind;

pub type Labels = BTreeMap<String, String>;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("malformed {kind} record: {source}")]
    Malformed { kind: ResourceKind, source: serde_json::Error },
}

/// Decode a raw gateway record into its typed form.
pub fn decode_record<T: DeserializeOwned>(kind: ResourceKind, raw: &serde_json::Value) -> Result<T, RenderError> {
    T::deserialize(raw).map_err(|source| RenderError::Malformed { kind, source })
}

// Upstream omits empty maps/lists as null; treat that like absent.
fn null_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodRecord {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub node: String,
    #[serde(default)]
    pub restarts: i32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_default")]
    pub containers: Vec<ContainerRecord>,
    /// Condition types whose status is `True`; filtered upstream.
    #[serde(default, deserialize_with = "null_default")]
    pub conditions: SmallVec<[String; 4]>,
    #[serde(default, deserialize_with = "null_default")]
    pub labels: Labels,
}

/// A container entry missing any of name/image/ready/state fails the whole pod.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRecord {
    pub name: String,
    pub image: String,
    pub ready: bool,
    pub state: String,
    #[serde(default)]
    pub restart_count: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PortEntry {
    #[serde(default)]
    pub name: String,
    pub port: i32,
    pub target_port: i32,
    #[serde(default)]
    pub protocol: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    pub name: String,
    pub namespace: String,
    #[serde(rename = "type", default)]
    pub service_type: String,
    #[serde(rename = "clusterIP", default)]
    pub cluster_ip: String,
    /// Gateway order, never sorted.
    #[serde(default, deserialize_with = "null_default")]
    pub ports: SmallVec<[PortEntry; 4]>,
    #[serde(default, deserialize_with = "null_default")]
    pub selector: Labels,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_default")]
    pub labels: Labels,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub total_replicas: i32,
    #[serde(default)]
    pub ready_replicas: i32,
    #[serde(default)]
    pub updated_replicas: i32,
    #[serde(default)]
    pub available_replicas: i32,
    #[serde(default)]
    pub strategy: String,
    #[serde(default, deserialize_with = "null_default")]
    pub selector: Labels,
    /// `"<Type>: <message>"` for conditions whose status is `True`.
    #[serde(default, deserialize_with = "null_default")]
    pub conditions: SmallVec<[String; 4]>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_default")]
    pub labels: Labels,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pod_decodes_with_sparse_fields() {
        let raw = json!({
            "name": "web-0",
            "namespace": "default",
            "status": "Running",
            "labels": null,
            "containers": [{"name": "app", "image": "nginx:1.25", "ready": true, "state": "Running"}],
            "createdAt": "2024-03-01T10:00:00Z"
        });
        let pod: PodRecord = decode_record(ResourceKind::Pod, &raw).expect("decode");
        assert_eq!(pod.containers.len(), 1);
        assert_eq!(pod.containers[0].restart_count, 0);
        assert!(pod.labels.is_empty());
        assert!(pod.conditions.is_empty());
        assert_eq!(pod.created_at.map(|t| t.timestamp()), Some(1_709_287_200));
    }

    #[test]
    fn container_without_ready_is_malformed() {
        let raw = json!({
            "name": "web-0",
            "namespace": "default",
            "containers": [{"name": "app", "image": "nginx", "state": "Running"}]
        });
        let err = decode_record::<PodRecord>(ResourceKind::Pod, &raw).unwrap_err();
        assert!(err.to_string().contains("malformed pod record"));
        assert!(err.to_string().contains("ready"));
    }

    #[test]
    fn service_keeps_port_order() {
        let raw = json!({
            "name": "svc",
            "namespace": "default",
            "type": "NodePort",
            "clusterIP": "10.0.0.1",
            "ports": [
                {"name": "https", "port": 443, "targetPort": 8443, "protocol": "TCP"},
                {"port": 80, "targetPort": 8080, "protocol": "TCP"}
            ]
        });
        let svc: ServiceRecord = decode_record(ResourceKind::Service, &raw).expect("decode");
        let ports: Vec<i32> = svc.ports.iter().map(|p| p.port).collect();
        assert_eq!(ports, vec![443, 80]);
        assert_eq!(svc.ports[1].name, "");
    }

    #[test]
    fn mistyped_replicas_is_malformed() {
        let raw = json!({"name": "d", "namespace": "default", "totalReplicas": "three"});
        assert!(decode_record::<DeploymentRecord>(ResourceKind::Deployment, &raw).is_err());
    }
}
