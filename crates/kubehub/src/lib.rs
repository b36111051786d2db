//! kmcp kubehub: the cluster gateway.
//!
//! [`ClusterGateway`] is the only way the rest of the workspace talks to a cluster. It answers with
//! flat JSON records (see [`records`]) rather than full API objects. [`KubeGateway`] backs it with a
//! kube-rs client; [`MockGateway`] serves canned records for tests and offline use.

#![forbid(unsafe_code)]

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use k8s_openapi::api::{apps::v1::Deployment, core::v1::{Pod, Service}};
use kmcp_core::{ResourceIdentifier, ResourceKind};
use kube::{
    api::{Api, ListParams},
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config,
};
use metrics::{counter, histogram};
use tracing::{debug, info};

pub mod mock;
pub mod records;

pub use mock::MockGateway;

/// Flat JSON snapshot of one object, as produced by [`records`].
pub type Record = serde_json::Value;

#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("{kind} {namespace}/{name} not found")]
    NotFound { kind: ResourceKind, namespace: String, name: String },
    #[error("cluster request failed: {0}")]
    Transport(String),
}

impl GatewayError {
    pub fn not_found(id: &ResourceIdentifier) -> Self {
        GatewayError::NotFound { kind: id.kind, namespace: id.namespace.clone(), name: id.name.clone() }
    }

    fn from_kube(e: kube::Error, id: Option<&ResourceIdentifier>) -> Self {
        match (e, id) {
            (kube::Error::Api(ae), Some(id)) if ae.code == 404 => GatewayError::not_found(id),
            (e, _) => GatewayError::Transport(e.to_string()),
        }
    }
}

/// Read-only access to cluster objects. Implementations must be safe for concurrent use.
#[async_trait::async_trait]
pub trait ClusterGateway: Send + Sync {
    async fn fetch(&self, id: &ResourceIdentifier) -> Result<Record, GatewayError>;

    /// List objects of `kind`; an empty namespace means all namespaces.
    async fn list(&self, kind: ResourceKind, namespace: &str) -> Result<Vec<Record>, GatewayError>;
}

/// Gateway backed by a kube-rs client. Cheap to clone.
#[derive(Clone)]
pub struct KubeGateway {
    client: Client,
}

impl KubeGateway {
    pub fn new(client: Client) -> Self { Self { client } }

    /// Build a client from an explicit kubeconfig/context, or fall back to the default chain
    /// (in-cluster service account, then `~/.kube/config`).
    pub async fn connect(kubeconfig: Option<&Path>, context: Option<&str>) -> Result<Self> {
        let options = KubeConfigOptions { context: context.map(|s| s.to_string()), ..Default::default() };
        let client = match (kubeconfig, context) {
            (Some(path), _) => {
                let kc = Kubeconfig::read_from(path).with_context(|| format!("reading kubeconfig {}", path.display()))?;
                let config = Config::from_custom_kubeconfig(kc, &options).await.context("building kube config")?;
                Client::try_from(config).context("creating kube client")?
            }
            (None, Some(_)) => {
                let config = Config::from_kubeconfig(&options).await.context("building kube config")?;
                Client::try_from(config).context("creating kube client")?
            }
            (None, None) => Client::try_default().await.context("creating default kube client")?,
        };
        Ok(Self::new(client))
    }

    /// Ask the API server for its version; fails when the cluster is unreachable.
    pub async fn health_check(&self) -> Result<String> {
        let t0 = Instant::now();
        let info = self.client.apiserver_version().await.context("kubernetes cluster not reachable")?;
        info!(version = %info.git_version, took_ms = %t0.elapsed().as_millis(), "kubehub: health check ok");
        Ok(info.git_version)
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        if namespace.is_empty() { Api::all(self.client.clone()) } else { Api::namespaced(self.client.clone(), namespace) }
    }
}

#[async_trait::async_trait]
impl ClusterGateway for KubeGateway {
    async fn fetch(&self, id: &ResourceIdentifier) -> Result<Record, GatewayError> {
        let t0 = Instant::now();
        let res = match id.kind {
            ResourceKind::Pod => self.api::<Pod>(&id.namespace).get(&id.name).await.map(|o| records::pod_record(&o)),
            ResourceKind::Service => self.api::<Service>(&id.namespace).get(&id.name).await.map(|o| records::service_record(&o)),
            ResourceKind::Deployment => {
                self.api::<Deployment>(&id.namespace).get(&id.name).await.map(|o| records::deployment_record(&o))
            }
        };
        histogram!("kmcp_gateway_fetch_ms", t0.elapsed().as_secs_f64() * 1000.0);
        match res {
            Ok(rec) => {
                debug!(kind = %id.kind, ns = %id.namespace, name = %id.name, took_ms = %t0.elapsed().as_millis(), "kubehub: fetch ok");
                Ok(rec)
            }
            Err(e) => {
                counter!("kmcp_gateway_errors_total", 1u64);
                Err(GatewayError::from_kube(e, Some(id)))
            }
        }
    }

    async fn list(&self, kind: ResourceKind, namespace: &str) -> Result<Vec<Record>, GatewayError> {
        let t0 = Instant::now();
        let lp = ListParams::default();
        let res: Result<Vec<Record>, kube::Error> = match kind {
            ResourceKind::Pod => self.api::<Pod>(namespace).list(&lp).await.map(|l| l.items.iter().map(records::pod_record).collect()),
            ResourceKind::Service => {
                self.api::<Service>(namespace).list(&lp).await.map(|l| l.items.iter().map(records::service_record).collect())
            }
            ResourceKind::Deployment => {
                self.api::<Deployment>(namespace).list(&lp).await.map(|l| l.items.iter().map(records::deployment_record).collect())
            }
        };
        histogram!("kmcp_gateway_list_ms", t0.elapsed().as_secs_f64() * 1000.0);
        match res {
            Ok(items) => {
                let scope = if namespace.is_empty() { "(all)" } else { namespace };
                debug!(kind = %kind, ns = %scope, count = items.len(), took_ms = %t0.elapsed().as_millis(), "kubehub: list ok");
                Ok(items)
            }
            Err(e) => {
                counter!("kmcp_gateway_errors_total", 1u64);
                Err(GatewayError::from_kube(e, None))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".into(),
            message: "boom".into(),
            reason: "NotFound".into(),
            code,
        })
    }

    #[test]
    fn not_found_maps_only_for_404_on_fetch() {
        let id = ResourceIdentifier::new(ResourceKind::Pod, "default", "web");
        assert!(matches!(GatewayError::from_kube(api_error(404), Some(&id)), GatewayError::NotFound { .. }));
        assert!(matches!(GatewayError::from_kube(api_error(403), Some(&id)), GatewayError::Transport(_)));
        assert!(matches!(GatewayError::from_kube(api_error(404), None), GatewayError::Transport(_)));
    }

    #[test]
    fn not_found_names_the_object() {
        let id = ResourceIdentifier::new(ResourceKind::Deployment, "prod", "api");
        assert_eq!(GatewayError::not_found(&id).to_string(), "deployment prod/api not found");
    }
}
