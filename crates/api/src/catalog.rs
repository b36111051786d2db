use std::time::Instant;

use kmcp_core::{encode, CatalogEntry, ResourceIdentifier, ResourceKind, JSON};
use kmcp_kubehub::{ClusterGateway, Record};
use metrics::counter;
use tracing::{debug, info, warn};

use crate::CatalogConfig;

fn text<'a>(rec: &'a Record, key: &str) -> &'a str {
    rec.get(key).and_then(|v| v.as_str()).unwrap_or("")
}

fn int(rec: &Record, key: &str) -> i64 {
    rec.get(key).and_then(|v| v.as_i64()).unwrap_or(0)
}

/// Advertisement for one record, or `None` when it lacks a name or namespace.
pub fn catalog_entry(kind: ResourceKind, rec: &Record) -> Option<CatalogEntry> {
    let (namespace, name) = (text(rec, "namespace"), text(rec, "name"));
    if namespace.is_empty() || name.is_empty() {
        return None;
    }
    let detail = match kind {
        ResourceKind::Service => format!("Type: {}", text(rec, "type")),
        ResourceKind::Pod => format!("Status: {}", text(rec, "status")),
        ResourceKind::Deployment => format!("Ready: {}/{}", int(rec, "readyReplicas"), int(rec, "totalReplicas")),
    };
    Some(CatalogEntry {
        uri: encode(&ResourceIdentifier::new(kind, namespace, name)),
        title: format!("{}: {}/{}", kind.kind_name(), namespace, name),
        description: format!("Kubernetes {} in namespace {} ({})", kind.kind_name(), namespace, detail),
        content_type: JSON.to_string(),
    })
}

/// List the seed kind across all namespaces and keep the first `limit` usable records.
pub async fn build_catalog<G: ClusterGateway + ?Sized>(gateway: &G, config: &CatalogConfig) -> Vec<CatalogEntry> {
    let t0 = Instant::now();
    let kind = config.seed_kind;
    let records = match gateway.list(kind, "").await {
        Ok(v) => v,
        Err(e) => {
            warn!(kind = %kind, error = %e, "api: catalog list failed, advertising nothing");
            counter!("kmcp_catalog_failures_total", 1u64);
            return Vec::new();
        }
    };
    let mut entries = Vec::with_capacity(config.limit.min(records.len()));
    for rec in &records {
        if entries.len() >= config.limit {
            break;
        }
        match catalog_entry(kind, rec) {
            Some(entry) => entries.push(entry),
            None => debug!(kind = %kind, "api: catalog skipped record without name/namespace"),
        }
    }
    info!(kind = %kind, listed = records.len(), advertised = entries.len(), took_ms = %t0.elapsed().as_millis(), "api: catalog ready");
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entry_text_per_kind() {
        let svc = catalog_entry(ResourceKind::Service, &json!({"name": "web", "namespace": "shop", "type": "NodePort"})).unwrap();
        assert_eq!(svc.uri, "k8s://service/shop/web");
        assert_eq!(svc.title, "Service: shop/web");
        assert_eq!(svc.description, "Kubernetes Service in namespace shop (Type: NodePort)");
        assert_eq!(svc.content_type, "application/json");

        let pod = catalog_entry(ResourceKind::Pod, &json!({"name": "p", "namespace": "n", "status": "Pending"})).unwrap();
        assert_eq!(pod.description, "Kubernetes Pod in namespace n (Status: Pending)");

        let dep = catalog_entry(ResourceKind::Deployment, &json!({"name": "d", "namespace": "n", "readyReplicas": 2, "totalReplicas": 3}))
            .unwrap();
        assert_eq!(dep.title, "Deployment: n/d");
        assert_eq!(dep.description, "Kubernetes Deployment in namespace n (Ready: 2/3)");
    }

    #[test]
    fn records_without_identity_are_not_advertised() {
        assert!(catalog_entry(ResourceKind::Service, &json!({"name": "web"})).is_none());
        assert!(catalog_entry(ResourceKind::Service, &json!({"name": "", "namespace": "x"})).is_none());
        assert!(catalog_entry(ResourceKind::Service, &json!({"name": 7, "namespace": "x"})).is_none());
    }
}
