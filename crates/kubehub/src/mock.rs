//! In-memory gateway serving canned records.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use kmcp_core::{ResourceIdentifier, ResourceKind};

use crate::{ClusterGateway, GatewayError, Record};

/// Records are matched on their `name`/`namespace` fields. Clones share the fetch counter.
#[derive(Clone, Default)]
pub struct MockGateway {
    records: Vec<(ResourceKind, Record)>,
    fail_with: Option<String>,
    fetches: Arc<AtomicUsize>,
}

fn field<'a>(rec: &'a Record, key: &str) -> &'a str {
    rec.get(key).and_then(|v| v.as_str()).unwrap_or("")
}

impl MockGateway {
    pub fn new() -> Self { Self::default() }

    pub fn with(mut self, kind: ResourceKind, record: Record) -> Self {
        self.records.push((kind, record));
        self
    }

    /// Every call fails with a transport error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self { fail_with: Some(message.into()), ..Self::default() }
    }

    pub fn fetch_count(&self) -> usize { self.fetches.load(Ordering::Relaxed) }
}

#[async_trait::async_trait]
impl ClusterGateway for MockGateway {
    async fn fetch(&self, id: &ResourceIdentifier) -> Result<Record, GatewayError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        if let Some(msg) = &self.fail_with {
            return Err(GatewayError::Transport(msg.clone()));
        }
        self.records
            .iter()
            .find(|(k, r)| *k == id.kind && field(r, "namespace") == id.namespace && field(r, "name") == id.name)
            .map(|(_, r)| r.clone())
            .ok_or_else(|| GatewayError::not_found(id))
    }

    async fn list(&self, kind: ResourceKind, namespace: &str) -> Result<Vec<Record>, GatewayError> {
        if let Some(msg) = &self.fail_with {
            return Err(GatewayError::Transport(msg.clone()));
        }
        Ok(self
            .records
            .iter()
            .filter(|(k, r)| *k == kind && (namespace.is_empty() || field(r, "namespace") == namespace))
            .map(|(_, r)| r.clone())
            .collect())
    }
}
