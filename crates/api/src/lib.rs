//! kmcp public API façade (in-process).
//!
//! This crate defines the trait frontends (the MCP server, the CLI) depend on: list the advertised
//! catalog, read one resource by URI. [`InProcApi`] implements it over a [`ClusterGateway`];
//! [`MockApi`] serves fixed answers for frontend tests.

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use kmcp_core::{decode, CatalogEntry, DecodeError, FormattedResource, ResourceKind};
use kmcp_kubehub::{ClusterGateway, GatewayError, Record};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tracing::{info, warn, Instrument, Span};

mod catalog;

pub use catalog::{build_catalog, catalog_entry};

/// Which objects the catalog advertises at startup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogConfig {
    pub seed_kind: ResourceKind,
    pub limit: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self { Self { seed_kind: ResourceKind::Service, limit: 5 } }
}

/// Errors surfaced to callers. Every variant names the URI that was requested.
#[derive(Debug, thiserror::Error)]
pub enum KmcpError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("resource not found: {uri}")]
    NotFound { uri: String },
    #[error("failed to fetch {uri}: {message}")]
    Gateway { uri: String, message: String },
}

impl KmcpError {
    pub fn uri(&self) -> &str {
        match self {
            KmcpError::Decode(e) => e.uri(),
            KmcpError::NotFound { uri } | KmcpError::Gateway { uri, .. } => uri,
        }
    }

    fn from_gateway(uri: &str, e: GatewayError) -> Self {
        match e {
            GatewayError::NotFound { .. } => KmcpError::NotFound { uri: uri.to_string() },
            GatewayError::Transport(message) => KmcpError::Gateway { uri: uri.to_string(), message },
        }
    }
}

pub type KmcpResult<T> = Result<T, KmcpError>;

/// Read-only resource surface.
#[async_trait::async_trait]
pub trait ResourceApi: Send + Sync {
    /// The catalog built at startup; fixed for the lifetime of the instance.
    fn list_advertised_resources(&self) -> Vec<CatalogEntry>;

    /// Decode, fetch fresh from the cluster and render.
    async fn read_resource(&self, uri: &str) -> KmcpResult<FormattedResource>;
}

/// Render `record` for `kind`, falling back to pretty JSON when no renderer accepts it.
pub fn format_record(kind: ResourceKind, record: &Record, now: DateTime<Utc>) -> FormattedResource {
    let Some(render) = kmcp_render::renderer_for(kind) else {
        return FormattedResource::json(pretty(record));
    };
    match render(record, now) {
        Ok(text) => FormattedResource::markdown(text),
        Err(e) => {
            warn!(kind = %kind, error = %e, "api: render failed, returning raw record");
            counter!("kmcp_render_fallback_total", 1u64);
            FormattedResource::json(pretty(record))
        }
    }
}

fn pretty(record: &Record) -> String {
    serde_json::to_string_pretty(record).unwrap_or_else(|_| record.to_string())
}

// ----------------- In-process implementation -----------------

/// In-process implementation over a cluster gateway.
pub struct InProcApi<G> {
    gateway: Arc<G>,
    catalog: Vec<CatalogEntry>,
    span: Span,
}

impl<G: ClusterGateway> InProcApi<G> {
    /// Instance with an empty catalog; see [`InProcApi::bootstrap`].
    pub fn new(gateway: Arc<G>) -> Self { Self { gateway, catalog: Vec::new(), span: Span::none() } }

    /// Emit all catalog and resolver events inside `span`.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Build the catalog once. A failing gateway leaves it empty.
    pub async fn bootstrap(mut self, config: &CatalogConfig) -> Self {
        self.catalog = build_catalog(self.gateway.as_ref(), config).instrument(self.span.clone()).await;
        self
    }
}

#[async_trait::async_trait]
impl<G: ClusterGateway + 'static> ResourceApi for InProcApi<G> {
    fn list_advertised_resources(&self) -> Vec<CatalogEntry> { self.catalog.clone() }

    async fn read_resource(&self, uri: &str) -> KmcpResult<FormattedResource> {
        async {
            let t0 = Instant::now();
            counter!("kmcp_resolve_total", 1u64);
            let id = decode(uri).map_err(|e| {
                info!(uri = %uri, error = %e, "api: read rejected");
                counter!("kmcp_resolve_errors_total", 1u64);
                KmcpError::from(e)
            })?;
            let record = self.gateway.fetch(&id).await.map_err(|e| {
                warn!(uri = %uri, error = %e, "api: fetch failed");
                counter!("kmcp_resolve_errors_total", 1u64);
                KmcpError::from_gateway(uri, e)
            })?;
            let out = format_record(id.kind, &record, Utc::now());
            histogram!("kmcp_resolve_ms", t0.elapsed().as_secs_f64() * 1000.0);
            info!(uri = %uri, content_type = %out.content_type, took_ms = %t0.elapsed().as_millis(), "api: read ok");
            Ok(out)
        }
        .instrument(self.span.clone())
        .await
    }
}

// ----------------- Mock implementation -----------------

/// Fixed answers keyed by URI. Unknown URIs still go through the codec so decode errors are real.
#[derive(Debug, Clone, Default)]
pub struct MockApi {
    pub entries: Vec<CatalogEntry>,
    pub resources: HashMap<String, FormattedResource>,
    pub gateway_failure: Option<String>,
}

impl MockApi {
    pub fn new() -> Self { Self::default() }
}

#[async_trait::async_trait]
impl ResourceApi for MockApi {
    fn list_advertised_resources(&self) -> Vec<CatalogEntry> { self.entries.clone() }

    async fn read_resource(&self, uri: &str) -> KmcpResult<FormattedResource> {
        decode(uri)?;
        if let Some(message) = &self.gateway_failure {
            return Err(KmcpError::Gateway { uri: uri.to_string(), message: message.clone() });
        }
        self.resources.get(uri).cloned().ok_or_else(|| KmcpError::NotFound { uri: uri.to_string() })
    }
}
