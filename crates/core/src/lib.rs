//! kmcp core types: resource kinds, identifiers, the `k8s://` URI codec and typed records.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

pub mod records;
pub mod uri;

pub use uri::{decode, encode, DecodeError, SCHEME};

/// Content type emitted when a renderer succeeds.
pub const MARKDOWN: &str = "text/markdown";
/// Content type for raw records (render fallback and catalog advertisement).
pub const JSON: &str = "application/json";

/// Closed set of resource kinds this system can address.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Pod,
    Service,
    Deployment,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [ResourceKind::Pod, ResourceKind::Service, ResourceKind::Deployment];

    /// Lowercase URI segment.
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Pod => "pod",
            ResourceKind::Service => "service",
            ResourceKind::Deployment => "deployment",
        }
    }

    /// Kubernetes kind name (`Pod`, `Service`, `Deployment`).
    pub fn kind_name(self) -> &'static str {
        match self {
            ResourceKind::Pod => "Pod",
            ResourceKind::Service => "Service",
            ResourceKind::Deployment => "Deployment",
        }
    }

    /// Exact, case-sensitive match on the URI segment.
    pub fn from_segment(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comma separated list of supported kind segments, for error messages.
pub fn supported_kinds() -> String {
    ResourceKind::ALL.iter().map(|k| k.as_str()).collect::<Vec<_>>().join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported resource kind {0:?} (supported: {supported})", supported = supported_kinds())]
pub struct UnknownKind(pub String);

impl std::str::FromStr for ResourceKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_segment(s).ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// Names exactly one cluster object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ResourceIdentifier {
    pub kind: ResourceKind,
    pub namespace: String,
    pub name: String,
}

impl ResourceIdentifier {
    pub fn new(kind: ResourceKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { kind, namespace: namespace.into(), name: name.into() }
    }

    pub fn to_uri(&self) -> String {
        encode(self)
    }
}

impl std::fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
    }
}

/// Resolver output: rendered text plus its declared content type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormattedResource {
    pub text: String,
    #[serde(rename = "mimeType")]
    pub content_type: String,
}

impl FormattedResource {
    pub fn markdown(text: String) -> Self {
        Self { text, content_type: MARKDOWN.to_string() }
    }

    pub fn json(text: String) -> Self {
        Self { text, content_type: JSON.to_string() }
    }

    pub fn is_markdown(&self) -> bool {
        self.content_type == MARKDOWN
    }
}

/// One advertised resource. Metadata only, never carries the object body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    pub uri: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "mimeType")]
    pub content_type: String,
}

pub mod prelude {
    pub use super::records::{ContainerRecord, DeploymentRecord, PodRecord, PortEntry, RenderError, ServiceRecord};
    pub use super::{CatalogEntry, DecodeError, FormattedResource, ResourceIdentifier, ResourceKind};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_segments_are_case_sensitive() {
        assert_eq!(ResourceKind::from_segment("pod"), Some(ResourceKind::Pod));
        assert_eq!(ResourceKind::from_segment("deployment"), Some(ResourceKind::Deployment));
        assert_eq!(ResourceKind::from_segment("Pod"), None);
        assert_eq!(ResourceKind::from_segment("pods"), None);
    }

    #[test]
    fn kind_from_str_reports_supported_set() {
        let err = "ingress".parse::<ResourceKind>().unwrap_err();
        assert!(err.to_string().contains("pod, service, deployment"));
        assert_eq!("service".parse::<ResourceKind>().unwrap(), ResourceKind::Service);
    }

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ResourceKind::Deployment).unwrap(), "\"deployment\"");
    }

    #[test]
    fn formatted_resource_content_types() {
        assert!(FormattedResource::markdown("x".into()).is_markdown());
        assert_eq!(FormattedResource::json("{}".into()).content_type, "application/json");
    }
}
