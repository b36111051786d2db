//! `k8s://<kind>/<namespace>/<name>` codec.
//!
//! Catalog advertisement and on-demand resolution both go through [`decode`], so the two can never
//! disagree on what a URI means.

use crate::{supported_kinds, ResourceIdentifier, ResourceKind};

pub const SCHEME: &str = "k8s://";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid URI {uri:?}: expected k8s://<kind>/<namespace>/<name>")]
    InvalidScheme { uri: String },
    #[error("invalid URI {uri:?}: expected 3 non-empty segments after k8s://, got {found}")]
    InvalidSegmentCount { uri: String, found: usize },
    #[error("invalid URI {uri:?}: unsupported resource kind {kind:?} (supported: {supported})", supported = supported_kinds())]
    UnsupportedKind { uri: String, kind: String },
}

impl DecodeError {
    pub fn uri(&self) -> &str {
        match self {
            DecodeError::InvalidScheme { uri }
            | DecodeError::InvalidSegmentCount { uri, .. }
            | DecodeError::UnsupportedKind { uri, .. } => uri,
        }
    }
}

pub fn encode(id: &ResourceIdentifier) -> String {
    format!("{}{}/{}/{}", SCHEME, id.kind.as_str(), id.namespace, id.name)
}

pub fn decode(uri: &str) -> Result<ResourceIdentifier, DecodeError> {
    let rest = uri
        .strip_prefix(SCHEME)
        .ok_or_else(|| DecodeError::InvalidScheme { uri: uri.to_string() })?;
    let parts: Vec<&str> = rest.split('/').collect();
    let (kind, namespace, name) = match parts.as_slice() {
        [k, ns, n] if !k.is_empty() && !ns.is_empty() && !n.is_empty() => (*k, *ns, *n),
        _ => {
            let found = parts.iter().filter(|p| !p.is_empty()).count();
            return Err(DecodeError::InvalidSegmentCount { uri: uri.to_string(), found });
        }
    };
    let kind = ResourceKind::from_segment(kind)
        .ok_or_else(|| DecodeError::UnsupportedKind { uri: uri.to_string(), kind: kind.to_string() })?;
    Ok(ResourceIdentifier::new(kind, namespace, name))
}
