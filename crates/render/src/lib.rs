//! kmcp renderers: one pure function per resource kind, turning a typed record into markdown
//! aimed at an automated reasoning agent.
//!
//! Renderers never log and never read the clock; the caller passes `now` so age lines are computed
//! against render time.

#![forbid(unsafe_code)]

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use kmcp_core::records::{Labels, RenderError};
use kmcp_core::ResourceKind;

pub mod age;
pub mod deployment;
pub mod pod;
pub mod service;

pub use age::format_age;
pub use deployment::{health, progress_percent, Health};

/// Decode + render for one kind. Fails only when the raw record has the wrong shape.
pub type Renderer = fn(&serde_json::Value, DateTime<Utc>) -> Result<String, RenderError>;

const REGISTRY: &[(ResourceKind, Renderer)] = &[
    (ResourceKind::Pod, pod::render_raw as Renderer),
    (ResourceKind::Service, service::render_raw as Renderer),
    (ResourceKind::Deployment, deployment::render_raw as Renderer),
];

/// Renderer registered for `kind`, if any.
pub fn renderer_for(kind: ResourceKind) -> Option<Renderer> {
    REGISTRY.iter().find(|(k, _)| *k == kind).map(|(_, r)| *r)
}

fn push_kv(out: &mut String, k: &str, v: impl AsRef<str>) {
    let _ = writeln!(out, "**{k}**: {}", v.as_ref());
}

fn push_created(out: &mut String, created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) {
    if let Some(t) = created_at {
        let _ = writeln!(
            out,
            "**Created At**: {} ({} ago)",
            t.format("%Y-%m-%d %H:%M:%S"),
            format_age(age::age_since(t, now))
        );
    }
}

fn push_map(out: &mut String, heading: &str, map: &Labels) {
    if map.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n## {heading}:");
    for (k, v) in map {
        let _ = writeln!(out, "- {k}: {v}");
    }
}

fn push_list<S: AsRef<str>>(out: &mut String, heading: &str, items: &[S]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n## {heading}:");
    for it in items {
        let _ = writeln!(out, "- {}", it.as_ref());
    }
}

fn push_footer(out: &mut String, hint: &str) {
    out.push_str("\n---\n");
    let _ = write!(out, "*{hint}*");
}
