use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use kmcp_core::records::{decode_record, DeploymentRecord, RenderError};
use kmcp_core::ResourceKind;

use crate::{push_created, push_footer, push_kv, push_list, push_map};

/// Rollout health derived from ready vs desired replicas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Healthy,
    Scaling,
    Unhealthy,
}

impl Health {
    pub fn as_str(self) -> &'static str {
        match self {
            Health::Healthy => "Healthy",
            Health::Scaling => "Scaling",
            Health::Unhealthy => "Unhealthy",
        }
    }
}

impl std::fmt::Display for Health {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deployment scaled to zero (0/0) is Healthy.
pub fn health(ready: i32, total: i32) -> Health {
    if ready >= total {
        Health::Healthy
    } else if ready == 0 {
        Health::Unhealthy
    } else {
        Health::Scaling
    }
}

/// `round(ready / total * 100)`, absent when nothing is desired.
pub fn progress_percent(ready: i32, total: i32) -> Option<i64> {
    if total <= 0 {
        return None;
    }
    Some((ready as f64 / total as f64 * 100.0).round() as i64)
}

pub(crate) fn render_raw(raw: &serde_json::Value, now: DateTime<Utc>) -> Result<String, RenderError> {
    let dep: DeploymentRecord = decode_record(ResourceKind::Deployment, raw)?;
    Ok(render(&dep, now))
}

pub fn render(dep: &DeploymentRecord, now: DateTime<Utc>) -> String {
    let (ready, total) = (dep.ready_replicas, dep.total_replicas);
    let state = health(ready, total);

    let mut out = String::from("# Deployment Summary:\n\n");
    push_kv(&mut out, "Name", &dep.name);
    push_kv(&mut out, "Namespace", &dep.namespace);
    push_kv(&mut out, "Strategy", &dep.strategy);
    push_kv(&mut out, "Health", state.as_str());
    push_created(&mut out, dep.created_at, now);

    out.push_str("\n## Replicas:\n");
    let _ = writeln!(out, "- Total: {total}");
    let _ = writeln!(out, "- Ready: {ready}");
    let _ = writeln!(out, "- Updated: {}", dep.updated_replicas);
    let _ = writeln!(out, "- Available: {}", dep.available_replicas);
    if let Some(pct) = progress_percent(ready, total) {
        let _ = writeln!(out, "- Progress: {pct}%");
    }

    push_map(&mut out, "Selector", &dep.selector);
    push_list(&mut out, "Conditions", &dep.conditions);
    push_map(&mut out, "Labels", &dep.labels);

    out.push_str("\n## Recommendations:\n");
    // ready == 0 with pending replicas yields both the critical and the action line.
    if state == Health::Unhealthy {
        out.push_str("- 🔴 Critical: no replicas are ready; the deployment is not serving traffic.\n");
    }
    if ready < total {
        let _ = writeln!(
            out,
            "- ⚠️ Action needed: {} of {} replicas are not ready. Check pod events, logs and resource limits.",
            total - ready,
            total
        );
    }
    if ready == total {
        let _ = writeln!(out, "- ✅ Healthy: all {total} desired replicas are ready.");
    }

    push_footer(&mut out, "Use this information to assess rollout progress and decide whether intervention is needed.");
    out
}
