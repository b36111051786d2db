use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use kmcp_core::records::{decode_record, ContainerRecord, PodRecord, RenderError};
use kmcp_core::ResourceKind;

use crate::{push_created, push_footer, push_kv, push_list, push_map};

pub(crate) fn render_raw(raw: &serde_json::Value, now: DateTime<Utc>) -> Result<String, RenderError> {
    let pod: PodRecord = decode_record(ResourceKind::Pod, raw)?;
    Ok(render(&pod, now))
}

pub fn render(pod: &PodRecord, now: DateTime<Utc>) -> String {
    let mut out = String::from("# Pod Summary:\n\n");
    push_kv(&mut out, "Name", &pod.name);
    push_kv(&mut out, "Namespace", &pod.namespace);
    push_kv(&mut out, "Status", &pod.status);
    push_kv(&mut out, "Node", &pod.node);
    if pod.restarts > 0 {
        push_kv(&mut out, "⚠️ Restarts", pod.restarts.to_string());
    }
    push_created(&mut out, pod.created_at, now);

    out.push_str("\n## Containers:\n\n");
    if pod.containers.is_empty() {
        out.push_str("- (none reported)\n");
    }
    for c in &pod.containers {
        push_container(&mut out, c);
    }

    push_list(&mut out, "Conditions", &pod.conditions);
    push_map(&mut out, "Labels", &pod.labels);
    push_footer(&mut out, "Use this information to understand the pod's current state and troubleshoot any issues.");
    out
}

fn push_container(out: &mut String, c: &ContainerRecord) {
    let status = if c.ready { "🟢 Ready" } else { "🔴 Not Ready" };
    let _ = writeln!(out, "- **{}**: {}", c.name, status);
    let _ = writeln!(out, "  - Image: {}", c.image);
    let _ = writeln!(out, "  - State: {}", c.state);
    if c.restart_count > 0 {
        let _ = writeln!(out, "  - ⚠️ Restarts: {}", c.restart_count);
    }
}
