use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use kmcp_core::records::{decode_record, PortEntry, RenderError, ServiceRecord};
use kmcp_core::ResourceKind;

use crate::{push_created, push_footer, push_kv, push_map};

pub(crate) fn render_raw(raw: &serde_json::Value, now: DateTime<Utc>) -> Result<String, RenderError> {
    let svc: ServiceRecord = decode_record(ResourceKind::Service, raw)?;
    Ok(render(&svc, now))
}

pub fn render(svc: &ServiceRecord, now: DateTime<Utc>) -> String {
    let mut out = String::from("# Service Summary:\n\n");
    push_kv(&mut out, "Name", &svc.name);
    push_kv(&mut out, "Namespace", &svc.namespace);
    push_kv(&mut out, "Type", &svc.service_type);
    if !svc.cluster_ip.is_empty() {
        push_kv(&mut out, "Cluster IP", &svc.cluster_ip);
    }
    push_created(&mut out, svc.created_at, now);

    out.push_str("\n## Ports:\n");
    if svc.ports.is_empty() {
        out.push_str("- (no ports exposed)\n");
    }
    for p in &svc.ports {
        let _ = writeln!(out, "- {}", port_line(p));
    }

    out.push_str("\n## Selector:\n");
    if svc.selector.is_empty() {
        out.push_str("No selector: endpoints are managed outside the service, so no pods receive traffic automatically.\n");
    } else {
        out.push_str("Traffic is routed to pods whose labels match all of:\n");
        for (k, v) in &svc.selector {
            let _ = writeln!(out, "- {k}: {v}");
        }
    }

    if let Some(note) = connectivity_note(svc) {
        let _ = write!(out, "\n## Connectivity:\n{note}\n");
    }

    push_map(&mut out, "Labels", &svc.labels);
    push_footer(&mut out, "Use this information to understand how traffic reaches this service and to diagnose connectivity issues.");
    out
}

/// `[<name>: ]Port <port> -> Target Port <target> (<protocol>)`
pub fn port_line(p: &PortEntry) -> String {
    let prefix = if p.name.is_empty() { String::new() } else { format!("{}: ", p.name) };
    format!("{}Port {} -> Target Port {} ({})", prefix, p.port, p.target_port, p.protocol)
}

/// Exact match on the service type; unknown types get no note.
pub fn connectivity_note(svc: &ServiceRecord) -> Option<String> {
    let note = match svc.service_type.as_str() {
        "ClusterIP" => format!(
            "Reachable only from inside the cluster, via the cluster IP or the DNS name {}.{}.svc.cluster.local.",
            svc.name, svc.namespace
        ),
        "NodePort" => "Exposed on every node's IP at a static port, in addition to the in-cluster cluster IP.".to_string(),
        "LoadBalancer" => {
            "Exposed externally through a provider load balancer; node ports and a cluster IP are allocated as well.".to_string()
        }
        "ExternalName" => "Resolves to an external DNS name through a CNAME record; no proxying or cluster IP is involved.".to_string(),
        _ => return None,
    };
    Some(note)
}
