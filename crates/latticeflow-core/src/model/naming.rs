//! Derived remote names
//!
//! Remote names are length-limited, so each cluster-derived component is
//! truncated before joining.

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Target group name for an exported or imported service
pub fn target_group_name(service: &str, namespace: &str) -> String {
    format!("k8s-{}-{}", truncate(service, 20), truncate(namespace, 18))
}

/// Target group name for a service referenced from a route backend
pub fn backend_ref_target_group_name(service: &str, namespace: &str, route: &str) -> String {
    format!(
        "{}-{}",
        target_group_name(service, namespace),
        truncate(route, 20)
    )
}

pub fn target_group_remote_name(logical: &str, protocol: &str, protocol_version: &str) -> String {
    format!("{}-{}-{}", logical, protocol, protocol_version).to_lowercase()
}

pub fn service_name(route: &str, namespace: &str) -> String {
    format!("{}-{}", truncate(route, 20), truncate(namespace, 18))
}

pub fn listener_name(route: &str, namespace: &str, port: u16, protocol: &str) -> String {
    format!(
        "{}-{}-{}",
        service_name(route, namespace),
        port,
        protocol.to_lowercase()
    )
}

pub fn rule_name(priority: u32) -> String {
    format!("k8s-{}", priority)
}
