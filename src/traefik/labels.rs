//! Traefik routing labels for a container.
//!
//! Rendering is a pure function of its inputs: the same app, domain and port
//! always give byte-identical output, so compose files diff cleanly.

use crate::error::{DipError, DipResult};
use crate::model::validate_domain;

pub const SECURE_ENTRYPOINT: &str = "websecure";
pub const PROXY_NETWORK: &str = "traefik_proxy";
pub const DEFAULT_PORT: u16 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LabelFormat {
    /// One `key=value` per line.
    List,
    /// A `labels:` block ready to paste under a compose service.
    Compose,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingLabelSet {
    pub app_name: String,
    pub domain: String,
    pub labels: Vec<(String, String)>,
}

impl RoutingLabelSet {
    pub fn render(&self, format: LabelFormat) -> String {
        match format {
            LabelFormat::List => self
                .labels
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("\n"),
            LabelFormat::Compose => {
                let mut out = String::from("labels:");
                for (k, v) in &self.labels {
                    out.push_str(&format!("\n  - '{k}={v}'"));
                }
                out
            }
        }
    }
}

pub fn render_labels(app_name: &str, domain: &str, port: u16) -> DipResult<RoutingLabelSet> {
    validate_domain(domain)?;
    validate_app_name(app_name)?;

    let router = format!("traefik.http.routers.{app_name}");
    let service = format!("traefik.http.services.{app_name}");

    let labels = vec![
        ("traefik.enable".to_string(), "true".to_string()),
        (format!("{router}.rule"), host_rule(domain)),
        (format!("{router}.entrypoints"), SECURE_ENTRYPOINT.to_string()),
        (format!("{router}.tls"), "true".to_string()),
        (format!("{router}.service"), app_name.to_string()),
        (
            format!("{service}.loadbalancer.server.port"),
            port.to_string(),
        ),
        ("traefik.docker.network".to_string(), PROXY_NETWORK.to_string()),
    ];

    Ok(RoutingLabelSet {
        app_name: app_name.to_string(),
        domain: domain.to_string(),
        labels,
    })
}

/// Router and service names end up inside label keys; keep them key-safe.
fn validate_app_name(app_name: &str) -> DipResult<()> {
    let valid = !app_name.is_empty()
        && app_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(DipError::usage(format!(
            "invalid app name `{app_name}`: use letters, digits, `-` or `_`"
        )));
    }
    Ok(())
}

/// `Host(...)` for a plain domain, a single-label `HostRegexp(...)` for `*.domain`.
fn host_rule(domain: &str) -> String {
    match domain.strip_prefix("*.") {
        Some(apex) => format!("HostRegexp(`^[^.]+\\.{}$`)", apex.replace('.', "\\.")),
        None => format!("Host(`{domain}`)"),
    }
}
