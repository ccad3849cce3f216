use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use bollard::models::{ContainerSummary, ContainerSummaryStateEnum};

use crate::error::{DipError, DipResult};
use crate::model::{ContainerFilter, ContainerInfo, ContainerStatus};

const PROJECT_LABEL: &str = "com.docker.compose.project";
const SERVICE_LABEL: &str = "com.docker.compose.service";

/// Read-only view of the engine's containers.
#[async_trait]
pub trait ContainerQuery: Send + Sync {
    async fn list(&self, filter: &ContainerFilter) -> DipResult<Vec<ContainerInfo>>;
}

/// Queries the Docker/Podman API socket. Connects on each call; dip makes
/// at most a handful of queries per invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineQuery;

#[async_trait]
impl ContainerQuery for EngineQuery {
    async fn list(&self, filter: &ContainerFilter) -> DipResult<Vec<ContainerInfo>> {
        let client = crate::docker::client::connect()
            .await
            .map_err(|err| DipError::EngineUnavailable(format!("{err:#}")))?;

        let opts = bollard::query_parameters::ListContainersOptionsBuilder::default()
            .all(!filter.running_only)
            .build();
        let containers = client
            .docker
            .list_containers(Some(opts))
            .await
            .map_err(|err| DipError::EngineUnavailable(err.to_string()))?;

        let infos: Vec<ContainerInfo> = containers
            .into_iter()
            .map(container_info)
            .filter(|c| filter.matches(c))
            .collect();
        tracing::debug!(runtime = ?client.runtime, ?filter, matched = infos.len(), "listed containers");
        Ok(infos)
    }
}

fn container_info(container: ContainerSummary) -> ContainerInfo {
    let labels: HashMap<String, String> = container.labels.unwrap_or_default();

    let name = container
        .names
        .as_ref()
        .and_then(|n| n.first())
        .map(|n| n.trim_start_matches('/').to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let ports = container
        .ports
        .unwrap_or_default()
        .into_iter()
        .map(|p| p.private_port)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    ContainerInfo {
        id: container.id.unwrap_or_default(),
        name,
        service: labels.get(SERVICE_LABEL).cloned(),
        project: labels.get(PROJECT_LABEL).cloned(),
        status: state_to_container_status(container.state.as_ref()),
        status_text: container.status.unwrap_or_default(),
        ports,
    }
}

fn state_to_container_status(state: Option<&ContainerSummaryStateEnum>) -> ContainerStatus {
    match state {
        Some(ContainerSummaryStateEnum::RUNNING) => ContainerStatus::Running,
        Some(ContainerSummaryStateEnum::EXITED) | Some(ContainerSummaryStateEnum::CREATED) => {
            ContainerStatus::Stopped
        }
        None | Some(ContainerSummaryStateEnum::EMPTY) => ContainerStatus::NotDeployed,
        _ => ContainerStatus::Stopped,
    }
}

/// Renders containers as a fixed-width table for `dip status`.
pub fn render_table(containers: &[ContainerInfo]) -> String {
    let name_width = containers
        .iter()
        .map(|c| c.name.len())
        .max()
        .unwrap_or(0)
        .max("NAME".len());
    let status_width = containers
        .iter()
        .map(|c| c.status_text.len())
        .max()
        .unwrap_or(0)
        .max("STATUS".len());

    let mut out = format!(
        "{:<12}  {:<name_width$}  {:<status_width$}  PORTS",
        "ID", "NAME", "STATUS"
    );
    for c in containers {
        let ports = c
            .ports
            .iter()
            .map(u16::to_string)
            .collect::<Vec<_>>()
            .join(",");
        out.push('\n');
        out.push_str(&format!(
            "{:<12}  {:<name_width$}  {:<status_width$}  {}",
            c.short_id(),
            c.name,
            c.status_text,
            ports
        ));
    }
    out
}

/// SERVICE / STATUS / HEALTH rows for `dip health`.
pub fn render_health_table(containers: &[ContainerInfo]) -> String {
    let service_width = containers
        .iter()
        .map(|c| c.service.as_deref().unwrap_or(&c.name).len())
        .max()
        .unwrap_or(0)
        .max("SERVICE".len());
    let status_width = containers
        .iter()
        .map(|c| c.status_text.len())
        .max()
        .unwrap_or(0)
        .max("STATUS".len());

    let mut out = format!("{:<service_width$}  {:<status_width$}  HEALTH", "SERVICE", "STATUS");
    for c in containers {
        out.push('\n');
        out.push_str(&format!(
            "{:<service_width$}  {:<status_width$}  {}",
            c.service.as_deref().unwrap_or(&c.name),
            c.status_text,
            c.health().label()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::Port;

    #[test]
    fn summary_is_reduced_to_info() {
        let mut labels = HashMap::new();
        labels.insert(PROJECT_LABEL.to_string(), "demo".to_string());
        labels.insert(SERVICE_LABEL.to_string(), "web".to_string());
        let summary = ContainerSummary {
            id: Some("abcdef0123456789".to_string()),
            names: Some(vec!["/demo-web-1".to_string()]),
            labels: Some(labels),
            state: Some(ContainerSummaryStateEnum::RUNNING),
            status: Some("Up 2 minutes".to_string()),
            ports: Some(vec![
                Port {
                    private_port: 80,
                    ..Default::default()
                },
                Port {
                    private_port: 80,
                    ..Default::default()
                },
            ]),
            ..Default::default()
        };

        let info = container_info(summary);
        assert_eq!(info.name, "demo-web-1");
        assert_eq!(info.service.as_deref(), Some("web"));
        assert_eq!(info.project.as_deref(), Some("demo"));
        assert_eq!(info.status, ContainerStatus::Running);
        assert_eq!(info.ports, vec![80]);
        assert_eq!(info.short_id(), "abcdef012345");
    }

    #[test]
    fn unknown_state_maps_to_not_deployed() {
        assert_eq!(state_to_container_status(None), ContainerStatus::NotDeployed);
        assert_eq!(
            state_to_container_status(Some(&ContainerSummaryStateEnum::EXITED)),
            ContainerStatus::Stopped
        );
    }

    #[test]
    fn health_table_falls_back_to_container_name() {
        let info = ContainerInfo {
            id: "0123456789abcdef".to_string(),
            name: "loose-container".to_string(),
            service: None,
            project: Some("demo".to_string()),
            status: ContainerStatus::Running,
            status_text: "Up 1 minute (unhealthy)".to_string(),
            ports: vec![],
        };
        let table = render_health_table(&[info]);
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[0].starts_with("SERVICE"));
        assert!(lines[1].starts_with("loose-container"));
        assert!(lines[1].ends_with("unhealthy"));
    }

    #[test]
    fn table_has_header_and_rows() {
        let info = ContainerInfo {
            id: "0123456789abcdef".to_string(),
            name: "demo-web-1".to_string(),
            service: Some("web".to_string()),
            project: Some("demo".to_string()),
            status: ContainerStatus::Running,
            status_text: "Up 5 seconds".to_string(),
            ports: vec![80, 443],
        };
        let table = render_table(&[info]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("ID"));
        assert!(lines[1].starts_with("0123456789ab"));
        assert!(lines[1].ends_with("80,443"));
    }
}
