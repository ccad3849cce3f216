use serde::Deserialize;

use crate::error::{DipError, DipResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    Running,
    Stopped,
    NotDeployed,
}

/// A container as reported by the engine, reduced to what dip needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub id: String,
    pub name: String,
    pub service: Option<String>,
    pub project: Option<String>,
    pub status: ContainerStatus,
    pub status_text: String,
    pub ports: Vec<u16>,
}

impl ContainerInfo {
    pub fn short_id(&self) -> &str {
        let end = self.id.len().min(12);
        &self.id[..end]
    }

    pub fn health(&self) -> ContainerHealth {
        ContainerHealth::from_status_text(&self.status_text)
    }
}

/// Healthcheck state as the engine appends it to the status line,
/// e.g. `Up 2 minutes (healthy)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerHealth {
    Healthy,
    Unhealthy,
    Starting,
    NoCheck,
}

impl ContainerHealth {
    pub fn from_status_text(status_text: &str) -> Self {
        if status_text.contains("(unhealthy)") {
            Self::Unhealthy
        } else if status_text.contains("(healthy)") {
            Self::Healthy
        } else if status_text.contains("(health: starting)") {
            Self::Starting
        } else {
            Self::NoCheck
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
            Self::Starting => "starting",
            Self::NoCheck => "no check",
        }
    }

    /// Containers without a healthcheck count as fine.
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Healthy | Self::NoCheck)
    }
}

/// Read-only selection applied to an engine container listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerFilter {
    pub project: Option<String>,
    pub name_contains: Option<String>,
    pub running_only: bool,
}

impl ContainerFilter {
    pub fn running_in(project: &str) -> Self {
        Self {
            project: Some(project.to_string()),
            name_contains: None,
            running_only: true,
        }
    }

    pub fn all_in(project: &str) -> Self {
        Self {
            project: Some(project.to_string()),
            name_contains: None,
            running_only: false,
        }
    }

    pub fn running_named(name: &str) -> Self {
        Self {
            project: None,
            name_contains: Some(name.to_string()),
            running_only: true,
        }
    }

    pub fn matches(&self, container: &ContainerInfo) -> bool {
        if self.running_only && container.status != ContainerStatus::Running {
            return false;
        }
        if let Some(ref project) = self.project {
            if container.project.as_deref() != Some(project.as_str()) {
                return false;
            }
        }
        if let Some(ref needle) = self.name_contains {
            if !container.name.contains(needle.as_str()) {
                return false;
            }
        }
        true
    }
}

/// The container a subcommand acts on. Lives for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerTarget {
    pub raw_name: Option<String>,
    pub resolved_id: String,
    pub resolved_name: String,
    pub service: Option<String>,
}

impl ContainerTarget {
    /// Compose service name when known, otherwise the container name.
    pub fn service_or_name(&self) -> &str {
        self.service.as_deref().unwrap_or(&self.resolved_name)
    }
}

// Only the fields dip reads; everything else in the compose file is ignored.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ComposeFile {
    pub name: Option<String>,
}

/// Rejects domain patterns that cannot be a host name, a Traefik rule or a file name.
pub fn validate_domain(domain: &str) -> DipResult<()> {
    let invalid = domain.is_empty()
        || domain
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | '\\' | '`' | '"' | '\''));
    if invalid {
        return Err(DipError::InvalidDomain(domain.to_string()));
    }
    Ok(())
}
