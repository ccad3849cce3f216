use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bollard::Docker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RuntimeType {
    Docker,
    Podman,
}

impl RuntimeType {
    /// CLI binary used for `compose`, `exec`, `logs` and friends.
    pub fn binary(self) -> &'static str {
        match self {
            RuntimeType::Docker => "docker",
            RuntimeType::Podman => "podman",
        }
    }
}

pub struct DockerClient {
    pub docker: Docker,
    pub runtime: RuntimeType,
}

fn podman_socket() -> PathBuf {
    let runtime_dir = std::env::var_os("XDG_RUNTIME_DIR")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("/run/user/{}", current_uid())));
    runtime_dir.join("podman/podman.sock")
}

#[cfg(unix)]
fn current_uid() -> u32 {
    // SAFETY: getuid() cannot fail.
    unsafe { libc::getuid() }
}

#[cfg(not(unix))]
fn current_uid() -> u32 {
    1000
}

const DOCKER_SOCKET: &str = "/var/run/docker.sock";
const CONNECT_TIMEOUT_SECS: u64 = 120;

/// Guess the runtime without connecting, for picking the CLI binary.
/// Docker wins when both sockets exist or `DOCKER_HOST` is set.
pub fn detect_runtime() -> RuntimeType {
    if std::env::var_os("DOCKER_HOST").is_some() || Path::new(DOCKER_SOCKET).exists() {
        return RuntimeType::Docker;
    }
    if podman_socket().exists() {
        return RuntimeType::Podman;
    }
    RuntimeType::Docker
}

/// Connects to the engine API. `DOCKER_HOST` wins, then a live Podman
/// socket, then the Docker socket, then bollard's own defaults.
pub async fn connect() -> Result<DockerClient> {
    if std::env::var_os("DOCKER_HOST").is_some() {
        if let Ok(docker) = Docker::connect_with_defaults() {
            return Ok(DockerClient {
                docker,
                runtime: RuntimeType::Docker,
            });
        }
    }

    let podman_sock = podman_socket();
    if let Some(client) = ping_unix(&podman_sock, RuntimeType::Podman).await {
        return Ok(client);
    }
    if let Some(client) = ping_unix(Path::new(DOCKER_SOCKET), RuntimeType::Docker).await {
        return Ok(client);
    }

    let docker = Docker::connect_with_defaults().with_context(|| {
        format!(
            "no engine socket at {DOCKER_SOCKET} or {}; is Docker or Podman running?",
            podman_sock.display()
        )
    })?;
    Ok(DockerClient {
        docker,
        runtime: RuntimeType::Docker,
    })
}

async fn ping_unix(socket: &Path, runtime: RuntimeType) -> Option<DockerClient> {
    if !socket.exists() {
        return None;
    }
    let docker = Docker::connect_with_unix(
        &socket.to_string_lossy(),
        CONNECT_TIMEOUT_SECS,
        bollard::API_DEFAULT_VERSION,
    )
    .ok()?;
    match docker.ping().await {
        Ok(_) => Some(DockerClient { docker, runtime }),
        Err(err) => {
            tracing::debug!(socket = %socket.display(), error = %err, "engine socket did not answer");
            None
        }
    }
}
