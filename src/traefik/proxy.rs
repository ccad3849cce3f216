//! Lifecycle of the shared Traefik proxy that fronts every project.
//!
//! The proxy is a standalone compose project under `<config_dir>/traefik/`.
//! Project containers join it through the external `traefik_proxy` network.

use crate::context::Session;
use crate::docker::compose::{compose_file_command, engine_command};
use crate::docker::containers::render_table;
use crate::error::{DipError, DipResult};
use crate::model::ContainerFilter;

use super::admin;
use super::labels::PROXY_NETWORK;

const PROXY_CONTAINER: &str = "traefik";

pub async fn is_running(session: &Session<'_>) -> DipResult<bool> {
    let running = session
        .query
        .list(&ContainerFilter::running_named(PROXY_CONTAINER))
        .await?;
    Ok(!running.is_empty())
}

/// Starts the proxy unless it is already up.
pub async fn start(session: &Session<'_>) -> DipResult<()> {
    let compose_file = session.ctx.traefik_compose_file();
    if !compose_file.is_file() {
        return Err(DipError::Config(format!(
            "no Traefik compose file at {}",
            compose_file.display()
        )));
    }

    if is_running(session).await? {
        session.output.info("Traefik is already running");
        return Ok(());
    }

    ensure_network(session).await?;

    session.output.info("Starting Traefik...");
    let cmd = compose_file_command(session.ctx.runtime, &compose_file, ["up", "-d"]);
    let display = cmd.display();
    let result = session.runner.run(cmd).await?;
    if !result.success() {
        return Err(DipError::EngineExitNonZero {
            command: display,
            code: result.exit_code,
        });
    }
    session.output.success("Traefik started");
    Ok(())
}

/// Called before project start: brings the proxy up only when it is configured.
pub async fn ensure_started(session: &Session<'_>) -> DipResult<()> {
    if !session.ctx.traefik_compose_file().is_file() {
        tracing::debug!("no Traefik compose file, skipping proxy start");
        return Ok(());
    }
    start(session).await
}

pub async fn stop(session: &Session<'_>) -> DipResult<()> {
    let compose_file = session.ctx.traefik_compose_file();
    if !compose_file.is_file() {
        return Err(DipError::Config(format!(
            "no Traefik compose file at {}",
            compose_file.display()
        )));
    }

    session.output.info("Stopping Traefik...");
    let cmd = compose_file_command(session.ctx.runtime, &compose_file, ["down"]);
    let display = cmd.display();
    let result = session.runner.run(cmd).await?;
    if !result.success() {
        return Err(DipError::EngineExitNonZero {
            command: display,
            code: result.exit_code,
        });
    }
    session.output.success("Traefik stopped");
    Ok(())
}

pub async fn restart(session: &Session<'_>) -> DipResult<()> {
    stop(session).await?;
    start(session).await
}

/// Like restart, but also removes the container so it is recreated from the compose file.
pub async fn reset(session: &Session<'_>) -> DipResult<()> {
    stop(session).await?;

    let remove = engine_command(session.ctx.runtime, ["rm", "-f", PROXY_CONTAINER]).captured();
    let result = session.runner.run(remove).await?;
    if !result.success() {
        tracing::debug!(stderr = %result.stderr.trim(), "no proxy container left to remove");
    }

    start(session).await
}

pub async fn status(session: &Session<'_>) -> DipResult<()> {
    let containers = session
        .query
        .list(&ContainerFilter::running_named(PROXY_CONTAINER))
        .await?;

    if containers.is_empty() {
        session.output.warning("Traefik is not running");
        return Ok(());
    }

    session.output.success("Traefik is running");
    session.output.data(&render_table(&containers));

    if !admin::is_reachable().await {
        session.output.detail("Traefik API is not reachable on localhost:8080");
        return Ok(());
    }
    let hosts = admin::get_active_hosts().await?;
    if !hosts.is_empty() {
        session.output.data(&session.output.heading("Routed hosts:"));
        for host in hosts {
            session.output.data(&format!("  https://{host}"));
        }
    }
    Ok(())
}

/// Creates the shared proxy network if the engine does not know it yet.
async fn ensure_network(session: &Session<'_>) -> DipResult<()> {
    let inspect = engine_command(session.ctx.runtime, ["network", "inspect", PROXY_NETWORK])
        .captured();
    if session.runner.run(inspect).await?.success() {
        return Ok(());
    }

    session
        .output
        .info(&format!("Creating network {PROXY_NETWORK}"));
    let create = engine_command(session.ctx.runtime, ["network", "create", PROXY_NETWORK])
        .captured();
    let display = create.display();
    let result = session.runner.run(create).await?;
    if !result.success() {
        tracing::warn!(stderr = %result.stderr.trim(), "network create failed");
        return Err(DipError::EngineExitNonZero {
            command: display,
            code: result.exit_code,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::docker::fake::{exit_with, RecordingRunner, StaticContainers};
    use crate::docker::RuntimeType;
    use crate::model::{ContainerInfo, ContainerStatus};
    use crate::output::Output;

    fn context(dir: &std::path::Path) -> Context {
        Context {
            config_dir: dir.to_path_buf(),
            runtime: RuntimeType::Docker,
            verbose: false,
            color: false,
            interactive: false,
        }
    }

    fn with_compose_file(dir: &std::path::Path) {
        std::fs::create_dir_all(dir.join("traefik")).unwrap();
        std::fs::write(
            dir.join("traefik/docker-compose.yml"),
            "services:\n  traefik:\n    image: traefik:v3\n",
        )
        .unwrap();
    }

    fn traefik_container() -> ContainerInfo {
        ContainerInfo {
            id: "abcdef0123456789".into(),
            name: "traefik".into(),
            service: Some("traefik".into()),
            project: Some("traefik".into()),
            status: ContainerStatus::Running,
            status_text: "Up 2 hours".into(),
            ports: vec![80, 443],
        }
    }

    #[tokio::test]
    async fn start_creates_missing_network_then_brings_up() {
        let dir = tempfile::tempdir().unwrap();
        with_compose_file(dir.path());
        let runner = RecordingRunner::with_responses([exit_with(1)]);
        let query = StaticContainers::new(vec![]);
        let session = Session {
            ctx: context(dir.path()),
            output: Output::plain(),
            runner: &runner,
            query: &query,
            cwd: dir.path().to_path_buf(),
        };

        start(&session).await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].args, vec!["network", "inspect", "traefik_proxy"]);
        assert_eq!(calls[1].args, vec!["network", "create", "traefik_proxy"]);
        assert_eq!(calls[2].args[0], "compose");
        assert_eq!(calls[2].args[3..], ["up", "-d"]);
    }

    #[tokio::test]
    async fn start_is_a_no_op_when_running() {
        let dir = tempfile::tempdir().unwrap();
        with_compose_file(dir.path());
        let runner = RecordingRunner::new();
        let query = StaticContainers::new(vec![traefik_container()]);
        let session = Session {
            ctx: context(dir.path()),
            output: Output::plain(),
            runner: &runner,
            query: &query,
            cwd: dir.path().to_path_buf(),
        };

        start(&session).await.unwrap();
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_compose_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new();
        let query = StaticContainers::new(vec![]);
        let session = Session {
            ctx: context(dir.path()),
            output: Output::plain(),
            runner: &runner,
            query: &query,
            cwd: dir.path().to_path_buf(),
        };

        assert!(matches!(start(&session).await, Err(DipError::Config(_))));
        ensure_started(&session).await.unwrap();
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn stop_runs_compose_down() {
        let dir = tempfile::tempdir().unwrap();
        with_compose_file(dir.path());
        let runner = RecordingRunner::new();
        let query = StaticContainers::new(vec![]);
        let session = Session {
            ctx: context(dir.path()),
            output: Output::plain(),
            runner: &runner,
            query: &query,
            cwd: dir.path().to_path_buf(),
        };

        stop(&session).await.unwrap();
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args.last().map(String::as_str), Some("down"));
        assert_eq!(calls[0].cwd.as_deref(), Some(dir.path().join("traefik").as_path()));
    }

    #[tokio::test]
    async fn reset_removes_container_between_down_and_up() {
        let dir = tempfile::tempdir().unwrap();
        with_compose_file(dir.path());
        // down ok, rm fails (already gone), network inspect ok, up ok
        let runner = RecordingRunner::with_responses([exit_with(0), exit_with(1)]);
        let query = StaticContainers::new(vec![]);
        let session = Session {
            ctx: context(dir.path()),
            output: Output::plain(),
            runner: &runner,
            query: &query,
            cwd: dir.path().to_path_buf(),
        };

        reset(&session).await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[0].args.last().map(String::as_str), Some("down"));
        assert_eq!(calls[1].args, vec!["rm", "-f", "traefik"]);
        assert_eq!(calls[2].args, vec!["network", "inspect", "traefik_proxy"]);
        assert_eq!(calls[3].args[3..], ["up", "-d"]);
    }
}
