//! Housekeeping commands: health overview, engine info and pruning.

use std::io::{BufRead, Write};

use crate::cli::PruneArgs;
use crate::context::Session;
use crate::docker::compose::{compose_command, engine_command};
use crate::docker::containers::render_health_table;
use crate::docker::EngineCommand;
use crate::error::{DipError, DipResult};
use crate::model::{ContainerFilter, ContainerStatus};

use super::{pass_through, Outcome};

const VERSION_FORMAT: &str = "Client: {{.Client.Version}}, Server: {{.Server.Version}}";
const INFO_FORMAT: &str = "{{.Containers}} {{.ContainersRunning}} {{.ContainersPaused}} {{.ContainersStopped}} {{.Images}}";
const INFO_FIELDS: [&str; 5] = ["containers", "running", "paused", "stopped", "images"];

pub async fn health(session: &Session<'_>) -> DipResult<Outcome> {
    let project = session.project()?;
    let containers = session
        .query
        .list(&ContainerFilter::running_in(&project.name))
        .await?;

    let output = &session.output;
    if containers.is_empty() {
        output.warning("No running containers found");
        return Ok(Outcome::done());
    }

    output.data(&render_health_table(&containers));
    if containers.iter().all(|c| c.health().is_ok()) {
        output.success("All services are healthy and running");
    } else {
        output.warning("Some services have issues");
    }
    Ok(Outcome::done())
}

/// Trimmed stdout of a captured command, or `None` when it failed.
async fn captured_stdout(session: &Session<'_>, cmd: EngineCommand) -> DipResult<Option<String>> {
    let rendered = cmd.display();
    let result = session.runner.run(cmd.captured()).await?;
    if !result.success() {
        tracing::debug!(command = %rendered, stderr = %result.stderr.trim(), "command failed");
        return Ok(None);
    }
    Ok(Some(result.stdout.trim().to_string()))
}

pub async fn sysinfo(session: &Session<'_>) -> DipResult<Outcome> {
    let runtime = session.ctx.runtime;
    let output = &session.output;

    output.data(&output.heading("Engine"));
    output.data(&format!("  runtime: {}", runtime.binary()));
    let version = captured_stdout(session, engine_command(runtime, ["version", "--format", VERSION_FORMAT])).await?;
    output.data(&format!("  version: {}", version.as_deref().unwrap_or("unavailable")));

    match captured_stdout(session, engine_command(runtime, ["info", "--format", INFO_FORMAT])).await? {
        Some(info) => {
            for (field, value) in INFO_FIELDS.iter().zip(info.split_whitespace()) {
                output.data(&format!("  {field}: {value}"));
            }
        }
        None => output.warning("Engine info is unavailable"),
    }

    let project = match session.project() {
        Ok(project) => project,
        Err(DipError::NoProject(_)) => {
            output.detail("Not inside a dip project");
            return Ok(Outcome::done());
        }
        Err(err) => return Err(err),
    };

    output.data(&output.heading("Project"));
    output.data(&format!("  name: {}", project.name));
    output.data(&format!("  compose file: {}", project.compose_file.display()));
    let services = captured_stdout(session, compose_command(runtime, &project, ["config", "--services"])).await?;
    match services {
        Some(services) if !services.is_empty() => {
            output.data("  services:");
            for service in services.lines() {
                output.data(&format!("    {service}"));
            }
        }
        _ => output.warning("Could not list the project's services"),
    }
    Ok(Outcome::done())
}

/// Removes the project's stopped containers, then dangling images.
pub async fn cleanup(session: &Session<'_>) -> DipResult<Outcome> {
    let project = session.project()?;
    let runtime = session.ctx.runtime;
    let stopped: Vec<String> = session
        .query
        .list(&ContainerFilter::all_in(&project.name))
        .await?
        .into_iter()
        .filter(|c| c.status == ContainerStatus::Stopped)
        .map(|c| c.id)
        .collect();

    if stopped.is_empty() {
        session.output.info("No stopped containers to remove");
    } else {
        session
            .output
            .info(&format!("Removing {} stopped container(s)...", stopped.len()));
        let mut args = vec!["rm".to_string()];
        args.extend(stopped);
        pass_through(session, engine_command(runtime, args)).await?;
    }

    session.output.info("Removing dangling images...");
    let outcome = pass_through(session, engine_command(runtime, ["image", "prune", "-f"])).await?;
    session.output.success("Cleanup completed");
    Ok(outcome)
}

/// Engine-wide prune of unused data and volumes; asks first unless `--yes`.
pub async fn prune(session: &Session<'_>, args: &PruneArgs) -> DipResult<Outcome> {
    if !args.yes {
        if !session.ctx.interactive {
            return Err(DipError::usage(
                "prune deletes unused data for every project; pass --yes to confirm",
            ));
        }
        session.output.warning(
            "This removes all stopped containers, unused networks, dangling images and unused volumes",
        );
        if !confirm("Continue? [y/N] ", &mut std::io::stdin().lock()) {
            session.output.info("Prune cancelled");
            return Ok(Outcome::done());
        }
    }

    let runtime = session.ctx.runtime;
    session.output.info("Pruning unused data...");
    pass_through(session, engine_command(runtime, ["system", "prune", "-f"])).await?;
    session.output.info("Pruning unused volumes...");
    let outcome = pass_through(session, engine_command(runtime, ["volume", "prune", "-f"])).await?;
    session.output.success("Prune completed");
    Ok(outcome)
}

/// `y` or `yes`, any case; anything else (including EOF) declines.
fn confirm(prompt: &str, input: &mut impl BufRead) -> bool {
    print!("{prompt}");
    if let Err(err) = std::io::stdout().flush() {
        tracing::debug!(error = %err, "flushing prompt failed");
    }
    let mut answer = String::new();
    if input.read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
