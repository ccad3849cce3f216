use crate::cli::LogsArgs;
use crate::compose::Project;
use crate::context::Session;
use crate::docker::compose::{compose_command, engine_command};
use crate::docker::containers::render_table;
use crate::error::{DipError, DipResult};
use crate::model::ContainerFilter;
use crate::resolver::resolve_target;
use crate::traefik::proxy;

use super::{pass_through, Outcome};

/// Compose service for a hint naming a running container, e.g. `shop-web-1` -> `web`.
async fn service_for(
    session: &Session<'_>,
    project: &Project,
    hint: Option<&str>,
) -> DipResult<Option<String>> {
    let Some(hint) = hint else {
        return Ok(None);
    };
    let target = resolve_target(session.query, &project.name, Some(hint)).await?;
    Ok(Some(target.service_or_name().to_string()))
}

async fn auto_start_proxy(session: &Session<'_>) {
    if let Err(err) = proxy::ensure_started(session).await {
        session
            .output
            .warning(&format!("Traefik could not be started: {err}"));
    }
}

pub async fn start(session: &Session<'_>, service: Option<&str>) -> DipResult<Outcome> {
    let project = session.project()?;
    auto_start_proxy(session).await;

    session.output.info("Starting containers...");
    let mut args = vec!["up", "-d"];
    args.extend(service);
    let outcome = pass_through(session, compose_command(session.ctx.runtime, &project, args)).await?;
    session.output.success(match service {
        Some(_) => "Service started",
        None => "All containers started",
    });
    Ok(outcome)
}

pub async fn stop(session: &Session<'_>, hint: Option<&str>) -> DipResult<Outcome> {
    let project = session.project()?;
    let service = service_for(session, &project, hint).await?;

    session.output.info("Stopping containers...");
    let mut args = vec!["stop".to_string()];
    args.extend(service);
    let outcome = pass_through(session, compose_command(session.ctx.runtime, &project, args)).await?;
    session.output.success("Containers stopped");
    Ok(outcome)
}

pub async fn restart(session: &Session<'_>, hint: Option<&str>) -> DipResult<Outcome> {
    let project = session.project()?;
    let service = service_for(session, &project, hint).await?;
    auto_start_proxy(session).await;

    session.output.info("Restarting containers...");
    let mut args = vec!["restart".to_string()];
    args.extend(service);
    let outcome = pass_through(session, compose_command(session.ctx.runtime, &project, args)).await?;
    session.output.success("Containers restarted");
    Ok(outcome)
}

pub async fn build(session: &Session<'_>, service: Option<&str>) -> DipResult<Outcome> {
    let project = session.project()?;

    match service {
        Some(service) => session.output.info(&format!("Building service {service}...")),
        None => session.output.info("Building all services..."),
    }
    let mut args = vec!["build"];
    args.extend(service);
    let outcome = pass_through(session, compose_command(session.ctx.runtime, &project, args)).await?;
    session.output.success("Build finished");
    Ok(outcome)
}

pub async fn logs(session: &Session<'_>, args: &LogsArgs) -> DipResult<Outcome> {
    let project = session.project()?;
    let service = service_for(session, &project, args.target.as_deref()).await?;

    let mut compose_args = vec!["logs".to_string(), format!("--tail={}", args.tail)];
    if !args.no_follow {
        compose_args.push("-f".to_string());
    }
    compose_args.extend(service);
    pass_through(session, compose_command(session.ctx.runtime, &project, compose_args)).await
}

pub async fn status(session: &Session<'_>) -> DipResult<Outcome> {
    let project = session.project()?;
    let containers = session
        .query
        .list(&ContainerFilter::all_in(&project.name))
        .await?;

    if containers.is_empty() {
        session
            .output
            .info(&format!("No containers for project {}", project.name));
        return Ok(Outcome::done());
    }
    session.output.data(&render_table(&containers));
    Ok(Outcome::done())
}

pub async fn pull(session: &Session<'_>) -> DipResult<Outcome> {
    let project = session.project()?;
    session.output.info("Pulling latest images...");
    let outcome = pass_through(session, compose_command(session.ctx.runtime, &project, ["pull"])).await?;
    session.output.success("Images pulled");
    Ok(outcome)
}

/// `stop`, `rm -f`, `up -d`; the first failing step ends the reset.
pub async fn reset(session: &Session<'_>) -> DipResult<Outcome> {
    let project = session.project()?;
    let runtime = session.ctx.runtime;

    session.output.warning("Stopping containers...");
    pass_through(session, compose_command(runtime, &project, ["stop"])).await?;
    session.output.warning("Removing containers...");
    pass_through(session, compose_command(runtime, &project, ["rm", "-f"])).await?;
    session.output.info("Starting containers...");
    let outcome = pass_through(session, compose_command(runtime, &project, ["up", "-d"])).await?;
    session.output.success("Container reset completed");
    Ok(outcome)
}

pub async fn remove(session: &Session<'_>) -> DipResult<Outcome> {
    let project = session.project()?;
    session.output.warning("Removing containers...");
    let outcome = pass_through(session, compose_command(session.ctx.runtime, &project, ["rm", "-f"])).await?;
    session.output.success("Containers removed");
    Ok(outcome)
}

pub async fn top(session: &Session<'_>, hint: Option<&str>) -> DipResult<Outcome> {
    let project = session.project()?;
    match hint {
        Some(_) => {
            let target = resolve_target(session.query, &project.name, hint).await?;
            let cmd = engine_command(session.ctx.runtime, ["top".to_string(), target.resolved_id]);
            pass_through(session, cmd).await
        }
        None => pass_through(session, compose_command(session.ctx.runtime, &project, ["top"])).await,
    }
}

/// Live stats for one container, or every running container of the project.
pub async fn stats(session: &Session<'_>, hint: Option<&str>) -> DipResult<Outcome> {
    let project = session.project()?;
    let ids = match hint {
        Some(_) => vec![resolve_target(session.query, &project.name, hint).await?.resolved_id],
        None => {
            let running = session
                .query
                .list(&ContainerFilter::running_in(&project.name))
                .await?;
            if running.is_empty() {
                return Err(DipError::NoTarget { hint: None });
            }
            running.into_iter().map(|c| c.id).collect()
        }
    };

    let mut args = vec!["stats".to_string()];
    args.extend(ids);
    pass_through(session, engine_command(session.ctx.runtime, args)).await
}
