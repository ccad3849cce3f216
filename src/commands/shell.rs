use crate::cli::{ExecArgs, ShellArgs, ShellKind};
use crate::context::Session;
use crate::docker::compose::engine_command;
use crate::error::DipResult;
use crate::resolver::resolve_target;

use super::{pass_through, Outcome};

/// Picks `wanted` if the container has it, `sh` otherwise.
async fn available_shell(
    session: &Session<'_>,
    container_id: &str,
    wanted: ShellKind,
) -> DipResult<ShellKind> {
    if wanted == ShellKind::Sh {
        return Ok(wanted);
    }
    let check = engine_command(
        session.ctx.runtime,
        ["exec", container_id, "which", wanted.binary()],
    )
    .captured();
    if session.runner.run(check).await?.success() {
        return Ok(wanted);
    }
    tracing::debug!(shell = wanted.binary(), "shell not found in container, falling back to sh");
    Ok(ShellKind::Sh)
}

fn interactive_flags(session: &Session<'_>) -> &'static str {
    if session.ctx.interactive {
        "-it"
    } else {
        "-i"
    }
}

pub async fn shell(session: &Session<'_>, args: &ShellArgs) -> DipResult<Outcome> {
    let project = session.project()?;
    let target = resolve_target(session.query, &project.name, args.target.as_deref()).await?;

    let shell = available_shell(session, &target.resolved_id, args.kind).await?;
    if shell != args.kind {
        session.output.warning(&format!(
            "{} not found in container, using sh",
            args.kind.binary()
        ));
    }
    session
        .output
        .detail(&format!("Entering {} in {}", shell.binary(), target.resolved_name));

    let workdir = project.container_workdir(&session.cwd);
    let cmd = engine_command(
        session.ctx.runtime,
        [
            "exec",
            interactive_flags(session),
            "-w",
            workdir.as_str(),
            target.resolved_id.as_str(),
            shell.binary(),
        ],
    );
    pass_through(session, cmd).await
}

pub async fn exec(session: &Session<'_>, args: &ExecArgs) -> DipResult<Outcome> {
    let project = session.project()?;
    let target = resolve_target(session.query, &project.name, args.target.as_deref()).await?;
    let shell = available_shell(session, &target.resolved_id, args.shell).await?;

    let workdir = project.container_workdir(&session.cwd);
    let script = command_line(&args.command);
    session.output.detail(&format!("Working directory: {workdir}"));
    session.output.detail(&format!("Command: {script}"));

    let cmd = engine_command(
        session.ctx.runtime,
        [
            "exec",
            "-e",
            "COLUMNS",
            "-e",
            "LINES",
            interactive_flags(session),
            "-w",
            workdir.as_str(),
            target.resolved_id.as_str(),
            shell.binary(),
            "-ilc",
            script.as_str(),
        ],
    );
    pass_through(session, cmd).await
}

/// A single argument is passed to the shell as written so pipes and globs
/// keep working; several are quoted and joined.
fn command_line(command: &[String]) -> String {
    match command {
        [single] => single.clone(),
        many => shell_words::join(many),
    }
}
