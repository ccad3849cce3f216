use std::path::Path;

use crate::cli::RunArgs;
use crate::context::Session;
use crate::docker::EngineCommand;
use crate::error::{DipError, DipResult};

use super::{pass_through, Outcome};

/// Runs an executable from `.dip/commands/` with the project environment.
pub async fn run(session: &Session<'_>, args: &RunArgs) -> DipResult<Outcome> {
    let project = session.project()?;
    let Some(commands_dir) = project.commands_dir.as_deref() else {
        return Err(DipError::usage(format!(
            "project {} has no commands directory",
            project.name
        )));
    };

    if args.script.contains('/') || args.script.contains('\\') {
        return Err(DipError::usage(format!(
            "invalid command name `{}`",
            args.script
        )));
    }
    let script = commands_dir.join(&args.script);
    if !is_executable(&script) {
        return Err(DipError::usage(format!(
            "unknown project command `{}`",
            args.script
        )));
    }

    session
        .output
        .detail(&format!("Running {} {}", script.display(), args.args.join(" ")));
    let cmd = EngineCommand::new(script.to_string_lossy(), args.args.iter().cloned())
        .envs(project.env.clone())
        .current_dir(&project.root);
    pass_through(session, cmd).await
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
