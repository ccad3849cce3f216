//! Subcommand handlers. Each one receives the session and its parsed
//! arguments; side effects go through the session's runner and query.

mod container;
mod labels;
mod maintenance;
mod mkcert;
mod run;
mod shell;
mod traefik;

use crate::cli::Command;
use crate::context::Session;
use crate::docker::EngineCommand;
use crate::error::{DipError, DipResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub exit_code: i32,
    /// The child already wrote its output to the terminal.
    pub streamed: bool,
}

impl Outcome {
    pub fn done() -> Self {
        Self {
            exit_code: 0,
            streamed: false,
        }
    }

    pub fn streamed() -> Self {
        Self {
            exit_code: 0,
            streamed: true,
        }
    }
}

pub async fn execute(session: &Session<'_>, command: Command) -> DipResult<Outcome> {
    match command {
        Command::Start(args) => container::start(session, args.target.as_deref()).await,
        Command::Stop(args) => container::stop(session, args.target.as_deref()).await,
        Command::Restart(args) => container::restart(session, args.target.as_deref()).await,
        Command::Build(args) => container::build(session, args.target.as_deref()).await,
        Command::Logs(args) => container::logs(session, &args).await,
        Command::Status => container::status(session).await,
        Command::Pull => container::pull(session).await,
        Command::Reset => container::reset(session).await,
        Command::Remove => container::remove(session).await,
        Command::Top(args) => container::top(session, args.target.as_deref()).await,
        Command::Stats(args) => container::stats(session, args.target.as_deref()).await,
        Command::Health => maintenance::health(session).await,
        Command::Sysinfo => maintenance::sysinfo(session).await,
        Command::Cleanup => maintenance::cleanup(session).await,
        Command::Prune(args) => maintenance::prune(session, &args).await,
        Command::Shell(args) => shell::shell(session, &args).await,
        Command::Exec(args) => shell::exec(session, &args).await,
        Command::Run(args) => run::run(session, &args).await,
        Command::Mkcert(args) => mkcert::mkcert(session, &args),
        Command::TraefikLabel(args) => labels::traefik_label(session, &args),
        Command::Traefik(args) => traefik::traefik(session, args.action).await,
    }
}

/// Runs a streamed command; a non-zero exit becomes the invocation's exit code.
async fn pass_through(session: &Session<'_>, cmd: EngineCommand) -> DipResult<Outcome> {
    let display = cmd.display();
    let result = session.runner.run(cmd).await?;
    if !result.success() {
        return Err(DipError::EngineExitNonZero {
            command: display,
            code: result.exit_code,
        });
    }
    Ok(Outcome::streamed())
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::{Path, PathBuf};

    use crate::context::{Context, Session};
    use crate::docker::fake::{RecordingRunner, StaticContainers};
    use crate::docker::RuntimeType;
    use crate::model::{ContainerInfo, ContainerStatus};
    use crate::output::Output;

    /// A `.dip` project named `shop` inside a fresh temp dir.
    pub fn dip_project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let dip = dir.path().join(".dip");
        std::fs::create_dir_all(dip.join("commands")).unwrap();
        std::fs::write(dip.join(".env"), "PROJECT_NAME=shop\nCONTAINER_ROOT=/app\n").unwrap();
        std::fs::write(
            dip.join("docker-compose.yml"),
            "services:\n  web:\n    image: nginx\n",
        )
        .unwrap();
        dir
    }

    pub fn running(name: &str, service: &str) -> ContainerInfo {
        ContainerInfo {
            id: format!("{:0<64}", name.replace(|c: char| !c.is_ascii_hexdigit(), "a")),
            name: name.to_string(),
            service: Some(service.to_string()),
            project: Some("shop".to_string()),
            status: ContainerStatus::Running,
            status_text: "Up 5 minutes".to_string(),
            ports: vec![],
        }
    }

    pub fn session<'a>(
        root: &Path,
        config_dir: PathBuf,
        runner: &'a RecordingRunner,
        query: &'a StaticContainers,
    ) -> Session<'a> {
        Session {
            ctx: Context {
                config_dir,
                runtime: RuntimeType::Docker,
                verbose: false,
                color: false,
                interactive: false,
            },
            output: Output::plain(),
            runner,
            query,
            cwd: root.to_path_buf(),
        }
    }
}
