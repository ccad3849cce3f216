use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::aliases;
use crate::commands;
use crate::context::{Context, Session};
use crate::docker::{ContainerQuery, ProcessRunner, RuntimeType};
use crate::error::EXIT_USAGE;
use crate::logging;
use crate::output::Output;
use crate::traefik::LabelFormat;

#[derive(Parser, Debug, PartialEq)]
#[command(
    name = "dip",
    version,
    about = "Docker Compose workflows, local TLS certificates and Traefik labels",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Print debug diagnostics
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration directory (certificates, Traefik compose file)
    #[arg(long, global = true, env = "DIP_CONFIG_DIR", value_name = "PATH")]
    pub config_dir: Option<PathBuf>,

    /// Container engine CLI to drive; detected from the API socket by default
    #[arg(long, global = true, env = "DIP_ENGINE", value_enum)]
    pub engine: Option<RuntimeType>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Start project containers (and Traefik, when configured)
    Start(TargetArgs),
    /// Stop project containers
    Stop(TargetArgs),
    /// Restart project containers
    Restart(TargetArgs),
    /// Build service images
    Build(TargetArgs),
    /// Show container logs
    Logs(LogsArgs),
    /// Open an interactive shell in a container
    Shell(ShellArgs),
    /// Run a command in a container through its shell
    Exec(ExecArgs),
    /// List the project's containers
    Status,
    /// Pull the latest images
    Pull,
    /// Stop, remove and start the project containers
    Reset,
    /// Remove the project containers
    Remove,
    /// Show running processes
    Top(TargetArgs),
    /// Show live resource usage
    Stats(TargetArgs),
    /// Show healthcheck status of running containers
    Health,
    /// Show engine and project information
    Sysinfo,
    /// Remove stopped project containers and dangling images
    Cleanup,
    /// Remove unused engine data and volumes for every project
    Prune(PruneArgs),
    /// Run a project command from .dip/commands/
    Run(RunArgs),
    /// Issue a locally trusted certificate for a domain pattern
    Mkcert(MkcertArgs),
    /// Print Traefik routing labels for a service
    TraefikLabel(LabelArgs),
    /// Manage the shared Traefik proxy
    Traefik(TraefikArgs),
}

#[derive(Args, Debug, Clone, PartialEq, Default)]
pub struct TargetArgs {
    /// Container name, ID or compose service
    pub target: Option<String>,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct LogsArgs {
    pub target: Option<String>,

    /// Number of lines to show from the end of the logs
    #[arg(long, default_value_t = 100)]
    pub tail: u32,

    /// Print the current logs and exit
    #[arg(long)]
    pub no_follow: bool,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ShellArgs {
    pub target: Option<String>,

    #[arg(long = "type", value_enum, default_value_t = ShellKind::Bash)]
    pub kind: ShellKind,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ExecArgs {
    pub target: Option<String>,

    #[arg(long, value_enum, default_value_t = ShellKind::Bash)]
    pub shell: ShellKind,

    /// Command to run, after `--`
    #[arg(last = true, required = true, value_name = "CMD")]
    pub command: Vec<String>,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct PruneArgs {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct RunArgs {
    /// Script name inside .dip/commands/
    pub script: String,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct MkcertArgs {
    /// Domain or wildcard pattern, e.g. `*.example.lan`
    pub domain: String,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct LabelArgs {
    pub app_name: String,
    pub domain: String,

    #[arg(long, default_value_t = crate::traefik::labels::DEFAULT_PORT)]
    pub port: u16,

    #[arg(long, value_enum, default_value_t = LabelFormat::List)]
    pub format: LabelFormat,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct TraefikArgs {
    #[arg(value_enum)]
    pub action: TraefikAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TraefikAction {
    Start,
    Stop,
    Restart,
    Status,
    /// Stop, remove the container and start fresh
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShellKind {
    Bash,
    Sh,
    Zsh,
    Fish,
}

impl ShellKind {
    pub fn binary(self) -> &'static str {
        match self {
            ShellKind::Bash => "bash",
            ShellKind::Sh => "sh",
            ShellKind::Zsh => "zsh",
            ShellKind::Fish => "fish",
        }
    }
}

/// Alias expansion followed by clap parsing. No side effects.
pub fn parse(argv: Vec<String>) -> Result<Cli, clap::Error> {
    Cli::try_parse_from(aliases::expand(argv))
}

/// Runs one invocation end to end and returns the process exit code.
pub async fn dispatch<I, T>(
    argv: I,
    runner: &dyn ProcessRunner,
    query: &dyn ContainerQuery,
    cwd: PathBuf,
) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    let cli = match parse(argv.into_iter().map(Into::into).collect()) {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => EXIT_USAGE,
            };
            let _ = err.print();
            return code;
        }
    };

    logging::init(cli.verbose);

    let ctx = match Context::new(cli.config_dir, cli.engine, cli.verbose, cli.no_color) {
        Ok(ctx) => ctx,
        Err(err) => {
            Output::new(!cli.no_color, cli.verbose).error(&err.to_string());
            return err.exit_code();
        }
    };
    tracing::debug!(
        config_dir = %ctx.config_dir.display(),
        runtime = ?ctx.runtime,
        "context ready"
    );

    let session = Session {
        output: ctx.output(),
        ctx,
        runner,
        query,
        cwd,
    };

    match commands::execute(&session, cli.command).await {
        Ok(outcome) => {
            tracing::debug!(exit_code = outcome.exit_code, streamed = outcome.streamed, "done");
            outcome.exit_code
        }
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            session.output.error(&err.to_string());
            err.exit_code()
        }
    }
}
