//! Per-invocation configuration, built once from the parsed command line and
//! handed to every component explicitly.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::compose::Project;
use crate::docker::client::{detect_runtime, RuntimeType};
use crate::docker::{ContainerQuery, ProcessRunner};
use crate::error::{DipError, DipResult};
use crate::output::Output;

pub const APP_NAME: &str = "dip";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    pub config_dir: PathBuf,
    pub runtime: RuntimeType,
    pub verbose: bool,
    pub color: bool,
    /// Whether stdin is a terminal; decides `-t` on `exec`.
    pub interactive: bool,
}

impl Context {
    pub fn new(
        config_dir: Option<PathBuf>,
        runtime: Option<RuntimeType>,
        verbose: bool,
        no_color: bool,
    ) -> DipResult<Self> {
        let config_dir = match config_dir {
            Some(dir) => dir,
            None => default_config_dir()?,
        };
        let color = !no_color
            && std::env::var_os("NO_COLOR").is_none()
            && std::io::stdout().is_terminal();

        Ok(Self {
            config_dir,
            runtime: runtime.unwrap_or_else(detect_runtime),
            verbose,
            color,
            interactive: std::io::stdin().is_terminal(),
        })
    }

    /// Where the certificate authority keeps its files.
    pub fn certs_dir(&self) -> PathBuf {
        self.config_dir.join("certs")
    }

    pub fn traefik_compose_file(&self) -> PathBuf {
        self.config_dir.join("traefik").join("docker-compose.yml")
    }

    pub fn output(&self) -> Output {
        Output::new(self.color, self.verbose)
    }
}

/// `$XDG_CONFIG_HOME/dip`, falling back to the platform config dir.
pub fn default_config_dir() -> DipResult<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Ok(Path::new(&xdg).join(APP_NAME));
    }
    dirs::config_dir()
        .map(|dir| dir.join(APP_NAME))
        .ok_or_else(|| {
            DipError::Config("cannot determine a configuration directory; pass --config-dir".into())
        })
}

/// Everything a command handler may touch, passed by reference.
pub struct Session<'a> {
    pub ctx: Context,
    pub output: Output,
    pub runner: &'a dyn ProcessRunner,
    pub query: &'a dyn ContainerQuery,
    pub cwd: PathBuf,
}

impl Session<'_> {
    /// Loads the compose project the working directory belongs to.
    pub fn project(&self) -> DipResult<Project> {
        let project = Project::load(&self.cwd)?;
        tracing::debug!(
            name = %project.name,
            compose_file = %project.compose_file.display(),
            "loaded project"
        );
        Ok(project)
    }
}
