//! Locating the compose project for the current working directory.
//!
//! A `.dip` directory (searched upwards) wins: it carries `docker-compose.yml`,
//! a `.env` with at least `PROJECT_NAME`, and optional `commands/`. Without
//! one, a plain compose file in the working directory is used.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::compose::discovery::{find_compose_files, find_project_root, PROJECT_DIR};
use crate::compose::parser::{parse_compose_file, parse_env, project_name};
use crate::error::{DipError, DipResult};

pub const DEFAULT_CONTAINER_ROOT: &str = "/var/www";

const ENV_PROJECT_NAME: &str = "PROJECT_NAME";
const ENV_PROJECT_ROOT: &str = "PROJECT_ROOT";
const ENV_COMPOSE_NAME: &str = "COMPOSE_PROJECT_NAME";
const ENV_CONTAINER_ROOT: &str = "CONTAINER_ROOT";
const ENV_DIP_DIR: &str = "DIP_DIR";
const ENV_ENV_FILE: &str = "ENV_FILE";
const ENV_HOST_UID: &str = "HOST_UID";
const ENV_HOST_GID: &str = "HOST_GID";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub root: PathBuf,
    pub name: String,
    pub compose_file: PathBuf,
    pub container_root: String,
    /// Extra environment for compose and project commands.
    pub env: BTreeMap<String, String>,
    pub commands_dir: Option<PathBuf>,
}

impl Project {
    pub fn load(cwd: &Path) -> DipResult<Project> {
        if let Some(root) = find_project_root(cwd) {
            return Self::from_dip_dir(&root);
        }

        let files = find_compose_files(cwd).map_err(DipError::Internal)?;
        match files.into_iter().next() {
            Some(file) => Self::from_compose_file(cwd, file),
            None => Err(DipError::NoProject(format!(
                "no `{PROJECT_DIR}` directory or compose file found from {}",
                cwd.display()
            ))),
        }
    }

    fn from_dip_dir(root: &Path) -> DipResult<Project> {
        let dip_dir = root.join(PROJECT_DIR);
        let env_file = dip_dir.join(".env");
        let default_env_file = dip_dir.join("default.env");

        if !env_file.exists() {
            if !default_env_file.exists() {
                return Err(DipError::NoProject(format!(
                    "env file not found: {}",
                    env_file.display()
                )));
            }
            std::fs::copy(&default_env_file, &env_file)
                .map_err(|err| DipError::storage(&env_file, err))?;
            tracing::info!(env_file = %env_file.display(), "created env file from default.env");
        }

        let content = std::fs::read_to_string(&env_file)
            .map_err(|err| DipError::NoProject(format!("cannot read {}: {err}", env_file.display())))?;
        let mut env = parse_env(&content);

        let name = env
            .get(ENV_PROJECT_NAME)
            .filter(|n| !n.is_empty())
            .cloned()
            .ok_or_else(|| {
                DipError::NoProject(format!(
                    "`{ENV_PROJECT_NAME}` must be set in {}",
                    env_file.display()
                ))
            })?;

        let container_root = match env.get(ENV_CONTAINER_ROOT).filter(|v| !v.is_empty()) {
            Some(dir) => dir.clone(),
            None => {
                tracing::warn!(
                    default = DEFAULT_CONTAINER_ROOT,
                    "`{ENV_CONTAINER_ROOT}` not set, using default"
                );
                DEFAULT_CONTAINER_ROOT.to_string()
            }
        };

        let path_str = |p: &Path| p.to_string_lossy().into_owned();
        env.insert(ENV_PROJECT_ROOT.into(), path_str(root));
        env.insert(ENV_PROJECT_NAME.into(), name.clone());
        env.insert(ENV_COMPOSE_NAME.into(), name.clone());
        env.insert(ENV_CONTAINER_ROOT.into(), container_root.clone());
        env.insert(ENV_DIP_DIR.into(), path_str(&dip_dir));
        env.insert(ENV_ENV_FILE.into(), path_str(&env_file));
        if let Some((uid, gid)) = host_ids() {
            env.insert(ENV_HOST_UID.into(), uid.to_string());
            env.insert(ENV_HOST_GID.into(), gid.to_string());
        }

        let commands_dir = dip_dir.join("commands");
        Ok(Project {
            root: root.to_path_buf(),
            name,
            compose_file: dip_dir.join("docker-compose.yml"),
            container_root,
            env,
            commands_dir: commands_dir.is_dir().then_some(commands_dir),
        })
    }

    fn from_compose_file(cwd: &Path, file: PathBuf) -> DipResult<Project> {
        let compose = parse_compose_file(&file).map_err(DipError::Internal)?;
        let name = project_name(&compose, &file);

        let mut env = BTreeMap::new();
        env.insert(ENV_COMPOSE_NAME.to_string(), name.clone());

        Ok(Project {
            root: cwd.to_path_buf(),
            name,
            compose_file: file,
            container_root: DEFAULT_CONTAINER_ROOT.to_string(),
            env,
            commands_dir: None,
        })
    }

    /// Container-side working directory mirroring `cwd` inside the project.
    pub fn container_workdir(&self, cwd: &Path) -> String {
        let relative = cwd.strip_prefix(&self.root).unwrap_or(Path::new(""));
        let mut dir = self.container_root.trim_end_matches('/').to_string();
        for part in relative.components() {
            dir.push('/');
            dir.push_str(&part.as_os_str().to_string_lossy());
        }
        if dir.is_empty() {
            dir.push('/');
        }
        dir
    }
}

#[cfg(unix)]
fn host_ids() -> Option<(u32, u32)> {
    // SAFETY: getuid() and getgid() are infallible POSIX getters.
    let uid = unsafe { libc::getuid() };
    let gid = unsafe { libc::getgid() };
    Some((uid, gid))
}

#[cfg(not(unix))]
fn host_ids() -> Option<(u32, u32)> {
    None
}
