use std::path::Path;

use crate::compose::project::Project;
use crate::docker::client::RuntimeType;
use crate::docker::runner::EngineCommand;

/// `<engine> compose -f <file> <args..>` run from the project root with the project env.
pub fn compose_command<I, S>(runtime: RuntimeType, project: &Project, args: I) -> EngineCommand
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut full = vec![
        "compose".to_string(),
        "-f".to_string(),
        project.compose_file.to_string_lossy().into_owned(),
    ];
    full.extend(args.into_iter().map(Into::into));

    EngineCommand::new(runtime.binary(), full)
        .envs(project.env.iter().map(|(k, v)| (k.clone(), v.clone())))
        .current_dir(&project.root)
}

/// `<engine> compose -f <file> <args..>` for a standalone compose file, e.g. Traefik's.
pub fn compose_file_command<I, S>(runtime: RuntimeType, file: &Path, args: I) -> EngineCommand
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut full = vec![
        "compose".to_string(),
        "-f".to_string(),
        file.to_string_lossy().into_owned(),
    ];
    full.extend(args.into_iter().map(Into::into));
    let cmd = EngineCommand::new(runtime.binary(), full);
    match file.parent() {
        Some(dir) => cmd.current_dir(dir),
        None => cmd,
    }
}

/// `<engine> <args..>` outside of compose.
pub fn engine_command<I, S>(runtime: RuntimeType, args: I) -> EngineCommand
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    EngineCommand::new(runtime.binary(), args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn project() -> Project {
        let mut env = BTreeMap::new();
        env.insert("COMPOSE_PROJECT_NAME".to_string(), "demo".to_string());
        Project {
            root: PathBuf::from("/work/demo"),
            name: "demo".to_string(),
            compose_file: PathBuf::from("/work/demo/.dip/docker-compose.yml"),
            container_root: "/var/www".to_string(),
            env,
            commands_dir: None,
        }
    }

    #[test]
    fn compose_command_targets_project_file() {
        let cmd = compose_command(RuntimeType::Docker, &project(), ["up", "-d"]);
        assert_eq!(cmd.program, "docker");
        assert_eq!(
            cmd.args,
            vec!["compose", "-f", "/work/demo/.dip/docker-compose.yml", "up", "-d"]
        );
        assert_eq!(cmd.cwd.as_deref(), Some(Path::new("/work/demo")));
        assert!(cmd
            .envs
            .contains(&("COMPOSE_PROJECT_NAME".to_string(), "demo".to_string())));
    }

    #[test]
    fn podman_uses_its_own_binary() {
        let cmd = engine_command(RuntimeType::Podman, ["ps"]);
        assert_eq!(cmd.display(), "podman ps");
    }

    #[test]
    fn standalone_compose_runs_next_to_file() {
        let cmd = compose_file_command(
            RuntimeType::Docker,
            Path::new("/cfg/traefik/docker-compose.yml"),
            ["down"],
        );
        assert_eq!(cmd.cwd.as_deref(), Some(Path::new("/cfg/traefik")));
        assert_eq!(cmd.args.last().map(String::as_str), Some("down"));
    }
}
