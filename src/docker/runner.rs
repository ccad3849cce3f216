//! Child-process execution for engine commands.
//!
//! [`ProcessRunner`] is the only way dip spawns anything. [`SystemRunner`]
//! talks to the real OS; [`super::fake::RecordingRunner`] stands in for it
//! in tests.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Child;

use crate::error::{DipError, DipResult};

/// How the child's standard streams are wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoMode {
    /// Share the terminal: interactive and pass-through commands.
    Inherit,
    /// Collect stdout/stderr for post-processing.
    Capture,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    pub program: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
    pub mode: IoMode,
}

impl EngineCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            envs: Vec::new(),
            cwd: None,
            mode: IoMode::Inherit,
        }
    }

    pub fn captured(mut self) -> Self {
        self.mode = IoMode::Capture;
        self
    }

    pub fn envs(mut self, envs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.envs.extend(envs);
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Human-readable form for logs and error lines.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Spawns one child and waits for it. A non-zero exit is not an error here.
    async fn run(&self, cmd: EngineCommand) -> DipResult<ProcessOutput>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, cmd: EngineCommand) -> DipResult<ProcessOutput> {
        let program = find_program(&cmd.program, std::env::var_os("PATH"))
            .ok_or_else(|| DipError::EngineNotFound(cmd.program.clone()))?;

        tracing::debug!(command = %cmd.display(), mode = ?cmd.mode, "spawning");

        let mut command = tokio::process::Command::new(&program);
        command
            .args(&cmd.args)
            .envs(cmd.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        if let Some(ref dir) = cmd.cwd {
            command.current_dir(dir);
        }
        match cmd.mode {
            IoMode::Inherit => {
                command
                    .stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
            }
            IoMode::Capture => {
                command
                    .stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped());
            }
        }

        let mut child = command.spawn().map_err(|err| {
            DipError::EngineUnavailable(format!("failed to spawn `{}`: {err}", cmd.display()))
        })?;

        let output = match cmd.mode {
            IoMode::Inherit => {
                let status = wait_forwarding_signals(&mut child)
                    .await
                    .map_err(|err| wait_error(&cmd, err))?;
                ProcessOutput {
                    exit_code: exit_code(status),
                    ..ProcessOutput::default()
                }
            }
            IoMode::Capture => {
                let mut stdout_pipe = child.stdout.take();
                let mut stderr_pipe = child.stderr.take();
                let (status, stdout, stderr) = tokio::join!(
                    wait_forwarding_signals(&mut child),
                    read_pipe(stdout_pipe.as_mut()),
                    read_pipe(stderr_pipe.as_mut()),
                );
                let status = status.map_err(|err| wait_error(&cmd, err))?;
                ProcessOutput {
                    exit_code: exit_code(status),
                    stdout,
                    stderr,
                }
            }
        };

        tracing::debug!(command = %cmd.display(), exit_code = output.exit_code, "child exited");
        Ok(output)
    }
}

fn wait_error(cmd: &EngineCommand, err: std::io::Error) -> DipError {
    DipError::EngineUnavailable(format!("failed waiting for `{}`: {err}", cmd.display()))
}

async fn read_pipe<R: tokio::io::AsyncRead + Unpin>(pipe: Option<&mut R>) -> String {
    let mut buf = Vec::new();
    if let Some(pipe) = pipe {
        if let Err(err) = pipe.read_to_end(&mut buf).await {
            tracing::debug!(error = %err, read = buf.len(), "reading child output failed");
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Waits for the child without dying on SIGINT/SIGTERM first.
#[cfg(unix)]
async fn wait_forwarding_signals(child: &mut Child) -> std::io::Result<ExitStatus> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    loop {
        let received = tokio::select! {
            status = child.wait() => return status,
            _ = interrupt.recv() => libc::SIGINT,
            _ = terminate.recv() => libc::SIGTERM,
        };
        match relayed_signal(received) {
            Some(signal) => forward_signal(child, signal),
            None => tracing::debug!(signal = received, "child received the signal from the terminal"),
        }
    }
}

/// Signal to pass on to the child, if any.
///
/// The child shares dip's process group, so a terminal Ctrl-C already reached
/// it. SIGTERM is usually aimed at dip's pid alone and has to be relayed.
#[cfg(unix)]
fn relayed_signal(received: libc::c_int) -> Option<libc::c_int> {
    (received != libc::SIGINT).then_some(received)
}

#[cfg(unix)]
fn forward_signal(child: &Child, signal: libc::c_int) {
    if let Some(pid) = child.id() {
        tracing::debug!(pid, signal, "forwarding signal to child");
        // SAFETY: kill(2) has no memory-safety preconditions; pid belongs to our child.
        unsafe {
            libc::kill(pid as libc::pid_t, signal);
        }
    }
}

#[cfg(not(unix))]
async fn wait_forwarding_signals(child: &mut Child) -> std::io::Result<ExitStatus> {
    loop {
        tokio::select! {
            status = child.wait() => return status,
            _ = tokio::signal::ctrl_c() => {
                let _ = child.start_kill();
            }
        }
    }
}

/// Exit code of the child; signal deaths map to 128 + signal like a shell.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

/// Resolves `program` against `path_var` the way a shell would.
/// Names containing a separator are checked as paths directly.
pub fn find_program(program: &str, path_var: Option<OsString>) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }
    let path_var = path_var?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|full| is_executable(full))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_program_and_args() {
        let cmd = EngineCommand::new("docker", ["compose", "up", "-d"]);
        assert_eq!(cmd.display(), "docker compose up -d");
        assert_eq!(cmd.mode, IoMode::Inherit);
        assert_eq!(cmd.captured().mode, IoMode::Capture);
    }

    #[cfg(unix)]
    #[test]
    fn only_sigterm_is_relayed() {
        assert_eq!(relayed_signal(libc::SIGINT), None);
        assert_eq!(relayed_signal(libc::SIGTERM), Some(libc::SIGTERM));
    }

    struct BrokenPipe;

    impl tokio::io::AsyncRead for BrokenPipe {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Err(std::io::Error::other("broken pipe")))
        }
    }

    #[tokio::test]
    async fn unreadable_pipe_yields_what_was_read() {
        assert_eq!(read_pipe(Some(&mut BrokenPipe)).await, "");
        assert_eq!(read_pipe(Some(&mut &b"partial"[..])).await, "partial");
        assert_eq!(read_pipe::<BrokenPipe>(None).await, "");
    }

    #[test]
    fn missing_program_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = OsString::from(dir.path());
        assert_eq!(find_program("definitely-not-docker", Some(path)), None);
        assert_eq!(find_program("docker", None), None);
    }

    #[cfg(unix)]
    #[test]
    fn finds_executable_on_path() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("docker");
        std::fs::write(&bin, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();

        let found = find_program("docker", Some(OsString::from(dir.path())));
        assert_eq!(found, Some(bin));
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("docker"), "").unwrap();
        assert_eq!(
            find_program("docker", Some(OsString::from(dir.path()))),
            None
        );
    }

    #[tokio::test]
    async fn absent_engine_fails_before_spawn() {
        let err = SystemRunner
            .run(EngineCommand::new("dip-no-such-engine-binary", ["ps"]))
            .await
            .unwrap_err();
        assert!(matches!(err, DipError::EngineNotFound(ref p) if p == "dip-no-such-engine-binary"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_output_and_exit_code() {
        let cmd = EngineCommand::new("sh", ["-c", "echo out; echo err >&2; exit 3"]).captured();
        let output = SystemRunner.run(cmd).await.unwrap();
        assert_eq!(output.exit_code, 3);
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn passes_environment_to_child() {
        let cmd = EngineCommand::new("sh", ["-c", "printf %s \"$DIP_TEST_VALUE\""])
            .envs([("DIP_TEST_VALUE".to_string(), "hello".to_string())])
            .captured();
        let output = SystemRunner.run(cmd).await.unwrap();
        assert!(output.success());
        assert_eq!(output.stdout, "hello");
    }
}
