//! Error taxonomy and exit-code mapping.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Bad subcommand, flag or argument value.
pub const EXIT_USAGE: i32 = 1;
/// Target, project or container resolution failed.
pub const EXIT_TARGET: i32 = 2;
/// Engine, process, storage or crypto failure.
pub const EXIT_ENGINE: i32 = 3;

pub type DipResult<T> = Result<T, DipError>;

#[derive(Debug, Error)]
pub enum DipError {
    #[error("{0}")]
    Usage(String),

    #[error("invalid domain `{0}`: must be non-empty, without whitespace, quotes or path separators, and not a reserved file name (`ca`, `_wildcard`)")]
    InvalidDomain(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("`{hint}` matches more than one container: {}", .candidates.join(", "))]
    AmbiguousTarget { hint: String, candidates: Vec<String> },

    #[error("{}", no_target_message(.hint))]
    NoTarget { hint: Option<String> },

    #[error("not a dip project: {0}")]
    NoProject(String),

    #[error("`{0}` was not found on PATH")]
    EngineNotFound(String),

    #[error("container engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("`{command}` exited with code {code}")]
    EngineExitNonZero { command: String, code: i32 },

    #[error("cannot write {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("crypto backend failure: {0}")]
    Crypto(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl DipError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    pub fn storage(path: &Path, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Process exit code for this error. A spawned child's own code wins.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) | Self::InvalidDomain(_) | Self::Config(_) => EXIT_USAGE,
            Self::AmbiguousTarget { .. } | Self::NoTarget { .. } | Self::NoProject(_) => {
                EXIT_TARGET
            }
            Self::EngineExitNonZero { code, .. } => *code,
            Self::EngineNotFound(_)
            | Self::EngineUnavailable(_)
            | Self::Storage { .. }
            | Self::Crypto(_)
            | Self::Internal(_) => EXIT_ENGINE,
        }
    }
}

impl From<rcgen::Error> for DipError {
    fn from(err: rcgen::Error) -> Self {
        Self::Crypto(err.to_string())
    }
}

fn no_target_message(hint: &Option<String>) -> String {
    match hint {
        Some(hint) => format!("no running container matches `{hint}`"),
        None => "no running containers found for this project".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_taxonomy() {
        assert_eq!(DipError::usage("bad flag").exit_code(), EXIT_USAGE);
        assert_eq!(DipError::InvalidDomain(String::new()).exit_code(), EXIT_USAGE);
        assert_eq!(DipError::NoTarget { hint: None }.exit_code(), EXIT_TARGET);
        assert_eq!(
            DipError::AmbiguousTarget {
                hint: "web".into(),
                candidates: vec!["web-1".into(), "web-2".into()],
            }
            .exit_code(),
            EXIT_TARGET
        );
        assert_eq!(DipError::EngineNotFound("docker".into()).exit_code(), EXIT_ENGINE);
        assert_eq!(DipError::Crypto("rng".into()).exit_code(), EXIT_ENGINE);
    }

    #[test]
    fn child_exit_code_takes_precedence() {
        let err = DipError::EngineExitNonZero {
            command: "docker compose up -d".into(),
            code: 17,
        };
        assert_eq!(err.exit_code(), 17);
    }

    #[test]
    fn ambiguous_target_lists_candidates() {
        let err = DipError::AmbiguousTarget {
            hint: "web".into(),
            candidates: vec!["web-1".into(), "web-2".into()],
        };
        assert_eq!(
            err.to_string(),
            "`web` matches more than one container: web-1, web-2"
        );
    }

    #[test]
    fn no_target_message_mentions_hint() {
        let err = DipError::NoTarget {
            hint: Some("api".into()),
        };
        assert_eq!(err.to_string(), "no running container matches `api`");
    }
}
