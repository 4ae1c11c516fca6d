use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Filesystem operation attempted on a single path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsOp {
    Inspect,
    CreateDir,
    Copy,
    Move,
    Remove,
    Symlink,
    Read,
    Write,
}

impl fmt::Display for FsOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            FsOp::Inspect => "inspect",
            FsOp::CreateDir => "create directory",
            FsOp::Copy => "copy",
            FsOp::Move => "move",
            FsOp::Remove => "remove",
            FsOp::Symlink => "create symlink",
            FsOp::Read => "read",
            FsOp::Write => "write",
        };
        f.write_str(verb)
    }
}

/// A failed filesystem step. Collected into reports rather than aborting.
#[derive(Debug, Error)]
#[error("failed to {op} {path:?}: {cause}")]
pub struct FsError {
    pub op: FsOp,
    pub path: PathBuf,
    pub cause: io::Error,
}

impl FsError {
    pub fn new(op: FsOp, path: impl Into<PathBuf>, cause: io::Error) -> Self {
        Self {
            op,
            path: path.into(),
            cause,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("config file {path:?}: {message}")]
    ConfigLoad { path: PathBuf, message: String },

    #[error("'managed_paths' is empty in {path:?}")]
    EmptyManagedPaths { path: PathBuf },

    #[error("managed path {path:?} must be relative to the home directory without '..'")]
    InvalidManagedPath { path: PathBuf },

    #[error("environment directory {path:?} not found")]
    EnvironmentNotFound { path: PathBuf },

    #[error("environment '{0}' already exists")]
    DuplicateEnvironment(String),

    #[error("environment '{0}' does not exist")]
    UnknownEnvironment(String),

    #[error("no active environment")]
    NoActiveEnvironment,

    #[error("cannot remove the active environment '{0}'")]
    CannotRemoveActive(String),

    #[error("invalid environment name '{0}'")]
    InvalidEnvironmentName(String),

    #[error(transparent)]
    Filesystem(#[from] FsError),

    #[error("failed to update credentials {path:?}: {message}")]
    Credentials { path: PathBuf, message: String },

    #[error("failed to write state file {path:?}: {message}")]
    State { path: PathBuf, message: String },

    #[error("rename failed: {cause}")]
    RenameFailed { cause: Box<Error>, rolled_back: bool },
}

impl Error {
    /// Follow-up advice shown under the error message.
    pub fn hint(&self) -> Option<String> {
        match self {
            Error::EmptyManagedPaths { path } | Error::InvalidManagedPath { path } => {
                Some(format!("Check the managed_paths list in {}", path.display()))
            }
            Error::DuplicateEnvironment(_) => {
                Some("To switch to it instead, run: claude_env switch <name>".to_string())
            }
            Error::UnknownEnvironment(_) => {
                Some("Create it first with: claude_env add <name>".to_string())
            }
            Error::NoActiveEnvironment => {
                Some("Switch to an environment first with: claude_env switch <name>".to_string())
            }
            Error::CannotRemoveActive(_) => {
                Some("Switch to another environment before removing this one.".to_string())
            }
            Error::InvalidEnvironmentName(_) => Some(
                "Names start with a letter or digit and may contain letters, digits, '.', '_', '@', '+' and '-'."
                    .to_string(),
            ),
            Error::RenameFailed { rolled_back, .. } => Some(if *rolled_back {
                "The operation was rolled back.".to_string()
            } else {
                "Rollback failed; inspect the storage directory manually.".to_string()
            }),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
