use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DjmakeError {
    #[error("no such command: {0}")]
    UnknownCommand(String),

    #[error("command {0} is declared twice")]
    DuplicateCommand(String),

    #[error("{} not found", .0.display())]
    MissingPrerequisite(PathBuf),

    #[error("{0} is required but no value was supplied")]
    MissingInput(String),

    #[error("unsupported platform signal OS={0:?}")]
    UnsupportedPlatform(String),

    #[error("unknown variable {{{0}}} in step template")]
    UnknownVariable(String),

    #[error("invalid step template: {0}")]
    Template(String),

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("step {step} exited with status {code}")]
    StepFailed { step: usize, code: i32 },

    #[error("invalid configuration in {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DjmakeError {
    /// Process exit status this error maps to when it ends an invocation.
    pub fn exit_code(&self) -> i32 {
        match self {
            DjmakeError::StepFailed { code, .. } => *code,
            DjmakeError::UnknownCommand(_) => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, DjmakeError>;
