//! Error types for supervisor operations

use std::io;
use thiserror::Error;

/// Result type for supervisor operations
pub type Result<T> = std::result::Result<T, SupervisorError>;

/// Errors that can occur while driving a supervised process
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("old process still running")]
    AlreadyRunning,

    #[error("no program given to exec")]
    MissingProgram,

    #[error("unable to create {stream} pipe: {source}")]
    PipeSetup {
        stream: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("execution of '{program}' failed: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("killing process {pid} failed: {source}")]
    Signal {
        pid: i32,
        #[source]
        source: nix::Error,
    },

    #[error("writing to stdin of command failed: {0}")]
    StdinWrite(#[source] io::Error),

    #[error("setting environment variable failed: {0}")]
    Environment(String),

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl SupervisorError {
    /// OS error number carried by this error, if any
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            SupervisorError::PipeSetup { source, .. }
            | SupervisorError::Spawn { source, .. }
            | SupervisorError::StdinWrite(source)
            | SupervisorError::Io(source) => source.raw_os_error(),
            SupervisorError::Signal { source, .. } => Some(*source as i32),
            _ => None,
        }
    }
}
