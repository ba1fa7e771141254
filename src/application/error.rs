//! Application-level errors (wraps domain errors)

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::{DiscoveryError, DomainError};
use crate::exitcode;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    /// Fatal before any dispatch: missing discovery root, namespace collision,
    /// unreadable configuration.
    #[error("configuration error: {message}")]
    Configuration { message: String, paths: Vec<PathBuf> },

    #[error("{0}")]
    Dispatch(#[from] DispatchError),
}

impl ApplicationError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            paths: Vec::new(),
        }
    }

    pub fn config_at(message: impl Into<String>, paths: Vec<PathBuf>) -> Self {
        Self::Configuration {
            message: message.into(),
            paths,
        }
    }
}

/// Failures while resolving or running the requested command.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Unknown command path, invalid arguments, or help/version display.
    #[error("{0}")]
    Usage(#[from] clap::Error),

    #[error("`{namespace}` is unavailable, {cause}")]
    Broken {
        namespace: String,
        cause: DiscoveryError,
    },

    #[error("`{command}` exited with status {code}")]
    CommandExited { command: String, code: i32 },

    #[error("cannot run `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: DomainError,
    },

    #[error("no command at `{0}`")]
    Unresolved(String),
}

impl DispatchError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            DispatchError::Usage(e) => e.exit_code(),
            DispatchError::CommandExited { code, .. } => *code,
            DispatchError::Broken { .. } | DispatchError::Launch { .. } => exitcode::SOFTWARE,
            DispatchError::Unresolved(_) => exitcode::USAGE,
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
