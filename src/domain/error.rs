//! Domain-level errors (no external dependencies)

use std::path::PathBuf;
use thiserror::Error;

/// Domain errors represent violations of the command model.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("empty namespace")]
    EmptyNamespace,

    #[error("invalid name {token:?}: {reason}")]
    InvalidToken { token: String, reason: String },

    #[error("invalid command `{command}`: {reason}")]
    InvalidCommand { command: String, reason: String },

    #[error("invalid parameter `{param}` of command `{command}`: {reason}")]
    InvalidParam {
        command: String,
        param: String,
        reason: String,
    },

    #[error("invalid run template for `{command}`: {reason}")]
    InvalidTemplate { command: String, reason: String },

    #[error("namespace `{namespace}` declared twice: {first} and {second}")]
    NamespaceCollision {
        namespace: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("command `{command}` of {first} shadows namespace `{namespace}` from {second}")]
    NamespaceShadowed {
        namespace: String,
        command: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("cannot read script: {0}")]
    Unreadable(String),

    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("command `{command}` could not be run: {message}")]
    CommandFailed { command: String, message: String },
}

/// A script that was found but could not be loaded.
///
/// Recorded per file during discovery; never aborts the scan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}: {message}", path.display())]
pub struct DiscoveryError {
    /// Location of the broken script
    pub path: PathBuf,
    /// Namespace the script would have been mounted at, if derivable
    pub namespace: Option<crate::domain::Namespace>,
    pub message: String,
}

impl DiscoveryError {
    pub fn new(
        path: impl Into<PathBuf>,
        namespace: Option<crate::domain::Namespace>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            namespace,
            message: message.into(),
        }
    }
}
